use serde::{Deserialize, Serialize};

/// Filter context applied to every analytic query in a request.
/// Immutable once built; scoping never changes mid-pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorScope {
    pub advisor_id: String,
    pub client_id: Option<String>,
}

impl AdvisorScope {
    pub fn for_advisor(advisor_id: impl Into<String>) -> Self {
        Self {
            advisor_id: advisor_id.into(),
            client_id: None,
        }
    }

    pub fn for_client(advisor_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            advisor_id: advisor_id.into(),
            client_id: Some(client_id.into()),
        }
    }
}
