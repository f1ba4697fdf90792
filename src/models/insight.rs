use serde::{Deserialize, Serialize};

/// Output of the insight generator. `source` names the provider that
/// produced the text, or "static-default" when the fallback chain was
/// exhausted and the versioned default insights were substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResponse {
    pub lines: Vec<String>,
    pub source: String,
    pub degraded: bool,
}
