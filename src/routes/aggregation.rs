use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{AdvisorScope, AggregationPayload};
use crate::state::AppState;

/// Matches the upstream convention: requests without an advisor fall back
/// to the demo advisor rather than failing.
const DEFAULT_ADVISOR_ID: &str = "ADV001";

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_aggregation))
}

#[derive(Debug, Deserialize)]
struct AggregationQuery {
    advisor_id: Option<String>,
    client_id: Option<String>,
}

async fn get_aggregation(
    Query(params): Query<AggregationQuery>,
    State(state): State<AppState>,
) -> Result<Json<AggregationPayload>, AppError> {
    let advisor_id = match params.advisor_id {
        None => DEFAULT_ADVISOR_ID.to_string(),
        Some(id) => {
            let id = id.trim().to_string();
            if id.is_empty() {
                return Err(AppError::Validation("advisor_id must not be blank".into()));
            }
            id
        }
    };

    let scope = AdvisorScope {
        advisor_id,
        client_id: params.client_id.filter(|c| !c.trim().is_empty()),
    };

    // Degraded upstreams are reported inside the payload, never as HTTP
    // errors.
    let payload = state.aggregator.aggregate(&scope).await;
    Ok(Json(payload))
}
