use std::sync::Arc;

use crate::services::aggregation::Aggregator;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}
