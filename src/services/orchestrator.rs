use futures::future::join_all;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::external::warehouse::{Warehouse, WarehouseRow};
use crate::models::AdvisorScope;
use crate::services::catalog::QuerySpec;

/// Outcome of one catalog query. `partial` marks any failure mode (timeout,
/// transport, malformed result); siblings are unaffected.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub spec_name: &'static str,
    pub rows: Vec<WarehouseRow>,
    pub partial: bool,
    pub error_reason: Option<String>,
}

impl QueryResult {
    pub fn complete(spec_name: &'static str, rows: Vec<WarehouseRow>) -> Self {
        Self {
            spec_name,
            rows,
            partial: false,
            error_reason: None,
        }
    }

    pub fn failed(spec_name: &'static str, reason: String) -> Self {
        Self {
            spec_name,
            rows: Vec::new(),
            partial: true,
            error_reason: Some(reason),
        }
    }

    /// A result can feed a section formatter only when it completed and
    /// actually returned rows.
    pub fn is_usable(&self) -> bool {
        !self.partial && !self.rows.is_empty()
    }
}

/// Fan out every catalog query concurrently and join on all of them.
///
/// Returns one `QueryResult` per spec, always in catalog declaration order
/// regardless of completion order. Never errors: each per-query failure is
/// folded into that query's result.
pub async fn run_catalog(
    warehouse: &dyn Warehouse,
    specs: &[QuerySpec],
    scope: &AdvisorScope,
    per_query_timeout: Duration,
) -> Vec<QueryResult> {
    let queries = specs.iter().map(|spec| {
        let (sql, params) = spec.render(scope);
        async move {
            match timeout(
                per_query_timeout,
                warehouse.execute(&sql, &params, per_query_timeout),
            )
            .await
            {
                Ok(Ok(rows)) => {
                    info!("query {} returned {} rows", spec.name, rows.len());
                    QueryResult::complete(spec.name, rows)
                }
                Ok(Err(e)) => {
                    warn!("query {} failed: {}", spec.name, e);
                    QueryResult::failed(spec.name, e.to_string())
                }
                Err(_) => {
                    warn!(
                        "query {} timed out after {:?}",
                        spec.name, per_query_timeout
                    );
                    QueryResult::failed(
                        spec.name,
                        format!("query timed out after {:?}", per_query_timeout),
                    )
                }
            }
        }
    });

    // join_all preserves input order, which keeps downstream formatting
    // deterministic independent of completion order.
    join_all(queries).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::warehouse::WarehouseError;
    use async_trait::async_trait;

    struct ScriptedWarehouse;

    #[async_trait]
    impl Warehouse for ScriptedWarehouse {
        async fn execute(
            &self,
            sql: &str,
            _params: &[(String, String)],
            _timeout: Duration,
        ) -> Result<Vec<WarehouseRow>, WarehouseError> {
            // "slow" finishes last, "broken" errors, everything else
            // returns a single row immediately.
            if sql.contains("broken") {
                return Err(WarehouseError::Transport("connection refused".into()));
            }
            if sql.contains("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(vec![WarehouseRow::new().with("ok", 1)])
        }
    }

    struct HangingWarehouse;

    #[async_trait]
    impl Warehouse for HangingWarehouse {
        async fn execute(
            &self,
            _sql: &str,
            _params: &[(String, String)],
            _timeout: Duration,
        ) -> Result<Vec<WarehouseRow>, WarehouseError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    fn spec(name: &'static str, template: &'static str) -> QuerySpec {
        QuerySpec { name, template }
    }

    #[tokio::test]
    async fn results_follow_catalog_order_not_completion_order() {
        let specs = [
            spec("first", "SELECT slow WHERE a = @advisor_id {client_filter}"),
            spec("second", "SELECT fast WHERE a = @advisor_id {client_filter}"),
        ];
        let scope = AdvisorScope::for_advisor("ADV001");

        let results = run_catalog(
            &ScriptedWarehouse,
            &specs,
            &scope,
            Duration::from_secs(1),
        )
        .await;

        let names: Vec<_> = results.iter().map(|r| r.spec_name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn one_failure_never_aborts_siblings() {
        let specs = [
            spec("good", "SELECT fast WHERE a = @advisor_id {client_filter}"),
            spec("bad", "SELECT broken WHERE a = @advisor_id {client_filter}"),
        ];
        let scope = AdvisorScope::for_advisor("ADV001");

        let results = run_catalog(
            &ScriptedWarehouse,
            &specs,
            &scope,
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].partial);
        assert!(results[1].partial);
        assert!(results[1]
            .error_reason
            .as_deref()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn timeout_marks_result_partial() {
        let specs = [spec(
            "hangs",
            "SELECT x WHERE a = @advisor_id {client_filter}",
        )];
        let scope = AdvisorScope::for_advisor("ADV001");

        let results = run_catalog(
            &HangingWarehouse,
            &specs,
            &scope,
            Duration::from_millis(20),
        )
        .await;

        assert!(results[0].partial);
        assert!(results[0]
            .error_reason
            .as_deref()
            .unwrap()
            .contains("timed out"));
    }

    #[test]
    fn empty_complete_result_is_not_usable() {
        let result = QueryResult::complete("overview", Vec::new());
        assert!(!result.is_usable());
        assert!(!result.partial);
    }
}
