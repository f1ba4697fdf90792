use thiserror::Error;

use crate::models::AdvisorScope;

/// Marker in templates that expands to the client filter clause when the
/// scope names a client and to nothing otherwise.
pub const CLIENT_FILTER_TOKEN: &str = "{client_filter}";

const CLIENT_FILTER_CLAUSE: &str = "AND c.client_id = @client_id";

pub const PORTFOLIO_OVERVIEW: &str = "portfolio_overview";
pub const TOP_HOLDINGS: &str = "top_holdings";
pub const MONTHLY_TRENDS: &str = "monthly_trends";
pub const RISK_METRICS: &str = "risk_metrics";

/// One entry of the static analytic query catalog.
#[derive(Debug, Clone, Copy)]
pub struct QuerySpec {
    pub name: &'static str,
    pub template: &'static str,
}

impl QuerySpec {
    /// Substitute the scope into the template: `@advisor_id` binds always,
    /// `@client_id` only when the scope carries a client.
    pub fn render(&self, scope: &AdvisorScope) -> (String, Vec<(String, String)>) {
        let mut params = vec![("advisor_id".to_string(), scope.advisor_id.clone())];

        let sql = match &scope.client_id {
            Some(client_id) => {
                params.push(("client_id".to_string(), client_id.clone()));
                self.template.replace(CLIENT_FILTER_TOKEN, CLIENT_FILTER_CLAUSE)
            }
            None => self.template.replace(CLIENT_FILTER_TOKEN, ""),
        };

        (sql, params)
    }
}

/// Declaration order here fixes section ordering in the final payload.
static CATALOG: [QuerySpec; 4] = [
    QuerySpec {
        name: PORTFOLIO_OVERVIEW,
        template: "\
SELECT
  h.asset_class,
  COUNT(*) AS holdings_count,
  SUM(h.value) AS total_value,
  COUNT(DISTINCT h.client_id) AS clients_count
FROM holdings h
JOIN clients c ON h.client_id = c.client_id
WHERE c.advisor_id = @advisor_id {client_filter}
GROUP BY h.asset_class
ORDER BY total_value DESC",
    },
    QuerySpec {
        name: TOP_HOLDINGS,
        template: "\
SELECT
  h.symbol,
  h.asset_class,
  h.client_id,
  h.value,
  h.quantity,
  h.current_price,
  ROUND((h.current_price - h.purchase_price) / NULLIF(h.purchase_price, 0) * 100, 2) AS performance_pct
FROM holdings h
JOIN clients c ON h.client_id = c.client_id
WHERE c.advisor_id = @advisor_id {client_filter}
ORDER BY h.value DESC
LIMIT 10",
    },
    QuerySpec {
        name: MONTHLY_TRENDS,
        template: "\
SELECT
  FORMAT_DATE('%Y-%m', DATE_TRUNC(DATE(t.date), MONTH)) AS month,
  SUM(CASE WHEN t.amount > 0 THEN t.amount ELSE 0 END) AS inflows,
  SUM(CASE WHEN t.amount < 0 THEN ABS(t.amount) ELSE 0 END) AS outflows,
  COUNT(DISTINCT c.client_id) AS active_clients
FROM transactions t
JOIN accounts a ON t.account_id = a.account_id
JOIN clients c ON a.client_id = c.client_id
WHERE c.advisor_id = @advisor_id {client_filter}
  AND t.date >= DATE_SUB(CURRENT_DATE(), INTERVAL 12 MONTH)
GROUP BY month
ORDER BY month DESC
LIMIT 12",
    },
    QuerySpec {
        name: RISK_METRICS,
        template: "\
SELECT
  h.asset_class,
  h.sector,
  SUM(h.value) AS exposure,
  COUNT(*) AS positions,
  STDDEV(h.current_price) AS volatility
FROM holdings h
JOIN clients c ON h.client_id = c.client_id
WHERE c.advisor_id = @advisor_id {client_filter}
GROUP BY h.asset_class, h.sector
ORDER BY exposure DESC",
    },
];

pub fn specs() -> &'static [QuerySpec] {
    &CATALOG
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("query catalog is empty")]
    Empty,

    #[error("duplicate query spec name: {0}")]
    DuplicateSpec(String),

    #[error("query spec {0} does not bind @advisor_id")]
    MissingAdvisorParam(String),

    #[error("query spec {0} has no client filter marker")]
    MissingClientFilter(String),
}

/// Startup-only validation. A malformed catalog is the one fatal error
/// class; per-request failures never reach this path.
pub fn validate(specs: &[QuerySpec]) -> Result<(), CatalogError> {
    if specs.is_empty() {
        return Err(CatalogError::Empty);
    }

    for (i, spec) in specs.iter().enumerate() {
        if specs[..i].iter().any(|other| other.name == spec.name) {
            return Err(CatalogError::DuplicateSpec(spec.name.to_string()));
        }
        if !spec.template.contains("@advisor_id") {
            return Err(CatalogError::MissingAdvisorParam(spec.name.to_string()));
        }
        if !spec.template.contains(CLIENT_FILTER_TOKEN) {
            return Err(CatalogError::MissingClientFilter(spec.name.to_string()));
        }
    }

    Ok(())
}
