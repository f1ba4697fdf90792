use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("query timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed result: {0}")]
    Malformed(String),
}

/// One result row keyed by column name. Warehouse engines return numerics
/// as JSON numbers or numeric strings depending on the backend; the typed
/// getters accept both so formatters stay backend-agnostic.
#[derive(Debug, Clone, Default)]
pub struct WarehouseRow {
    columns: BTreeMap<String, Value>,
}

impl WarehouseRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.columns.insert(name.into(), value);
    }

    /// Builder-style insert, mostly used when constructing rows in tests.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.columns.insert(name.to_string(), value.into());
        self
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.columns.get(name).and_then(Value::as_str)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.columns.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.columns.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s
                .parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64)),
            _ => None,
        }
    }
}

/// Read-only analytic data store. Implementations must scope every query
/// with the supplied named parameters and never mutate upstream state.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn execute(
        &self,
        sql: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> Result<Vec<WarehouseRow>, WarehouseError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_f64_accepts_numbers_and_numeric_strings() {
        let row = WarehouseRow::new()
            .with("as_number", 600000.0)
            .with("as_string", "400000.5")
            .with("not_numeric", "Stocks");

        assert_eq!(row.get_f64("as_number"), Some(600000.0));
        assert_eq!(row.get_f64("as_string"), Some(400000.5));
        assert_eq!(row.get_f64("not_numeric"), None);
        assert_eq!(row.get_f64("missing"), None);
    }

    #[test]
    fn get_i64_truncates_fractional_strings() {
        let row = WarehouseRow::new().with("count", "12").with("avg", "3.7");
        assert_eq!(row.get_i64("count"), Some(12));
        assert_eq!(row.get_i64("avg"), Some(3));
    }

    #[test]
    fn null_column_reads_as_none() {
        let row = WarehouseRow::new().with("volatility", json!(null));
        assert_eq!(row.get_f64("volatility"), None);
        assert_eq!(row.get_str("volatility"), None);
    }
}
