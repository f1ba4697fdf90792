//! Context composer: condenses query results into deterministic text
//! blocks for the insight prompt. Pure string work, no I/O.

use crate::services::catalog;
use crate::services::metrics::format_currency;
use crate::services::orchestrator::QueryResult;

/// Literal placeholder emitted for empty or partial results so the prompt
/// structure stays stable.
pub const NO_DATA_MARKER: &str = "no data available";

/// At most this many rows of a result are summarized per block.
pub const MAX_CONTEXT_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ContextBlock {
    pub label: String,
    pub text: String,
}

/// Render one query result as a prompt block. Always produces exactly one
/// block; missing data becomes the placeholder marker, never an omission.
pub fn compose_block(result: &QueryResult) -> ContextBlock {
    let label = block_label(result.spec_name).to_string();

    if result.partial || result.rows.is_empty() {
        return ContextBlock {
            label,
            text: NO_DATA_MARKER.to_string(),
        };
    }

    let text = result
        .rows
        .iter()
        .take(MAX_CONTEXT_ROWS)
        .map(|row| render_line(result.spec_name, row))
        .collect::<Vec<_>>()
        .join("\n");

    ContextBlock { label, text }
}

fn block_label(spec_name: &str) -> &'static str {
    match spec_name {
        catalog::PORTFOLIO_OVERVIEW => "Portfolio summary",
        catalog::TOP_HOLDINGS => "Top holdings",
        catalog::MONTHLY_TRENDS => "Monthly activity",
        catalog::RISK_METRICS => "Risk analysis",
        _ => "Additional data",
    }
}

fn render_line(spec_name: &str, row: &crate::external::warehouse::WarehouseRow) -> String {
    match spec_name {
        catalog::PORTFOLIO_OVERVIEW => format!(
            "{}: {} ({} holdings)",
            row.get_str("asset_class").unwrap_or("Unknown"),
            format_currency(row.get_f64("total_value").unwrap_or(0.0)),
            row.get_i64("holdings_count").unwrap_or(0),
        ),
        catalog::TOP_HOLDINGS => format!(
            "{}: {}",
            row.get_str("symbol").unwrap_or("Unknown"),
            format_currency(row.get_f64("value").unwrap_or(0.0)),
        ),
        catalog::MONTHLY_TRENDS => format!(
            "{}: inflows {}, outflows {}",
            row.get_str("month").unwrap_or("Unknown"),
            format_currency(row.get_f64("inflows").unwrap_or(0.0)),
            format_currency(row.get_f64("outflows").unwrap_or(0.0)),
        ),
        catalog::RISK_METRICS => format!(
            "{} / {}: {} exposure, {} positions",
            row.get_str("asset_class").unwrap_or("Unknown"),
            row.get_str("sector").unwrap_or("Unknown"),
            format_currency(row.get_f64("exposure").unwrap_or(0.0)),
            row.get_i64("positions").unwrap_or(0),
        ),
        _ => row
            .get_str("label")
            .unwrap_or("Unknown")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::warehouse::WarehouseRow;

    fn overview_row(class: &str, value: f64, count: i64) -> WarehouseRow {
        WarehouseRow::new()
            .with("asset_class", class)
            .with("total_value", value)
            .with("holdings_count", count)
    }

    #[test]
    fn empty_result_yields_single_placeholder_block() {
        let result = QueryResult::complete(catalog::PORTFOLIO_OVERVIEW, Vec::new());
        let block = compose_block(&result);

        assert_eq!(block.label, "Portfolio summary");
        assert_eq!(block.text, NO_DATA_MARKER);
    }

    #[test]
    fn partial_result_yields_placeholder_not_rows() {
        let mut result = QueryResult::failed(catalog::RISK_METRICS, "timed out".into());
        result.rows = vec![WarehouseRow::new().with("asset_class", "Stocks")];

        assert_eq!(compose_block(&result).text, NO_DATA_MARKER);
    }

    #[test]
    fn overview_rows_render_with_currency_formatting() {
        let result = QueryResult::complete(
            catalog::PORTFOLIO_OVERVIEW,
            vec![
                overview_row("Stocks", 600_000.0, 3),
                overview_row("Bonds", 400_000.0, 2),
            ],
        );
        let block = compose_block(&result);

        assert_eq!(
            block.text,
            "Stocks: $600,000 (3 holdings)\nBonds: $400,000 (2 holdings)"
        );
    }

    #[test]
    fn blocks_clamp_to_max_rows() {
        let rows: Vec<WarehouseRow> = (0..10)
            .map(|i| overview_row("Stocks", i as f64, i))
            .collect();
        let result = QueryResult::complete(catalog::PORTFOLIO_OVERVIEW, rows);

        let block = compose_block(&result);
        assert_eq!(block.text.lines().count(), MAX_CONTEXT_ROWS);
    }

    #[test]
    fn composition_is_deterministic() {
        let result = QueryResult::complete(
            catalog::TOP_HOLDINGS,
            vec![WarehouseRow::new().with("symbol", "AAPL").with("value", 150_000.0)],
        );

        assert_eq!(compose_block(&result), compose_block(&result));
    }
}
