//! Response assembler: drives one full aggregation pass and folds every
//! failure into degraded sections. Nothing here returns an error to the
//! caller.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::external::warehouse::Warehouse;
use crate::models::{
    AdvisorScope, AggregationPayload, AllocationSlice, HoldingEntry, PayloadMetadata, RiskCell,
    SectionResult, Sections, SummaryMetrics, TrendPoint,
};
use crate::services::catalog;
use crate::services::context;
use crate::services::insights::InsightGenerator;
use crate::services::metrics;
use crate::services::orchestrator::{self, QueryResult};

pub struct Aggregator {
    warehouse: Arc<dyn Warehouse>,
    insights: InsightGenerator,
    query_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        insights: InsightGenerator,
        query_timeout: Duration,
    ) -> Self {
        Self {
            warehouse,
            insights,
            query_timeout,
        }
    }

    /// One linear pass: orchestrator, composer, generator, formatters.
    /// Always yields a fully keyed payload; degraded upstreams become
    /// typed zero-value sections, never errors.
    pub async fn aggregate(&self, scope: &AdvisorScope) -> AggregationPayload {
        info!(
            "aggregating analytics for advisor {} (client: {:?})",
            scope.advisor_id, scope.client_id
        );

        let results = orchestrator::run_catalog(
            self.warehouse.as_ref(),
            catalog::specs(),
            scope,
            self.query_timeout,
        )
        .await;

        let blocks: Vec<_> = results.iter().map(context::compose_block).collect();
        let insight = self.insights.generate(&blocks).await;

        let overview = find(&results, catalog::PORTFOLIO_OVERVIEW);
        let holdings = find(&results, catalog::TOP_HOLDINGS);
        let trends = find(&results, catalog::MONTHLY_TRENDS);
        let risk = find(&results, catalog::RISK_METRICS);

        let insights_section = SectionResult {
            degraded: insight.degraded,
            error_reason: insight
                .degraded
                .then(|| "all insight providers failed".to_string()),
            data: insight,
        };

        let sections = Sections {
            summary: format_summary(overview),
            allocation: format_allocation(overview),
            top_holdings: format_top_holdings(holdings),
            monthly_trends: format_monthly_trends(trends),
            risk_heatmap: format_risk_heatmap(risk),
            insights: insights_section,
        };

        let degraded_sections = sections.degraded_names();
        if !degraded_sections.is_empty() {
            info!(
                "aggregation degraded sections: {:?}",
                degraded_sections.iter().map(|s| s.as_str()).collect::<Vec<_>>()
            );
        }

        AggregationPayload {
            sections,
            metadata: PayloadMetadata {
                generated_at: Utc::now(),
                degraded_sections,
            },
        }
    }
}

/// The orchestrator contract guarantees one result per spec; a missing
/// entry would mean the catalog and this lookup disagree, so treat it as
/// a failed query rather than panicking.
fn find<'a>(results: &'a [QueryResult], name: &'static str) -> Option<&'a QueryResult> {
    results.iter().find(|r| r.spec_name == name)
}

fn fallback<T>(data: T, result: Option<&QueryResult>) -> SectionResult<T> {
    SectionResult::degraded(data, result.and_then(|r| r.error_reason.clone()))
}

pub(crate) fn format_summary(result: Option<&QueryResult>) -> SectionResult<SummaryMetrics> {
    let Some(result) = result.filter(|r| r.is_usable()) else {
        return fallback(SummaryMetrics::default(), result);
    };

    let total_aum: f64 = result
        .rows
        .iter()
        .map(|r| r.get_f64("total_value").unwrap_or(0.0))
        .sum();
    let total_clients: i64 = result
        .rows
        .iter()
        .map(|r| r.get_i64("clients_count").unwrap_or(0))
        .sum();
    let total_holdings: i64 = result
        .rows
        .iter()
        .map(|r| r.get_i64("holdings_count").unwrap_or(0))
        .sum();

    SectionResult::ok(SummaryMetrics {
        total_aum,
        total_clients,
        total_holdings,
        asset_classes: result.rows.len() as i64,
        avg_client_portfolio: if total_clients > 0 {
            total_aum / total_clients as f64
        } else {
            0.0
        },
        performance_tier: metrics::performance_tier(total_aum).to_string(),
    })
}

pub(crate) fn format_allocation(
    result: Option<&QueryResult>,
) -> SectionResult<Vec<AllocationSlice>> {
    let Some(result) = result.filter(|r| r.is_usable()) else {
        return fallback(Vec::new(), result);
    };

    let total: f64 = result
        .rows
        .iter()
        .map(|r| r.get_f64("total_value").unwrap_or(0.0))
        .sum();

    let slices = result
        .rows
        .iter()
        .map(|row| {
            let asset_class = row.get_str("asset_class").unwrap_or("Unknown").to_string();
            let value = row.get_f64("total_value").unwrap_or(0.0);
            AllocationSlice {
                percentage: metrics::percentage(value, total),
                color: metrics::asset_color(&asset_class).to_string(),
                holdings_count: row.get_i64("holdings_count").unwrap_or(0),
                clients_count: row.get_i64("clients_count").unwrap_or(0),
                asset_class,
                value,
            }
        })
        .collect();

    SectionResult::ok(slices)
}

pub(crate) fn format_top_holdings(
    result: Option<&QueryResult>,
) -> SectionResult<Vec<HoldingEntry>> {
    let Some(result) = result.filter(|r| r.is_usable()) else {
        return fallback(Vec::new(), result);
    };

    let entries = result
        .rows
        .iter()
        .map(|row| HoldingEntry {
            symbol: row.get_str("symbol").unwrap_or("Unknown").to_string(),
            asset_class: row.get_str("asset_class").unwrap_or("Unknown").to_string(),
            client_id: row.get_str("client_id").unwrap_or("").to_string(),
            value: row.get_f64("value").unwrap_or(0.0),
            quantity: row.get_i64("quantity").unwrap_or(0),
            current_price: row.get_f64("current_price").unwrap_or(0.0),
            performance_pct: row.get_f64("performance_pct").unwrap_or(0.0),
        })
        .collect();

    SectionResult::ok(entries)
}

pub(crate) fn format_monthly_trends(
    result: Option<&QueryResult>,
) -> SectionResult<Vec<TrendPoint>> {
    let Some(result) = result.filter(|r| r.is_usable()) else {
        return fallback(Vec::new(), result);
    };

    let points = result
        .rows
        .iter()
        .map(|row| {
            let inflows = row.get_f64("inflows").unwrap_or(0.0);
            let outflows = row.get_f64("outflows").unwrap_or(0.0);
            TrendPoint {
                month: row.get_str("month").unwrap_or("").to_string(),
                inflows,
                outflows,
                net_flow: inflows - outflows,
                active_clients: row.get_i64("active_clients").unwrap_or(0),
            }
        })
        .collect();

    SectionResult::ok(points)
}

pub(crate) fn format_risk_heatmap(result: Option<&QueryResult>) -> SectionResult<Vec<RiskCell>> {
    let Some(result) = result.filter(|r| r.is_usable()) else {
        return fallback(Vec::new(), result);
    };

    let total_exposure: f64 = result
        .rows
        .iter()
        .map(|r| r.get_f64("exposure").unwrap_or(0.0))
        .sum();

    let cells = result
        .rows
        .iter()
        .map(|row| {
            let exposure = row.get_f64("exposure").unwrap_or(0.0);
            let volatility = row.get_f64("volatility");
            RiskCell {
                asset_class: row.get_str("asset_class").unwrap_or("Unknown").to_string(),
                sector: row.get_str("sector").unwrap_or("Unknown").to_string(),
                exposure,
                exposure_pct: metrics::percentage(exposure, total_exposure),
                positions: row.get_i64("positions").unwrap_or(0),
                risk_level: metrics::risk_level(volatility, exposure).to_string(),
                volatility: volatility.unwrap_or(0.0),
            }
        })
        .collect();

    SectionResult::ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::warehouse::WarehouseRow;

    fn overview_result(rows: Vec<WarehouseRow>) -> QueryResult {
        QueryResult::complete(catalog::PORTFOLIO_OVERVIEW, rows)
    }

    fn overview_row(class: &str, value: f64, holdings: i64, clients: i64) -> WarehouseRow {
        WarehouseRow::new()
            .with("asset_class", class)
            .with("total_value", value)
            .with("holdings_count", holdings)
            .with("clients_count", clients)
    }

    #[test]
    fn summary_sums_rows_and_assigns_tier() {
        let result = overview_result(vec![
            overview_row("Stocks", 6_000_000.0, 10, 4),
            overview_row("Bonds", 2_000_000.0, 5, 2),
        ]);

        let section = format_summary(Some(&result));
        assert!(!section.degraded);
        assert_eq!(section.data.total_aum, 8_000_000.0);
        assert_eq!(section.data.total_holdings, 15);
        assert_eq!(section.data.total_clients, 6);
        assert_eq!(section.data.asset_classes, 2);
        assert_eq!(section.data.performance_tier, "Platinum");
    }

    #[test]
    fn failed_query_degrades_summary_with_reason() {
        let result = QueryResult::failed(catalog::PORTFOLIO_OVERVIEW, "transport error".into());

        let section = format_summary(Some(&result));
        assert!(section.degraded);
        assert_eq!(section.data.total_aum, 0.0);
        assert_eq!(section.error_reason.as_deref(), Some("transport error"));
    }

    #[test]
    fn empty_query_degrades_without_reason() {
        let result = overview_result(Vec::new());

        let section = format_allocation(Some(&result));
        assert!(section.degraded);
        assert!(section.data.is_empty());
        assert!(section.error_reason.is_none());
    }

    #[test]
    fn allocation_percentages_sum_to_hundred() {
        let result = overview_result(vec![
            overview_row("Stocks", 600_000.0, 3, 2),
            overview_row("Bonds", 400_000.0, 2, 1),
        ]);

        let section = format_allocation(Some(&result));
        let slices = &section.data;
        assert_eq!(slices[0].percentage, 60.0);
        assert_eq!(slices[1].percentage, 40.0);
        let sum: f64 = slices.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.1);
        assert_eq!(slices[0].color, "#3B82F6");
    }

    #[test]
    fn allocation_zero_total_yields_all_zero_percentages() {
        let result = overview_result(vec![
            overview_row("Stocks", 0.0, 0, 0),
            overview_row("Bonds", 0.0, 0, 0),
        ]);

        let section = format_allocation(Some(&result));
        assert!(section.data.iter().all(|s| s.percentage == 0.0));
    }

    #[test]
    fn holdings_coerce_missing_numerics_to_zero() {
        let result = QueryResult::complete(
            catalog::TOP_HOLDINGS,
            vec![WarehouseRow::new()
                .with("symbol", "AAPL")
                .with("asset_class", "Stocks")
                .with("client_id", "CL001")
                .with("value", "150000")],
        );

        let section = format_top_holdings(Some(&result));
        let entry = &section.data[0];
        assert_eq!(entry.value, 150_000.0);
        assert_eq!(entry.quantity, 0);
        assert_eq!(entry.current_price, 0.0);
        assert_eq!(entry.performance_pct, 0.0);
    }

    #[test]
    fn trends_compute_net_flow() {
        let result = QueryResult::complete(
            catalog::MONTHLY_TRENDS,
            vec![WarehouseRow::new()
                .with("month", "2026-07")
                .with("inflows", 1_200_000.0)
                .with("outflows", 800_000.0)
                .with("active_clients", 9)],
        );

        let section = format_monthly_trends(Some(&result));
        assert_eq!(section.data[0].net_flow, 400_000.0);
    }

    #[test]
    fn risk_heatmap_missing_volatility_reads_low() {
        let result = QueryResult::complete(
            catalog::RISK_METRICS,
            vec![
                WarehouseRow::new()
                    .with("asset_class", "Stocks")
                    .with("sector", "Technology")
                    .with("exposure", 2_000_000.0)
                    .with("positions", 12)
                    .with("volatility", 60.0),
                WarehouseRow::new()
                    .with("asset_class", "Cash")
                    .with("sector", "Cash")
                    .with("exposure", 5_000_000.0)
                    .with("positions", 1),
            ],
        );

        let section = format_risk_heatmap(Some(&result));
        assert_eq!(section.data[0].risk_level, "high");
        assert_eq!(section.data[1].risk_level, "low");
        assert_eq!(section.data[1].volatility, 0.0);
    }
}
