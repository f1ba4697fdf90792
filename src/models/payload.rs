use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::InsightResponse;

/// Fixed set of payload sections. Declaration order here is the order
/// sections appear in the serialized payload and in `degraded_sections`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Summary,
    Allocation,
    TopHoldings,
    MonthlyTrends,
    RiskHeatmap,
    Insights,
}

impl SectionName {
    pub const ALL: [SectionName; 6] = [
        SectionName::Summary,
        SectionName::Allocation,
        SectionName::TopHoldings,
        SectionName::MonthlyTrends,
        SectionName::RiskHeatmap,
        SectionName::Insights,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::Summary => "summary",
            SectionName::Allocation => "allocation",
            SectionName::TopHoldings => "top_holdings",
            SectionName::MonthlyTrends => "monthly_trends",
            SectionName::RiskHeatmap => "risk_heatmap",
            SectionName::Insights => "insights",
        }
    }
}

/// One payload section: typed data plus degradation bookkeeping.
/// A degraded section carries a safe default in `data`, never a hole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionResult<T> {
    pub data: T,
    pub degraded: bool,
    pub error_reason: Option<String>,
}

impl<T> SectionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data,
            degraded: false,
            error_reason: None,
        }
    }

    pub fn degraded(data: T, error_reason: Option<String>) -> Self {
        Self {
            data,
            degraded: true,
            error_reason,
        }
    }
}

/// Headline KPI card values. Numbers coerce to 0 when upstream data is
/// unavailable; `performance_tier` follows the AUM tier thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_aum: f64,
    pub total_clients: i64,
    pub total_holdings: i64,
    pub asset_classes: i64,
    pub avg_client_portfolio: f64,
    pub performance_tier: String,
}

impl Default for SummaryMetrics {
    fn default() -> Self {
        Self {
            total_aum: 0.0,
            total_clients: 0,
            total_holdings: 0,
            asset_classes: 0,
            avg_client_portfolio: 0.0,
            performance_tier: "Silver".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub asset_class: String,
    pub value: f64,
    pub percentage: f64,
    pub holdings_count: i64,
    pub clients_count: i64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingEntry {
    pub symbol: String,
    pub asset_class: String,
    pub client_id: String,
    pub value: f64,
    pub quantity: i64,
    pub current_price: f64,
    pub performance_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: String,
    pub inflows: f64,
    pub outflows: f64,
    pub net_flow: f64,
    pub active_clients: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCell {
    pub asset_class: String,
    pub sector: String,
    pub exposure: f64,
    pub exposure_pct: f64,
    pub positions: i64,
    pub volatility: f64,
    pub risk_level: String,
}

/// Every section the aggregation produces, always fully keyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sections {
    pub summary: SectionResult<SummaryMetrics>,
    pub allocation: SectionResult<Vec<AllocationSlice>>,
    pub top_holdings: SectionResult<Vec<HoldingEntry>>,
    pub monthly_trends: SectionResult<Vec<TrendPoint>>,
    pub risk_heatmap: SectionResult<Vec<RiskCell>>,
    pub insights: SectionResult<InsightResponse>,
}

impl Sections {
    /// Names of degraded sections, in declared section order.
    pub fn degraded_names(&self) -> Vec<SectionName> {
        let flags = [
            (SectionName::Summary, self.summary.degraded),
            (SectionName::Allocation, self.allocation.degraded),
            (SectionName::TopHoldings, self.top_holdings.degraded),
            (SectionName::MonthlyTrends, self.monthly_trends.degraded),
            (SectionName::RiskHeatmap, self.risk_heatmap.degraded),
            (SectionName::Insights, self.insights.degraded),
        ];
        flags
            .into_iter()
            .filter_map(|(name, degraded)| degraded.then_some(name))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadMetadata {
    pub generated_at: DateTime<Utc>,
    pub degraded_sections: Vec<SectionName>,
}

/// The one response shape the aggregation boundary produces. Always
/// contains every section regardless of upstream failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationPayload {
    pub sections: Sections,
    pub metadata: PayloadMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_names_serialize_snake_case() {
        let json = serde_json::to_string(&SectionName::RiskHeatmap).unwrap();
        assert_eq!(json, "\"risk_heatmap\"");
    }

    #[test]
    fn degraded_names_follow_declaration_order() {
        let sections = Sections {
            summary: SectionResult::ok(SummaryMetrics::default()),
            allocation: SectionResult::degraded(vec![], None),
            top_holdings: SectionResult::ok(vec![]),
            monthly_trends: SectionResult::degraded(vec![], Some("timed out".into())),
            risk_heatmap: SectionResult::ok(vec![]),
            insights: SectionResult::degraded(
                InsightResponse {
                    lines: vec![],
                    source: "static-default".into(),
                    degraded: true,
                },
                None,
            ),
        };

        assert_eq!(
            sections.degraded_names(),
            vec![
                SectionName::Allocation,
                SectionName::MonthlyTrends,
                SectionName::Insights
            ]
        );
    }

    #[test]
    fn default_summary_is_zero_valued_silver() {
        let summary = SummaryMetrics::default();
        assert_eq!(summary.total_aum, 0.0);
        assert_eq!(summary.total_clients, 0);
        assert_eq!(summary.performance_tier, "Silver");
    }
}
