mod insight;
mod payload;
mod scope;

pub use insight::InsightResponse;
pub use payload::{
    AggregationPayload, AllocationSlice, HoldingEntry, PayloadMetadata, RiskCell, SectionName,
    SectionResult, Sections, SummaryMetrics, TrendPoint,
};
pub use scope::AdvisorScope;
