pub mod aggregation;
pub mod catalog;
pub mod context;
pub mod insights;
pub mod metrics;
pub mod orchestrator;
