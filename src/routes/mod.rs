pub mod aggregation;
pub mod health;
