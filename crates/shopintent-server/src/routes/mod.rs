pub mod cohorts;
pub mod dimensions;
pub mod filter_options;
pub mod health;
pub mod metrics;
pub mod query;
