pub mod aggregate;
pub mod cohort;
pub mod config;
pub mod dimension;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod preset;
pub mod session;
pub mod source;

pub use engine::{evaluate, run, MetricKind, MetricOutput, MetricRequest, Snapshot};
pub use error::CoreError;
pub use filter::FilterConfig;
pub use source::{FilterOptions, InMemorySource, SessionSource};

#[cfg(test)]
pub(crate) mod testing {
    use crate::session::{Month, SessionRecord, RETURNING_VISITOR};

    /// A weekday March session from a returning visitor with every dimension
    /// code set to 1, no page views and no purchase.
    pub fn session(id: i64) -> SessionRecord {
        SessionRecord {
            session_id: id,
            administrative: 0,
            administrative_duration: 0.0,
            informational: 0,
            informational_duration: 0.0,
            product_related: 0,
            product_related_duration: 0.0,
            bounce_rate: 0.0,
            exit_rate: 0.0,
            page_value: 0.0,
            special_day: 0.0,
            month: Some(Month::Mar),
            operating_system: Some(1),
            browser: Some(1),
            region: Some(1),
            traffic_type: Some(1),
            visitor_type: Some(RETURNING_VISITOR.to_string()),
            weekend: false,
            revenue: false,
        }
    }
}
