use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The filter configuration cannot be evaluated. Raised before any
    /// aggregation runs.
    #[error("invalid filter `{field}`: {message}")]
    InvalidFilter {
        field: &'static str,
        message: String,
    },

    /// The session source could not produce a snapshot. Callers may retry.
    #[error("session source unavailable: {0}")]
    SourceUnavailable(#[source] anyhow::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_filter(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::InvalidFilter {
            field,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::SourceUnavailable(_))
    }
}
