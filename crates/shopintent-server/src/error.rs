use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use shopintent_core::error::CoreError;

/// Seconds a client should wait before retrying after the session store
/// failed.
pub const SOURCE_RETRY_AFTER_SECONDS: u64 = 5;

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// A request parameter failed validation. `field` names the parameter.
    #[error("invalid `{field}`: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("session source unavailable")]
    SourceUnavailable { retry_after_seconds: u64 },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        if err.is_retryable() {
            tracing::warn!(error = %err, "Session source unavailable");
            return AppError::SourceUnavailable {
                retry_after_seconds: SOURCE_RETRY_AFTER_SECONDS,
            };
        }
        match err {
            CoreError::InvalidFilter { field, message } => AppError::Validation { field, message },
            CoreError::SourceUnavailable(e) => AppError::Internal(e),
            CoreError::Serialization(e) => AppError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, field, retry_after_seconds) = match &self {
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "not_found",
                msg.clone(),
                None,
                None,
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
                None,
                None,
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message.clone(),
                Some(*field),
                None,
            ),
            AppError::SourceUnavailable {
                retry_after_seconds,
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "source_unavailable",
                "Session data is temporarily unavailable, retry later".to_string(),
                None,
                Some(*retry_after_seconds),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                    None,
                )
            }
        };

        let mut response = (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                    "field": field
                }
            })),
        )
            .into_response();

        if let Some(retry_after_seconds) = retry_after_seconds {
            if let Ok(value) = retry_after_seconds.to_string().parse() {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }

        response
    }
}
