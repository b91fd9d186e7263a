use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use shopintent_core::error::CoreError;

use crate::{error::AppError, state::AppState};

/// `GET /api/filter-options` - distinct values for populating filter widgets.
#[tracing::instrument(skip(state))]
pub async fn get_filter_options(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let options = state
        .source
        .filter_options()
        .await
        .map_err(CoreError::SourceUnavailable)?;
    Ok(Json(json!({ "data": options })))
}
