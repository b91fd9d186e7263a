use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use shopintent_core::dimension::Dimension;
use shopintent_core::error::CoreError;

use crate::{error::AppError, state::AppState};

const MAX_NAME_LEN: usize = 128;

#[derive(Debug, Deserialize)]
pub struct RenameDimensionRequest {
    pub name: String,
}

/// `GET /api/dimensions` - all four code-to-name registries.
#[tracing::instrument(skip(state))]
pub async fn list_dimensions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let registries = state
        .source
        .dimensions()
        .await
        .map_err(CoreError::SourceUnavailable)?;
    Ok(Json(json!({ "data": registries })))
}

/// `PUT /api/dimensions/{dimension}/{code}` - insert or rename one entry.
///
/// The source bumps its data generation, so cached metric results computed
/// with the old name are not served again.
#[tracing::instrument(skip(state, body))]
pub async fn rename_dimension(
    State(state): State<Arc<AppState>>,
    Path((dimension, code)): Path<(String, String)>,
    Json(body): Json<RenameDimensionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let dimension: Dimension = dimension
        .parse()
        .map_err(AppError::NotFound)?;
    let code: u16 = code
        .trim()
        .parse()
        .ok()
        .filter(|c| *c > 0)
        .ok_or_else(|| AppError::validation("code", "code must be an integer from 1 to 65535"))?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "name must not be blank"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(
            "name",
            format!("name must be at most {MAX_NAME_LEN} characters"),
        ));
    }

    let previous = state
        .source
        .rename_dimension(dimension, code, name)
        .await
        .map_err(CoreError::SourceUnavailable)?;

    tracing::info!(dimension = %dimension, code, "Dimension entry updated");
    Ok(Json(json!({
        "data": {
            "dimension": dimension.as_str(),
            "code": code,
            "name": name,
            "previous_name": previous,
        }
    })))
}
