use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use shopintent_core::cohort::CohortView;
use shopintent_core::engine::{MetricKind, MetricRequest};

use crate::{error::AppError, routes::query::FilterQuery, state::AppState};

/// `GET /api/cohorts/{view}` - a fixed cross-tabulation over all sessions.
///
/// Filter parameters are parsed so that supplying any of them is reported
/// as a validation error instead of being silently ignored.
#[tracing::instrument(skip(state, query))]
pub async fn get_cohort(
    State(state): State<Arc<AppState>>,
    Path(view): Path<String>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let cohort: CohortView = view
        .parse()
        .map_err(AppError::NotFound)?;
    let filter = query.to_filter()?;

    let output = state
        .metric(MetricRequest::new(MetricKind::Cohort(cohort), filter))
        .await?;

    Ok(Json(json!({
        "data": {
            "kind": cohort.name(),
            "rows": output.to_rows_json()?,
        }
    })))
}
