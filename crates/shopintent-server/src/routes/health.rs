use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /health` - is the session store answering queries?
///
/// `"ok"` means metric requests can be served. `"degraded"` (503) means the
/// DuckDB connection behind `shopper_data` and the `dim_*` tables failed a
/// trivial query, so metric, cohort and dimension endpoints will also fail
/// until it recovers.
///
/// ```json
/// { "status": "ok", "version": "0.1.0", "cached_results": 3 }
/// ```
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "cached_results": state.cached_results().await
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check: session store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
                .into_response()
        }
    }
}
