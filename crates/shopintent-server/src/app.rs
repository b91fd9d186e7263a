use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware, outermost first:
///
/// 1. `TraceLayer` for structured request/response logging via `tracing`.
/// 2. `CorsLayer`, open to any origin unless `SHOPINTENT_CORS_ORIGINS` lists
///    the dashboard hosts.
/// 3. `CompressionLayer` for gzip-encoded metric responses.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/metrics/{kind}", get(routes::metrics::get_metric))
        .route("/api/cohorts/{view}", get(routes::cohorts::get_cohort))
        .route("/api/dimensions", get(routes::dimensions::list_dimensions))
        .route(
            "/api/dimensions/{dimension}/{code}",
            put(routes::dimensions::rename_dimension),
        )
        .route(
            "/api/filter-options",
            get(routes::filter_options::get_filter_options),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
