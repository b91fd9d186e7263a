use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use shopintent_core::aggregate::{GroupKey, PageTypeAverages, RowOrder};
use shopintent_core::engine::{MetricKind, MetricOutput, MetricRequest};
use shopintent_core::preset::Preset;

use crate::{
    error::AppError,
    routes::query::{parse_ordered_list, FilterQuery},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub group_by: Option<String>,
    pub order: Option<String>,
    pub layout: Option<String>,
    #[serde(flatten)]
    pub filter: FilterQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Wide,
    Tidy,
}

/// `GET /api/metrics/{kind}` - one metric over the filtered sessions.
#[tracing::instrument(skip(state, query))]
pub async fn get_metric(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<MetricsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let metric_kind = resolve_kind(&kind, &query)?;
    let layout = match query.layout.as_deref().map(str::trim) {
        None | Some("") | Some("wide") => Layout::Wide,
        Some("tidy") if metric_kind == MetricKind::PageTypePerformance => Layout::Tidy,
        Some("tidy") => {
            return Err(AppError::validation(
                "layout",
                "tidy layout is only available for page_type_performance",
            ))
        }
        Some(other) => {
            return Err(AppError::validation(
                "layout",
                format!("unknown layout: {other}"),
            ))
        }
    };

    let filter = query.filter.to_filter()?;
    let output = state
        .metric(MetricRequest::new(metric_kind, filter))
        .await?;

    let rows = match (layout, output.as_ref()) {
        (Layout::Tidy, MetricOutput::PageTypePerformance(rows)) => {
            let tidy: Vec<PageTypeAverages> = rows.iter().flat_map(|r| r.tidy()).collect();
            serde_json::to_value(tidy).map_err(anyhow::Error::from)?
        }
        (_, output) => output.to_rows_json()?,
    };

    Ok(Json(json!({
        "data": {
            "kind": kind,
            "rows": rows,
        }
    })))
}

fn resolve_kind(kind: &str, query: &MetricsQuery) -> Result<MetricKind, AppError> {
    if kind == "conversion" {
        let Some(raw) = query.group_by.as_deref() else {
            return Err(AppError::validation(
                "group_by",
                "conversion requires at least one group key",
            ));
        };
        let group_by: Vec<GroupKey> = parse_ordered_list(raw, "group_by")?;
        if group_by.is_empty() {
            return Err(AppError::validation(
                "group_by",
                "conversion requires at least one group key",
            ));
        }
        let order = match query.order.as_deref().map(str::trim) {
            None | Some("") => RowOrder::default(),
            Some(raw) => raw
                .parse::<RowOrder>()
                .map_err(|e| AppError::validation("order", e))?,
        };
        return Ok(MetricKind::Conversion { group_by, order });
    }

    if query.group_by.is_some() {
        return Err(AppError::validation(
            "group_by",
            "group_by is only accepted by the conversion metric",
        ));
    }
    if query.order.is_some() {
        return Err(AppError::validation(
            "order",
            "order is only accepted by the conversion metric",
        ));
    }

    let resolved = match kind {
        "engagement" => MetricKind::EngagementImpact,
        "page_type_performance" => MetricKind::PageTypePerformance,
        "page_type_breakdown" => MetricKind::PageTypeBreakdown,
        "summary" => MetricKind::ExecutiveSummary,
        other => match other.parse::<Preset>() {
            Ok(preset) => MetricKind::preset(preset),
            Err(_) => {
                return Err(AppError::NotFound(format!(
                    "unknown metric: {other} (expected one of: {})",
                    metric_names().join(", ")
                )))
            }
        },
    };
    Ok(resolved)
}

fn metric_names() -> Vec<&'static str> {
    let mut names = vec![
        "conversion",
        "engagement",
        "page_type_performance",
        "page_type_breakdown",
        "summary",
    ];
    names.extend(Preset::ALL.iter().map(|p| p.name()));
    names
}
