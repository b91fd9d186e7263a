//! Metric requests and their evaluation against a snapshot.

use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{
    conversion_by, engagement_impact, executive_summary, page_type_breakdown,
    page_type_performance, ConversionRow, EngagementRow, GroupKey, PageTypeBreakdownRow,
    PageTypePerformanceRow, RowOrder, SummaryRow,
};
use crate::cohort::CohortView;
use crate::dimension::DimensionRegistries;
use crate::enrich::{enrich, EnrichedRecord};
use crate::error::CoreError;
use crate::filter::FilterConfig;
use crate::preset::Preset;
use crate::session::SessionRecord;
use crate::source::SessionSource;

/// Immutable sessions and registries a request is evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sessions: Arc<[SessionRecord]>,
    pub dimensions: Arc<DimensionRegistries>,
}

impl Snapshot {
    pub fn new(sessions: Vec<SessionRecord>, dimensions: DimensionRegistries) -> Self {
        Self {
            sessions: sessions.into(),
            dimensions: Arc::new(dimensions),
        }
    }

    pub fn enriched(&self) -> impl Iterator<Item = EnrichedRecord<'_>> + '_ {
        enrich(&self.sessions, &self.dimensions)
    }
}

/// What to compute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Conversion {
        group_by: Vec<GroupKey>,
        order: RowOrder,
    },
    EngagementImpact,
    PageTypePerformance,
    PageTypeBreakdown,
    ExecutiveSummary,
    Cohort(CohortView),
}

impl MetricKind {
    pub fn preset(preset: Preset) -> Self {
        MetricKind::Conversion {
            group_by: preset.group_by(),
            order: preset.order(),
        }
    }
}

/// A metric kind plus the caller's flattened filter. Hashable so it can key
/// a result cache directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricRequest {
    pub kind: MetricKind,
    pub filter: FilterConfig,
}

impl MetricRequest {
    pub fn new(kind: MetricKind, filter: FilterConfig) -> Self {
        Self { kind, filter }
    }

    pub fn cohort(view: CohortView) -> Self {
        Self {
            kind: MetricKind::Cohort(view),
            filter: FilterConfig::default(),
        }
    }

    /// Filter to push down to the source. Cohorts always read everything.
    pub fn source_filter(&self) -> FilterConfig {
        match self.kind {
            MetricKind::Cohort(_) => FilterConfig::default(),
            _ => self.filter.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        self.filter.validate()?;
        if matches!(self.kind, MetricKind::Cohort(_)) && !self.filter.is_unfiltered() {
            return Err(CoreError::invalid_filter(
                "filter",
                "cohort views do not accept filters",
            ));
        }
        if let MetricKind::Conversion { group_by, .. } = &self.kind {
            for (i, key) in group_by.iter().enumerate() {
                if group_by[..i].contains(key) {
                    return Err(CoreError::invalid_filter(
                        "group_by",
                        format!("duplicate group key: {key}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricOutput {
    Conversion(Vec<ConversionRow>),
    Engagement(Vec<EngagementRow>),
    PageTypePerformance(Vec<PageTypePerformanceRow>),
    PageTypeBreakdown(Vec<PageTypeBreakdownRow>),
    Summary(SummaryRow),
}

impl MetricOutput {
    pub fn row_count(&self) -> usize {
        match self {
            MetricOutput::Conversion(rows) => rows.len(),
            MetricOutput::Engagement(rows) => rows.len(),
            MetricOutput::PageTypePerformance(rows) => rows.len(),
            MetricOutput::PageTypeBreakdown(rows) => rows.len(),
            MetricOutput::Summary(_) => 1,
        }
    }

    /// Rows as a JSON array; the summary becomes a one-element array.
    pub fn to_rows_json(&self) -> Result<serde_json::Value, CoreError> {
        let value = match self {
            MetricOutput::Summary(row) => serde_json::to_value([row])?,
            other => serde_json::to_value(other)?,
        };
        Ok(value)
    }
}

/// Evaluate `request` against an in-memory snapshot.
///
/// Validation runs first, so a malformed filter never reaches the reducers.
pub fn evaluate(snapshot: &Snapshot, request: &MetricRequest) -> Result<MetricOutput, CoreError> {
    request.validate()?;

    if let MetricKind::Cohort(view) = request.kind {
        return Ok(view.evaluate(snapshot));
    }

    let filter = &request.filter;
    let records: Vec<EnrichedRecord<'_>> =
        snapshot.enriched().filter(|r| filter.matches(r)).collect();

    let output = match &request.kind {
        MetricKind::Conversion { group_by, order } => {
            MetricOutput::Conversion(conversion_by(&records, group_by, *order))
        }
        MetricKind::EngagementImpact => MetricOutput::Engagement(engagement_impact(&records)),
        MetricKind::PageTypePerformance => {
            MetricOutput::PageTypePerformance(page_type_performance(&records))
        }
        MetricKind::PageTypeBreakdown => {
            MetricOutput::PageTypeBreakdown(page_type_breakdown(&records, filter))
        }
        MetricKind::ExecutiveSummary => MetricOutput::Summary(executive_summary(&records)),
        MetricKind::Cohort(view) => view.evaluate(snapshot),
    };
    Ok(output)
}

/// Fetch a snapshot from `source` and evaluate `request` against it.
///
/// The filter is validated before any I/O. Source failures surface as
/// [`CoreError::SourceUnavailable`] and are never turned into empty results.
pub async fn run(
    source: &dyn SessionSource,
    request: &MetricRequest,
) -> Result<MetricOutput, CoreError> {
    request.validate()?;
    let snapshot = source
        .snapshot(&request.source_filter())
        .await
        .map_err(CoreError::SourceUnavailable)?;
    let output = evaluate(&snapshot, request)?;
    tracing::debug!(
        kind = ?request.kind,
        sessions = snapshot.sessions.len(),
        rows = output.row_count(),
        "Metric evaluated"
    );
    Ok(output)
}
