use async_trait::async_trait;

use shopintent_core::aggregate::{GroupKey, RowOrder};
use shopintent_core::dimension::{Dimension, DimensionRegistries};
use shopintent_core::engine::{run, MetricKind, MetricOutput, MetricRequest, Snapshot};
use shopintent_core::error::CoreError;
use shopintent_core::filter::FilterConfig;
use shopintent_core::preset::Preset;
use shopintent_core::session::{Month, SessionRecord, RETURNING_VISITOR};
use shopintent_core::source::{FilterOptions, InMemorySource, SessionSource};

fn session(id: i64, traffic: u16, revenue: bool) -> SessionRecord {
    SessionRecord {
        session_id: id,
        administrative: 0,
        administrative_duration: 0.0,
        informational: 0,
        informational_duration: 0.0,
        product_related: 2,
        product_related_duration: 40.0,
        bounce_rate: 0.0,
        exit_rate: 0.1,
        page_value: 0.0,
        special_day: 0.0,
        month: Some(Month::Dec),
        operating_system: Some(1),
        browser: Some(1),
        region: Some(1),
        traffic_type: Some(traffic),
        visitor_type: Some(RETURNING_VISITOR.to_string()),
        weekend: false,
        revenue,
    }
}

#[tokio::test]
async fn traffic_preset_orders_by_rate() {
    let mut registries = DimensionRegistries::default();
    registries.traffic.insert(1, "Direct");
    registries.traffic.insert(2, "Search");
    let source = InMemorySource::new(
        vec![
            session(1, 1, false),
            session(2, 1, true),
            session(3, 2, true),
            session(4, 1, false),
        ],
        registries,
    );

    let output = run(
        &source,
        &MetricRequest::new(MetricKind::preset(Preset::Traffic), FilterConfig::default()),
    )
    .await
    .expect("run");
    let MetricOutput::Conversion(rows) = output else {
        panic!("expected conversion rows");
    };
    let names: Vec<_> = rows
        .iter()
        .filter_map(|r| r.key(GroupKey::TrafficName).and_then(|v| v.as_str()))
        .collect();
    assert_eq!(names, ["Search", "Direct"]);
}

#[tokio::test]
async fn rename_through_source_changes_next_result() {
    let source = InMemorySource::new(vec![session(1, 3, true)], DimensionRegistries::default());
    let request = MetricRequest::new(
        MetricKind::Conversion {
            group_by: vec![GroupKey::TrafficName],
            order: RowOrder::Keys,
        },
        FilterConfig::default(),
    );

    let before = run(&source, &request).await.expect("before");
    source
        .rename_dimension(Dimension::Traffic, 3, "Referral")
        .await
        .expect("rename");
    let after = run(&source, &request).await.expect("after");

    let label = |output: &MetricOutput| match output {
        MetricOutput::Conversion(rows) => rows[0]
            .key(GroupKey::TrafficName)
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => None,
    };
    assert_eq!(label(&before).as_deref(), Some("Traffic 3"));
    assert_eq!(label(&after).as_deref(), Some("Referral"));
}

struct BrokenSource;

#[async_trait]
impl SessionSource for BrokenSource {
    async fn snapshot(&self, _filter: &FilterConfig) -> anyhow::Result<Snapshot> {
        anyhow::bail!("disk I/O error")
    }

    async fn dimensions(&self) -> anyhow::Result<DimensionRegistries> {
        anyhow::bail!("disk I/O error")
    }

    async fn filter_options(&self) -> anyhow::Result<FilterOptions> {
        anyhow::bail!("disk I/O error")
    }

    async fn rename_dimension(
        &self,
        _dimension: Dimension,
        _code: u16,
        _name: &str,
    ) -> anyhow::Result<Option<String>> {
        anyhow::bail!("disk I/O error")
    }

    fn generation(&self) -> u64 {
        0
    }
}

#[tokio::test]
async fn source_failure_is_retryable_not_empty() {
    let err = run(
        &BrokenSource,
        &MetricRequest::new(MetricKind::ExecutiveSummary, FilterConfig::default()),
    )
    .await
    .expect_err("source failure");
    assert!(matches!(err, CoreError::SourceUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn invalid_filter_fails_before_fetch() {
    let filter = FilterConfig {
        browsers: Some([0].into_iter().collect()),
        ..Default::default()
    };
    let err = run(
        &BrokenSource,
        &MetricRequest::new(MetricKind::ExecutiveSummary, filter),
    )
    .await
    .expect_err("validation");
    assert!(matches!(err, CoreError::InvalidFilter { field: "browsers", .. }));
    assert!(!err.is_retryable());
}
