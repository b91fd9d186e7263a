//! Canned cross-tabulations over the full denormalized session set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregate::{conversion_by, executive_summary, GroupKey, RowOrder};
use crate::dimension::Dimension;
use crate::enrich::EnrichedRecord;
use crate::engine::{MetricOutput, Snapshot};
use crate::filter::FilterConfig;
use crate::session::{NEW_VISITOR, RETURNING_VISITOR};

/// A fixed, parameter-less view. Cohort views never take caller filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortView {
    WeekdayVsWeekend,
    Leaderboard(Dimension),
    SpecialDay,
    MonthlyNewVsReturning,
    WeekdayByTraffic,
    BrowserOsMatrix,
    ExecutiveSummary,
}

/// Group keys, order and built-in restriction of a conversion cohort.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortDefinition {
    pub group_by: Vec<GroupKey>,
    pub order: RowOrder,
    pub restriction: FilterConfig,
}

impl CohortView {
    pub const ALL: [CohortView; 10] = [
        CohortView::WeekdayVsWeekend,
        CohortView::Leaderboard(Dimension::Browser),
        CohortView::Leaderboard(Dimension::OperatingSystem),
        CohortView::Leaderboard(Dimension::Region),
        CohortView::Leaderboard(Dimension::Traffic),
        CohortView::SpecialDay,
        CohortView::MonthlyNewVsReturning,
        CohortView::WeekdayByTraffic,
        CohortView::BrowserOsMatrix,
        CohortView::ExecutiveSummary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CohortView::WeekdayVsWeekend => "weekday_vs_weekend",
            CohortView::Leaderboard(Dimension::Browser) => "browser_leaderboard",
            CohortView::Leaderboard(Dimension::OperatingSystem) => "os_leaderboard",
            CohortView::Leaderboard(Dimension::Region) => "region_leaderboard",
            CohortView::Leaderboard(Dimension::Traffic) => "traffic_leaderboard",
            CohortView::SpecialDay => "special_day",
            CohortView::MonthlyNewVsReturning => "monthly_new_vs_returning",
            CohortView::WeekdayByTraffic => "weekday_by_traffic",
            CohortView::BrowserOsMatrix => "browser_os_matrix",
            CohortView::ExecutiveSummary => "executive_summary",
        }
    }

    /// `None` for the executive summary, which has no grouping.
    pub fn definition(self) -> Option<CohortDefinition> {
        let plain = |group_by: Vec<GroupKey>, order| CohortDefinition {
            group_by,
            order,
            restriction: FilterConfig::default(),
        };
        let definition = match self {
            CohortView::WeekdayVsWeekend => plain(vec![GroupKey::Weekend], RowOrder::Keys),
            CohortView::Leaderboard(dimension) => {
                let order = match dimension {
                    Dimension::Browser | Dimension::OperatingSystem => RowOrder::Sessions,
                    Dimension::Region => RowOrder::Conversions,
                    Dimension::Traffic => RowOrder::Rate,
                };
                plain(vec![GroupKey::name_of(dimension)], order)
            }
            CohortView::SpecialDay => plain(vec![GroupKey::SpecialDay], RowOrder::Keys),
            CohortView::MonthlyNewVsReturning => CohortDefinition {
                group_by: vec![GroupKey::Month, GroupKey::VisitorType],
                order: RowOrder::Keys,
                restriction: FilterConfig {
                    visitor_types: Some(
                        [NEW_VISITOR, RETURNING_VISITOR]
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                    ),
                    ..Default::default()
                },
            },
            CohortView::WeekdayByTraffic => plain(
                vec![GroupKey::WeekendLabel, GroupKey::TrafficName],
                RowOrder::RateWithinLeadingKey,
            ),
            CohortView::BrowserOsMatrix => plain(
                vec![GroupKey::BrowserName, GroupKey::OsName],
                RowOrder::Sessions,
            ),
            CohortView::ExecutiveSummary => return None,
        };
        Some(definition)
    }

    /// Evaluate over every session in `snapshot`.
    pub fn evaluate(self, snapshot: &Snapshot) -> MetricOutput {
        let records: Vec<EnrichedRecord<'_>> = snapshot.enriched().collect();
        match self.definition() {
            None => MetricOutput::Summary(executive_summary(&records)),
            Some(definition) => {
                let restricted: Vec<EnrichedRecord<'_>> = records
                    .into_iter()
                    .filter(|r| definition.restriction.matches(r))
                    .collect();
                MetricOutput::Conversion(conversion_by(
                    &restricted,
                    &definition.group_by,
                    definition.order,
                ))
            }
        }
    }
}

impl fmt::Display for CohortView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CohortView {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        CohortView::ALL
            .into_iter()
            .find(|view| view.name() == raw)
            .ok_or_else(|| format!("unknown cohort view: {raw}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{GroupValue, Rate};
    use crate::dimension::DimensionRegistries;
    use crate::session::Month;
    use crate::testing::session;

    fn snapshot_with_unknown_browser() -> Snapshot {
        let mut registries = DimensionRegistries::default();
        registries.browser.insert(1, "Chrome");

        let mut known = session(1);
        known.browser = Some(1);
        known.revenue = true;
        let mut known_too = session(2);
        known_too.browser = Some(1);
        let mut unknown = session(3);
        unknown.browser = Some(99);
        unknown.revenue = true;

        Snapshot::new(vec![known, known_too, unknown], registries)
    }

    #[test]
    fn every_view_round_trips_through_its_name() {
        for view in CohortView::ALL {
            assert_eq!(view.name().parse::<CohortView>(), Ok(view));
        }
    }

    #[test]
    fn browser_leaderboard_labels_unknown_codes() {
        let snapshot = snapshot_with_unknown_browser();
        let MetricOutput::Conversion(rows) =
            CohortView::Leaderboard(Dimension::Browser).evaluate(&snapshot)
        else {
            panic!("expected conversion rows");
        };

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].key(GroupKey::BrowserName),
            Some(&GroupValue::from("Chrome"))
        );
        assert_eq!(rows[0].total_sessions, 2);
        assert_eq!(
            rows[1].key(GroupKey::BrowserName),
            Some(&GroupValue::from("Browser 99"))
        );
        assert_eq!(rows[1].total_sessions, 1);
        assert_eq!(rows[1].conversion_rate, Rate::Value(100.0));
    }

    #[test]
    fn monthly_cohort_keeps_only_new_and_returning_visitors() {
        let mut new = session(1);
        new.month = Some(Month::Nov);
        new.visitor_type = Some(NEW_VISITOR.to_string());
        let mut returning = session(2);
        returning.month = Some(Month::Feb);
        returning.visitor_type = Some(RETURNING_VISITOR.to_string());
        let mut other = session(3);
        other.month = Some(Month::Feb);
        other.visitor_type = Some("Other".to_string());
        let snapshot = Snapshot::new(vec![new, returning, other], DimensionRegistries::default());

        let MetricOutput::Conversion(rows) = CohortView::MonthlyNewVsReturning.evaluate(&snapshot)
        else {
            panic!("expected conversion rows");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key(GroupKey::Month), Some(&GroupValue::from(Month::Feb)));
        assert_eq!(
            rows[0].key(GroupKey::VisitorType),
            Some(&GroupValue::from(RETURNING_VISITOR))
        );
        assert_eq!(rows[1].key(GroupKey::Month), Some(&GroupValue::from(Month::Nov)));
    }

    #[test]
    fn executive_summary_counts_everything() {
        let snapshot = snapshot_with_unknown_browser();
        let MetricOutput::Summary(summary) = CohortView::ExecutiveSummary.evaluate(&snapshot)
        else {
            panic!("expected summary");
        };
        assert_eq!(summary.total_sessions, 3);
        assert_eq!(summary.total_conversions, 2);
        assert_eq!(summary.overall_conversion_rate, Rate::Value(66.67));
    }
}
