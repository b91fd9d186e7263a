//! Aggregation engine.
//!
//! Every reducer takes an already-filtered slice of [`EnrichedRecord`]s and
//! returns plain rows. None of them can fail: an empty group or a zero
//! denominator produces [`Rate::Undefined`] rather than an error.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::dimension::Dimension;
use crate::enrich::EnrichedRecord;
use crate::filter::FilterConfig;
use crate::session::{Month, PageType};

// ------------------------------------------------------------------
// Rates
// ------------------------------------------------------------------

/// A percentage that is undefined when its denominator is zero.
///
/// Serializes as a JSON number, or `null` when undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    Value(f64),
    Undefined,
}

impl Rate {
    /// `round(100 * numerator / denominator, 2)`, or undefined for a zero
    /// denominator.
    /// Exact halves round up: `201 / 20000` is `1.01`.
    pub fn percentage(numerator: u64, denominator: u64) -> Rate {
        if denominator == 0 {
            return Rate::Undefined;
        }
        let (n, d) = (u128::from(numerator), u128::from(denominator));
        let hundredths = (20_000 * n + d) / (2 * d);
        Rate::Value(hundredths as f64 / 100.0)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Rate::Value(v) => Some(v),
            Rate::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Rate::Value(_))
    }

    /// Descending order with undefined rates last.
    fn cmp_desc(self, other: Rate) -> Ordering {
        match (self, other) {
            (Rate::Value(a), Rate::Value(b)) => b.total_cmp(&a),
            (Rate::Value(_), Rate::Undefined) => Ordering::Less,
            (Rate::Undefined, Rate::Value(_)) => Ordering::Greater,
            (Rate::Undefined, Rate::Undefined) => Ordering::Equal,
        }
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rate::Value(v) => serializer.serialize_f64(*v),
            Rate::Undefined => serializer.serialize_none(),
        }
    }
}

fn mean(sum: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

// ------------------------------------------------------------------
// Group keys
// ------------------------------------------------------------------

/// An attribute a conversion metric can be grouped by.
///
/// Serialized names match the fact-table and view column names the
/// dashboard renders (`visitortype`, `browser_name`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "visitortype")]
    VisitorType,
    #[serde(rename = "weekend")]
    Weekend,
    #[serde(rename = "weekend_label")]
    WeekendLabel,
    #[serde(rename = "specialday")]
    SpecialDay,
    #[serde(rename = "revenue")]
    Revenue,
    #[serde(rename = "browser")]
    Browser,
    #[serde(rename = "browser_name")]
    BrowserName,
    #[serde(rename = "operatingsystems")]
    OperatingSystem,
    #[serde(rename = "os_name")]
    OsName,
    #[serde(rename = "region")]
    Region,
    #[serde(rename = "region_name")]
    RegionName,
    #[serde(rename = "traffictype")]
    TrafficType,
    #[serde(rename = "traffic_name")]
    TrafficName,
}

impl GroupKey {
    pub const ALL: [GroupKey; 14] = [
        GroupKey::Month,
        GroupKey::VisitorType,
        GroupKey::Weekend,
        GroupKey::WeekendLabel,
        GroupKey::SpecialDay,
        GroupKey::Revenue,
        GroupKey::Browser,
        GroupKey::BrowserName,
        GroupKey::OperatingSystem,
        GroupKey::OsName,
        GroupKey::Region,
        GroupKey::RegionName,
        GroupKey::TrafficType,
        GroupKey::TrafficName,
    ];

    pub fn column(self) -> &'static str {
        match self {
            GroupKey::Month => "month",
            GroupKey::VisitorType => "visitortype",
            GroupKey::Weekend => "weekend",
            GroupKey::WeekendLabel => "weekend_label",
            GroupKey::SpecialDay => "specialday",
            GroupKey::Revenue => "revenue",
            GroupKey::Browser => "browser",
            GroupKey::BrowserName => "browser_name",
            GroupKey::OperatingSystem => "operatingsystems",
            GroupKey::OsName => "os_name",
            GroupKey::Region => "region",
            GroupKey::RegionName => "region_name",
            GroupKey::TrafficType => "traffictype",
            GroupKey::TrafficName => "traffic_name",
        }
    }

    /// The resolved-name key for a dimension.
    pub fn name_of(dimension: Dimension) -> GroupKey {
        match dimension {
            Dimension::Browser => GroupKey::BrowserName,
            Dimension::OperatingSystem => GroupKey::OsName,
            Dimension::Region => GroupKey::RegionName,
            Dimension::Traffic => GroupKey::TrafficName,
        }
    }

    pub fn extract(self, record: &EnrichedRecord<'_>) -> GroupValue {
        let code = |c: Option<u16>| c.map_or(GroupValue::Null, |c| GroupValue::Int(i64::from(c)));
        match self {
            GroupKey::Month => record.month.map_or(GroupValue::Null, GroupValue::Month),
            GroupKey::VisitorType => record
                .visitor_type
                .clone()
                .map_or(GroupValue::Null, GroupValue::Text),
            GroupKey::Weekend => GroupValue::Bool(record.weekend),
            GroupKey::WeekendLabel => GroupValue::Text(record.weekend_label.to_string()),
            GroupKey::SpecialDay => GroupValue::Number(record.special_day),
            GroupKey::Revenue => GroupValue::Bool(record.revenue),
            GroupKey::Browser => code(record.browser),
            GroupKey::BrowserName => GroupValue::Text(record.browser_name.to_string()),
            GroupKey::OperatingSystem => code(record.operating_system),
            GroupKey::OsName => GroupValue::Text(record.os_name.to_string()),
            GroupKey::Region => code(record.region),
            GroupKey::RegionName => GroupValue::Text(record.region_name.to_string()),
            GroupKey::TrafficType => code(record.traffic_type),
            GroupKey::TrafficName => GroupValue::Text(record.traffic_name.to_string()),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for GroupKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = raw.trim().to_ascii_lowercase();
        let alias = match key.as_str() {
            "visitor_type" => Some(GroupKey::VisitorType),
            "special_day" => Some(GroupKey::SpecialDay),
            "os" | "operating_system" => Some(GroupKey::OperatingSystem),
            "traffic_type" => Some(GroupKey::TrafficType),
            _ => None,
        };
        alias
            .or_else(|| GroupKey::ALL.into_iter().find(|k| k.column() == key))
            .ok_or_else(|| format!("unknown group key: {raw}"))
    }
}

/// One component of a group's key.
///
/// Values order naturally within a column (calendar months, `false` before
/// `true`, numbers ascending, text lexicographically) with nulls last.
#[derive(Debug, Clone)]
pub enum GroupValue {
    Bool(bool),
    Month(Month),
    Int(i64),
    Number(f64),
    Text(String),
    Null,
}

impl GroupValue {
    fn rank(&self) -> u8 {
        match self {
            GroupValue::Bool(_) => 0,
            GroupValue::Month(_) => 1,
            GroupValue::Int(_) => 2,
            GroupValue::Number(_) => 3,
            GroupValue::Text(_) => 4,
            GroupValue::Null => 5,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GroupValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Ord for GroupValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupValue::Bool(a), GroupValue::Bool(b)) => a.cmp(b),
            (GroupValue::Month(a), GroupValue::Month(b)) => a.cmp(b),
            (GroupValue::Int(a), GroupValue::Int(b)) => a.cmp(b),
            (GroupValue::Number(a), GroupValue::Number(b)) => a.total_cmp(b),
            (GroupValue::Text(a), GroupValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for GroupValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupValue {}

impl From<bool> for GroupValue {
    fn from(value: bool) -> Self {
        GroupValue::Bool(value)
    }
}

impl From<&str> for GroupValue {
    fn from(value: &str) -> Self {
        GroupValue::Text(value.to_string())
    }
}

impl From<Month> for GroupValue {
    fn from(value: Month) -> Self {
        GroupValue::Month(value)
    }
}

impl Serialize for GroupValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupValue::Bool(b) => serializer.serialize_bool(*b),
            GroupValue::Month(m) => m.serialize(serializer),
            GroupValue::Int(i) => serializer.serialize_i64(*i),
            GroupValue::Number(n) => serializer.serialize_f64(*n),
            GroupValue::Text(s) => serializer.serialize_str(s),
            GroupValue::Null => serializer.serialize_none(),
        }
    }
}

// ------------------------------------------------------------------
// Ordering
// ------------------------------------------------------------------

/// Row order of a conversion result. Every order ends with the group key
/// tuple ascending, so output is deterministic for any input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    #[default]
    Keys,
    Sessions,
    Conversions,
    /// Conversion rate descending, then total sessions descending.
    Rate,
    /// First key ascending, then conversion rate and sessions descending.
    RateWithinLeadingKey,
}

impl FromStr for RowOrder {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "keys" | "key" => Ok(RowOrder::Keys),
            "sessions" => Ok(RowOrder::Sessions),
            "conversions" => Ok(RowOrder::Conversions),
            "rate" | "conversion_rate" => Ok(RowOrder::Rate),
            "rate_within_leading_key" => Ok(RowOrder::RateWithinLeadingKey),
            _ => Err(format!(
                "order must be one of: keys, sessions, conversions, rate, rate_within_leading_key (got {raw})"
            )),
        }
    }
}

impl RowOrder {
    fn compare(self, a: &ConversionRow, b: &ConversionRow) -> Ordering {
        let by_keys = || a.key_values().cmp(b.key_values());
        let primary = match self {
            RowOrder::Keys => Ordering::Equal,
            RowOrder::Sessions => b.total_sessions.cmp(&a.total_sessions),
            RowOrder::Conversions => b.conversions.cmp(&a.conversions),
            RowOrder::Rate => a
                .conversion_rate
                .cmp_desc(b.conversion_rate)
                .then_with(|| b.total_sessions.cmp(&a.total_sessions)),
            RowOrder::RateWithinLeadingKey => a
                .key_values()
                .next()
                .cmp(&b.key_values().next())
                .then_with(|| a.conversion_rate.cmp_desc(b.conversion_rate))
                .then_with(|| b.total_sessions.cmp(&a.total_sessions)),
        };
        primary.then_with(by_keys)
    }
}

// ------------------------------------------------------------------
// Conversion metric
// ------------------------------------------------------------------

/// A grouped conversion statistic.
///
/// Serializes as a flat object: each group key under its column name,
/// followed by `total_sessions`, `conversions` and `conversion_rate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRow {
    pub keys: Vec<(GroupKey, GroupValue)>,
    pub total_sessions: u64,
    pub conversions: u64,
    pub conversion_rate: Rate,
}

impl ConversionRow {
    pub fn key(&self, key: GroupKey) -> Option<&GroupValue> {
        self.keys.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    fn key_values(&self) -> impl Iterator<Item = &GroupValue> {
        self.keys.iter().map(|(_, v)| v)
    }
}

impl Serialize for ConversionRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.keys.len() + 3))?;
        for (key, value) in &self.keys {
            map.serialize_entry(key.column(), value)?;
        }
        map.serialize_entry("total_sessions", &self.total_sessions)?;
        map.serialize_entry("conversions", &self.conversions)?;
        map.serialize_entry("conversion_rate", &self.conversion_rate)?;
        map.end()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    sessions: u64,
    conversions: u64,
}

/// Group `records` by `keys` and count sessions and conversions per group.
///
/// With no keys, all records form a single group (and an empty input yields
/// no rows).
pub fn conversion_by(
    records: &[EnrichedRecord<'_>],
    keys: &[GroupKey],
    order: RowOrder,
) -> Vec<ConversionRow> {
    let mut groups: BTreeMap<Vec<GroupValue>, Tally> = BTreeMap::new();
    for record in records {
        let group: Vec<GroupValue> = keys.iter().map(|k| k.extract(record)).collect();
        let tally = groups.entry(group).or_default();
        tally.sessions += 1;
        if record.revenue {
            tally.conversions += 1;
        }
    }

    let mut rows: Vec<ConversionRow> = groups
        .into_iter()
        .map(|(values, tally)| ConversionRow {
            keys: keys.iter().copied().zip(values).collect(),
            total_sessions: tally.sessions,
            conversions: tally.conversions,
            conversion_rate: Rate::percentage(tally.conversions, tally.sessions),
        })
        .collect();
    rows.sort_by(|a, b| order.compare(a, b));
    rows
}

// ------------------------------------------------------------------
// Executive summary
// ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub total_sessions: u64,
    pub total_conversions: u64,
    pub overall_conversion_rate: Rate,
}

/// Totals over all records. Always exactly one row, even for empty input.
pub fn executive_summary(records: &[EnrichedRecord<'_>]) -> SummaryRow {
    let total_sessions = records.len() as u64;
    let total_conversions = records.iter().filter(|r| r.revenue).count() as u64;
    SummaryRow {
        total_sessions,
        total_conversions,
        overall_conversion_rate: Rate::percentage(total_conversions, total_sessions),
    }
}

// ------------------------------------------------------------------
// Engagement metrics (grouped by revenue)
// ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementRow {
    pub revenue: bool,
    pub avg_bounce_rate: f64,
    pub avg_exit_rate: f64,
    pub avg_page_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageTypePerformanceRow {
    pub revenue: bool,
    pub avg_admin_pages: f64,
    pub avg_info_pages: f64,
    pub avg_product_pages: f64,
    pub avg_admin_duration: f64,
    pub avg_info_duration: f64,
    pub avg_product_duration: f64,
}

/// Long-form page-type averages: one row per revenue value and page type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageTypeAverages {
    pub revenue: bool,
    pub page_type: PageType,
    pub avg_pages: f64,
    pub avg_seconds: f64,
}

impl PageTypePerformanceRow {
    pub fn tidy(&self) -> [PageTypeAverages; 3] {
        let row = |page_type, avg_pages, avg_seconds| PageTypeAverages {
            revenue: self.revenue,
            page_type,
            avg_pages,
            avg_seconds,
        };
        [
            row(
                PageType::Administrative,
                self.avg_admin_pages,
                self.avg_admin_duration,
            ),
            row(
                PageType::Informational,
                self.avg_info_pages,
                self.avg_info_duration,
            ),
            row(
                PageType::ProductRelated,
                self.avg_product_pages,
                self.avg_product_duration,
            ),
        ]
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct EngagementSums {
    count: u64,
    bounce_rate: f64,
    exit_rate: f64,
    page_value: f64,
    pages: [f64; 3],
    durations: [f64; 3],
}

/// Accumulate per-revenue sums, converted sessions first. Only revenue
/// values present in `records` produce an entry.
fn sums_by_revenue(records: &[EnrichedRecord<'_>]) -> Vec<(bool, EngagementSums)> {
    let mut converted = EngagementSums::default();
    let mut not_converted = EngagementSums::default();
    for record in records {
        let sums = if record.revenue {
            &mut converted
        } else {
            &mut not_converted
        };
        sums.count += 1;
        sums.bounce_rate += record.bounce_rate;
        sums.exit_rate += record.exit_rate;
        sums.page_value += record.page_value;
        for (i, page_type) in PageType::ALL.into_iter().enumerate() {
            sums.pages[i] += f64::from(record.page_count(page_type));
            sums.durations[i] += record.page_duration(page_type);
        }
    }
    [(true, converted), (false, not_converted)]
        .into_iter()
        .filter(|(_, sums)| sums.count > 0)
        .collect()
}

/// Mean bounce rate, exit rate and page value for converted vs. not
/// converted sessions.
pub fn engagement_impact(records: &[EnrichedRecord<'_>]) -> Vec<EngagementRow> {
    sums_by_revenue(records)
        .into_iter()
        .map(|(revenue, s)| EngagementRow {
            revenue,
            avg_bounce_rate: mean(s.bounce_rate, s.count),
            avg_exit_rate: mean(s.exit_rate, s.count),
            avg_page_value: mean(s.page_value, s.count),
        })
        .collect()
}

/// Mean page views and durations per page category for converted vs. not
/// converted sessions.
pub fn page_type_performance(records: &[EnrichedRecord<'_>]) -> Vec<PageTypePerformanceRow> {
    sums_by_revenue(records)
        .into_iter()
        .map(|(revenue, s)| PageTypePerformanceRow {
            revenue,
            avg_admin_pages: mean(s.pages[0], s.count),
            avg_info_pages: mean(s.pages[1], s.count),
            avg_product_pages: mean(s.pages[2], s.count),
            avg_admin_duration: mean(s.durations[0], s.count),
            avg_info_duration: mean(s.durations[1], s.count),
            avg_product_duration: mean(s.durations[2], s.count),
        })
        .collect()
}

// ------------------------------------------------------------------
// Page-type breakdown (three-branch union)
// ------------------------------------------------------------------

/// Conversion statistics for one page category.
///
/// `total_sessions` is the number of page views of this category, not the
/// number of sessions: a session with three product pages contributes 3.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageTypeBreakdownRow {
    pub page_type: PageType,
    pub total_sessions: u64,
    pub conversions: u64,
    pub conversion_rate: Rate,
}

/// One row per page category, in the fixed order Administrative,
/// Informational, Product Related.
///
/// A branch whose category is excluded by a set page-type clause keeps its
/// row with zero totals and an undefined rate.
pub fn page_type_breakdown(
    records: &[EnrichedRecord<'_>],
    filter: &FilterConfig,
) -> Vec<PageTypeBreakdownRow> {
    PageType::ALL
        .into_iter()
        .map(|page_type| {
            let mut views = 0u64;
            let mut converted_views = 0u64;
            if filter.admits_page_type(page_type) {
                for record in records {
                    let count = u64::from(record.page_count(page_type));
                    views += count;
                    if record.revenue {
                        converted_views += count;
                    }
                }
            }
            PageTypeBreakdownRow {
                page_type,
                total_sessions: views,
                conversions: converted_views,
                conversion_rate: Rate::percentage(converted_views, views),
            }
        })
        .collect()
}
