use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Visitor-type label for first-time visitors, as stored in the fact table.
pub const NEW_VISITOR: &str = "New_Visitor";
/// Visitor-type label for returning visitors.
pub const RETURNING_VISITOR: &str = "Returning_Visitor";

/// One visitor session, stored as a row of the `shopper_data` fact table.
///
/// Counts and durations are split by page category. Dimension codes are
/// `None` when the stored value is NULL or outside the `u16` range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: i64,
    pub administrative: u32,
    pub administrative_duration: f64,
    pub informational: u32,
    pub informational_duration: f64,
    pub product_related: u32,
    pub product_related_duration: f64,
    pub bounce_rate: f64,
    pub exit_rate: f64,
    pub page_value: f64,
    pub special_day: f64,
    pub month: Option<Month>,
    pub browser: Option<u16>,
    pub operating_system: Option<u16>,
    pub region: Option<u16>,
    pub traffic_type: Option<u16>,
    pub visitor_type: Option<String>,
    pub weekend: bool,
    pub revenue: bool,
}

impl SessionRecord {
    /// Page views of one category in this session.
    pub fn page_count(&self, page_type: PageType) -> u32 {
        match page_type {
            PageType::Administrative => self.administrative,
            PageType::Informational => self.informational,
            PageType::ProductRelated => self.product_related,
        }
    }

    /// Seconds spent on one page category in this session.
    pub fn page_duration(&self, page_type: PageType) -> f64 {
        match page_type {
            PageType::Administrative => self.administrative_duration,
            PageType::Informational => self.informational_duration,
            PageType::ProductRelated => self.product_related_duration,
        }
    }

    /// `"Weekend"` or `"Weekday"`.
    pub fn weekend_label(&self) -> &'static str {
        if self.weekend {
            "Weekend"
        } else {
            "Weekday"
        }
    }
}

/// The three page categories tracked per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PageType {
    Administrative,
    Informational,
    ProductRelated,
}

impl PageType {
    pub const ALL: [PageType; 3] = [
        PageType::Administrative,
        PageType::Informational,
        PageType::ProductRelated,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PageType::Administrative => "Administrative",
            PageType::Informational => "Informational",
            PageType::ProductRelated => "Product Related",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for PageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for PageType {
    type Err = String;

    /// Accepts the display label as well as snake_case and compact forms
    /// (`"Product Related"`, `"product_related"`, `"productrelated"`).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "administrative" | "admin" => Ok(PageType::Administrative),
            "informational" | "info" => Ok(PageType::Informational),
            "productrelated" | "product" => Ok(PageType::ProductRelated),
            _ => Err(format!("unknown page type: {raw}")),
        }
    }
}

/// Calendar month of a session.
///
/// Ordering is calendar order, so grouping by month yields January first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    pub fn abbreviation(self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }

    /// Every spelling of this month that may appear in storage.
    pub fn spellings(self) -> &'static [&'static str] {
        match self {
            Month::Jan => &["Jan", "January"],
            Month::Feb => &["Feb", "February"],
            Month::Mar => &["Mar", "March"],
            Month::Apr => &["Apr", "April"],
            Month::May => &["May"],
            Month::Jun => &["Jun", "June"],
            Month::Jul => &["Jul", "July"],
            Month::Aug => &["Aug", "August"],
            Month::Sep => &["Sep", "Sept", "September"],
            Month::Oct => &["Oct", "October"],
            Month::Nov => &["Nov", "November"],
            Month::Dec => &["Dec", "December"],
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.abbreviation())
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Month::ALL
            .into_iter()
            .find(|month| {
                month
                    .spellings()
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(trimmed))
            })
            .ok_or_else(|| format!("unknown month: {raw}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_parses_storage_spellings() {
        assert_eq!("June".parse::<Month>(), Ok(Month::Jun));
        assert_eq!("jun".parse::<Month>(), Ok(Month::Jun));
        assert_eq!(" Sept ".parse::<Month>(), Ok(Month::Sep));
        assert_eq!("Mar".parse::<Month>(), Ok(Month::Mar));
        assert!("Smarch".parse::<Month>().is_err());
    }

    #[test]
    fn months_order_by_calendar() {
        let mut months = vec![Month::Nov, Month::Feb, Month::Jun];
        months.sort();
        assert_eq!(months, vec![Month::Feb, Month::Jun, Month::Nov]);
    }

    #[test]
    fn page_type_accepts_label_and_snake_case() {
        assert_eq!(
            "Product Related".parse::<PageType>(),
            Ok(PageType::ProductRelated)
        );
        assert_eq!(
            "product_related".parse::<PageType>(),
            Ok(PageType::ProductRelated)
        );
        assert_eq!("admin".parse::<PageType>(), Ok(PageType::Administrative));
        assert!("checkout".parse::<PageType>().is_err());
    }
}
