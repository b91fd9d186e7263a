//! Named conversion metrics backing the dashboard charts.
//!
//! Unlike cohort views, presets accept a caller filter; they only fix the
//! group keys and row order.

use std::str::FromStr;

use crate::aggregate::{GroupKey, RowOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    WeekdayVsWeekend,
    Monthwise,
    Browser,
    Traffic,
    Region,
    Os,
    SpecialDay,
    VisitorWeekend,
}

impl Preset {
    pub const ALL: [Preset; 8] = [
        Preset::WeekdayVsWeekend,
        Preset::Monthwise,
        Preset::Browser,
        Preset::Traffic,
        Preset::Region,
        Preset::Os,
        Preset::SpecialDay,
        Preset::VisitorWeekend,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::WeekdayVsWeekend => "weekday_vs_weekend",
            Preset::Monthwise => "monthwise",
            Preset::Browser => "browser",
            Preset::Traffic => "traffic",
            Preset::Region => "region",
            Preset::Os => "os",
            Preset::SpecialDay => "special_day",
            Preset::VisitorWeekend => "visitor_weekend",
        }
    }

    pub fn group_by(self) -> Vec<GroupKey> {
        match self {
            Preset::WeekdayVsWeekend => vec![GroupKey::Weekend],
            Preset::Monthwise => vec![GroupKey::Month],
            Preset::Browser => vec![GroupKey::BrowserName],
            Preset::Traffic => vec![GroupKey::TrafficName],
            Preset::Region => vec![GroupKey::RegionName],
            Preset::Os => vec![GroupKey::OsName],
            Preset::SpecialDay => vec![GroupKey::SpecialDay],
            Preset::VisitorWeekend => vec![GroupKey::VisitorType, GroupKey::Weekend],
        }
    }

    pub fn order(self) -> RowOrder {
        match self {
            Preset::Browser | Preset::Os => RowOrder::Sessions,
            Preset::Traffic => RowOrder::Rate,
            Preset::Region => RowOrder::Conversions,
            Preset::WeekdayVsWeekend
            | Preset::Monthwise
            | Preset::SpecialDay
            | Preset::VisitorWeekend => RowOrder::Keys,
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == raw)
            .ok_or_else(|| format!("unknown preset: {raw}"))
    }
}
