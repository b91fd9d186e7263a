//! Dimension registries: small integer codes mapped to display names.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four categorical attributes that resolve through a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Browser,
    OperatingSystem,
    Region,
    Traffic,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Browser,
        Dimension::OperatingSystem,
        Dimension::Region,
        Dimension::Traffic,
    ];

    /// Prefix used for the synthetic label of an unresolved code.
    pub fn display_prefix(self) -> &'static str {
        match self {
            Dimension::Browser => "Browser",
            Dimension::OperatingSystem => "OS",
            Dimension::Region => "Region",
            Dimension::Traffic => "Traffic",
        }
    }

    /// Backing lookup table name.
    pub fn table_name(self) -> &'static str {
        match self {
            Dimension::Browser => "dim_browser",
            Dimension::OperatingSystem => "dim_os",
            Dimension::Region => "dim_region",
            Dimension::Traffic => "dim_traffic",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Browser => "browser",
            Dimension::OperatingSystem => "os",
            Dimension::Region => "region",
            Dimension::Traffic => "traffic",
        }
    }

    /// Label for a code with no registry entry, e.g. `"Browser 99"`.
    pub fn fallback_label(self, code: Option<u16>) -> String {
        match code {
            Some(code) => format!("{} {}", self.display_prefix(), code),
            None => format!("{} unknown", self.display_prefix()),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "browser" | "browsers" => Ok(Dimension::Browser),
            "os" | "operating_system" | "operatingsystems" => Ok(Dimension::OperatingSystem),
            "region" | "regions" => Ok(Dimension::Region),
            "traffic" | "traffic_type" | "traffictype" => Ok(Dimension::Traffic),
            _ => Err(format!("unknown dimension: {raw}")),
        }
    }
}

/// A `(code, display_name)` pair from one lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionEntry {
    pub code: u16,
    pub name: String,
}

/// Code → name lookup for a single dimension. Codes are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionRegistry {
    names: BTreeMap<u16, String>,
}

impl DimensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the name for `code`.
    pub fn insert(&mut self, code: u16, name: impl Into<String>) -> Option<String> {
        self.names.insert(code, name.into())
    }

    pub fn name(&self, code: u16) -> Option<&str> {
        self.names.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The four registries a snapshot is enriched against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRegistries {
    pub browser: DimensionRegistry,
    pub os: DimensionRegistry,
    pub region: DimensionRegistry,
    pub traffic: DimensionRegistry,
}

impl DimensionRegistries {
    pub fn get(&self, dimension: Dimension) -> &DimensionRegistry {
        match dimension {
            Dimension::Browser => &self.browser,
            Dimension::OperatingSystem => &self.os,
            Dimension::Region => &self.region,
            Dimension::Traffic => &self.traffic,
        }
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut DimensionRegistry {
        match dimension {
            Dimension::Browser => &mut self.browser,
            Dimension::OperatingSystem => &mut self.os,
            Dimension::Region => &mut self.region,
            Dimension::Traffic => &mut self.traffic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_label_uses_prefix_and_code() {
        assert_eq!(Dimension::Browser.fallback_label(Some(99)), "Browser 99");
        assert_eq!(Dimension::OperatingSystem.fallback_label(Some(4)), "OS 4");
        assert_eq!(Dimension::Traffic.fallback_label(None), "Traffic unknown");
    }

    #[test]
    fn registry_insert_replaces_name() {
        let mut registry = DimensionRegistry::new();
        assert_eq!(registry.insert(1, "Chrome"), None);
        assert_eq!(registry.insert(1, "Google Chrome"), Some("Chrome".to_string()));
        assert_eq!(registry.name(1), Some("Google Chrome"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dimension_parses_column_aliases() {
        assert_eq!("operatingsystems".parse::<Dimension>(), Ok(Dimension::OperatingSystem));
        assert_eq!("Traffic".parse::<Dimension>(), Ok(Dimension::Traffic));
        assert!("device".parse::<Dimension>().is_err());
    }
}
