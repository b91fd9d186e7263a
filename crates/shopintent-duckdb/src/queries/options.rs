use std::collections::BTreeSet;

use anyhow::Result;

use shopintent_core::dimension::{Dimension, DimensionEntry};
use shopintent_core::session::{Month, PageType};
use shopintent_core::source::FilterOptions;

use crate::queries::dimensions::load_dimensions_inner;
use crate::DuckDbBackend;

/// Distinct values of every filterable column, named through the `dim_*`
/// tables.
pub async fn filter_options_inner(db: &DuckDbBackend) -> Result<FilterOptions> {
    let conn = db.conn.lock().await;
    let registries = load_dimensions_inner(&conn)?;

    let months: BTreeSet<Month> = distinct_strings(&conn, "month")?
        .iter()
        .filter_map(|raw| raw.parse().ok())
        .collect();
    let visitor_types = distinct_strings(&conn, "visitortype")?;

    let mut stmt = conn.prepare("SELECT DISTINCT weekend FROM shopper_data ORDER BY 1")?;
    let weekend = stmt
        .query_map([], |row| row.get::<_, bool>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let named = |dimension: Dimension, column: &str| -> Result<Vec<DimensionEntry>> {
        let registry = registries.get(dimension);
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {column} FROM shopper_data WHERE {column} IS NOT NULL ORDER BY 1"
        ))?;
        let codes = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(codes
            .into_iter()
            .filter_map(|raw| u16::try_from(raw).ok())
            .map(|code| DimensionEntry {
                code,
                name: registry
                    .name(code)
                    .map(str::to_string)
                    .unwrap_or_else(|| dimension.fallback_label(Some(code))),
            })
            .collect())
    };

    Ok(FilterOptions {
        months: months.into_iter().collect(),
        visitor_types,
        weekend,
        browsers: named(Dimension::Browser, "browser")?,
        operating_systems: named(Dimension::OperatingSystem, "operatingsystems")?,
        regions: named(Dimension::Region, "region")?,
        traffic_types: named(Dimension::Traffic, "traffictype")?,
        page_types: PageType::ALL.to_vec(),
    })
}

fn distinct_strings(conn: &duckdb::Connection, column: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT {column} FROM shopper_data WHERE {column} IS NOT NULL ORDER BY 1"
    ))?;
    let values = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

impl DuckDbBackend {
    pub async fn filter_options(&self) -> Result<FilterOptions> {
        filter_options_inner(self).await
    }
}
