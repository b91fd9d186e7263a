use anyhow::Result;
use duckdb::types::ToSql;
use duckdb::Connection;

use shopintent_core::filter::FilterConfig;
use shopintent_core::session::{Month, PageType, SessionRecord};

use crate::DuckDbBackend;

const SESSION_COLUMNS: &str = "session_id, \
    administrative, administrative_duration, \
    informational, informational_duration, \
    productrelated, productrelated_duration, \
    bouncerates, exitrates, pagevalues, specialday, \
    month, operatingsystems, browser, region, traffictype, \
    visitortype, weekend, revenue";

/// Translate a filter into a `WHERE` suffix plus its positional parameters.
///
/// An explicit empty set becomes `AND FALSE`. Months are compared
/// case-insensitively against every stored spelling. A page-type clause
/// naming every type adds nothing.
pub fn filter_clause(filter: &FilterConfig) -> (String, Vec<Box<dyn ToSql>>) {
    let mut filter_sql = String::new();
    let mut filter_params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(months) = &filter.months {
        let spellings = months
            .iter()
            .flat_map(|m: &Month| m.spellings())
            .map(|s| Box::new(s.to_ascii_lowercase()) as Box<dyn ToSql>)
            .collect();
        push_in(&mut filter_sql, &mut filter_params, "lower(trim(month))", spellings);
    }
    if let Some(types) = &filter.visitor_types {
        let values = types
            .iter()
            .map(|t| Box::new(t.clone()) as Box<dyn ToSql>)
            .collect();
        push_in(&mut filter_sql, &mut filter_params, "visitortype", values);
    }
    if let Some(weekend) = filter.weekend {
        filter_params.push(Box::new(weekend));
        filter_sql.push_str(&format!(" AND weekend = ?{}", filter_params.len()));
    }

    let code_clauses = [
        ("browser", &filter.browsers),
        ("operatingsystems", &filter.operating_systems),
        ("region", &filter.regions),
        ("traffictype", &filter.traffic_types),
    ];
    for (column, clause) in code_clauses {
        if let Some(codes) = clause {
            let values = codes
                .iter()
                .map(|&c| Box::new(i64::from(c)) as Box<dyn ToSql>)
                .collect();
            push_in(&mut filter_sql, &mut filter_params, column, values);
        }
    }

    if let Some(types) = filter.page_type_clause() {
        if types.is_empty() {
            filter_sql.push_str(" AND FALSE");
        } else {
            let any_viewed: Vec<String> = types
                .iter()
                .map(|t| format!("{} > 0", page_count_column(*t)))
                .collect();
            filter_sql.push_str(&format!(" AND ({})", any_viewed.join(" OR ")));
        }
    }

    (filter_sql, filter_params)
}

fn push_in(
    filter_sql: &mut String,
    filter_params: &mut Vec<Box<dyn ToSql>>,
    column: &str,
    values: Vec<Box<dyn ToSql>>,
) {
    if values.is_empty() {
        filter_sql.push_str(" AND FALSE");
        return;
    }
    let start = filter_params.len() + 1;
    let placeholders: Vec<String> = (start..start + values.len())
        .map(|idx| format!("?{idx}"))
        .collect();
    filter_sql.push_str(&format!(" AND {column} IN ({})", placeholders.join(", ")));
    filter_params.extend(values);
}

fn page_count_column(page_type: PageType) -> &'static str {
    match page_type {
        PageType::Administrative => "administrative",
        PageType::Informational => "informational",
        PageType::ProductRelated => "productrelated",
    }
}

/// Load every session matching `filter`, ordered by `session_id`.
pub fn load_sessions_inner(
    conn: &Connection,
    filter: &FilterConfig,
) -> Result<Vec<SessionRecord>> {
    let (filter_sql, filter_params) = filter_clause(filter);
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM shopper_data WHERE TRUE{filter_sql} ORDER BY session_id"
    );

    let param_refs: Vec<&dyn ToSql> = filter_params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok(RawSession {
            session_id: row.get(0)?,
            administrative: row.get(1)?,
            administrative_duration: row.get(2)?,
            informational: row.get(3)?,
            informational_duration: row.get(4)?,
            product_related: row.get(5)?,
            product_related_duration: row.get(6)?,
            bounce_rate: row.get(7)?,
            exit_rate: row.get(8)?,
            page_value: row.get(9)?,
            special_day: row.get(10)?,
            month: row.get(11)?,
            operating_system: row.get(12)?,
            browser: row.get(13)?,
            region: row.get(14)?,
            traffic_type: row.get(15)?,
            visitor_type: row.get(16)?,
            weekend: row.get(17)?,
            revenue: row.get(18)?,
        })
    })?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row?.into_record());
    }
    Ok(sessions)
}

impl DuckDbBackend {
    pub async fn load_sessions(&self, filter: &FilterConfig) -> Result<Vec<SessionRecord>> {
        let conn = self.conn.lock().await;
        load_sessions_inner(&conn, filter)
    }
}

/// A `shopper_data` row as stored, before values are narrowed to their
/// domain types.
struct RawSession {
    session_id: i64,
    administrative: i64,
    administrative_duration: f64,
    informational: i64,
    informational_duration: f64,
    product_related: i64,
    product_related_duration: f64,
    bounce_rate: f64,
    exit_rate: f64,
    page_value: f64,
    special_day: f64,
    month: Option<String>,
    operating_system: Option<i64>,
    browser: Option<i64>,
    region: Option<i64>,
    traffic_type: Option<i64>,
    visitor_type: Option<String>,
    weekend: bool,
    revenue: bool,
}

impl RawSession {
    fn into_record(self) -> SessionRecord {
        let id = self.session_id;
        SessionRecord {
            session_id: id,
            administrative: page_count(id, self.administrative),
            administrative_duration: self.administrative_duration,
            informational: page_count(id, self.informational),
            informational_duration: self.informational_duration,
            product_related: page_count(id, self.product_related),
            product_related_duration: self.product_related_duration,
            bounce_rate: self.bounce_rate,
            exit_rate: self.exit_rate,
            page_value: self.page_value,
            special_day: self.special_day,
            month: self.month.as_deref().and_then(|raw| match raw.parse() {
                Ok(month) => Some(month),
                Err(_) => {
                    tracing::warn!(session_id = id, month = raw, "Unrecognised month");
                    None
                }
            }),
            operating_system: code(id, "operatingsystems", self.operating_system),
            browser: code(id, "browser", self.browser),
            region: code(id, "region", self.region),
            traffic_type: code(id, "traffictype", self.traffic_type),
            visitor_type: self.visitor_type,
            weekend: self.weekend,
            revenue: self.revenue,
        }
    }
}

fn page_count(session_id: i64, raw: i64) -> u32 {
    u32::try_from(raw).unwrap_or_else(|_| {
        tracing::warn!(session_id, value = raw, "Page count out of range, using 0");
        0
    })
}

fn code(session_id: i64, column: &'static str, raw: Option<i64>) -> Option<u16> {
    let raw = raw?;
    match u16::try_from(raw) {
        Ok(code) => Some(code),
        Err(_) => {
            tracing::warn!(session_id, column, value = raw, "Dimension code out of range");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn unfiltered_config_adds_nothing() {
        let (sql, params) = filter_clause(&FilterConfig::default());
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn empty_set_becomes_false() {
        let filter = FilterConfig {
            browsers: Some(BTreeSet::new()),
            ..Default::default()
        };
        let (sql, params) = filter_clause(&filter);
        assert_eq!(sql, " AND FALSE");
        assert!(params.is_empty());
    }

    #[test]
    fn placeholders_number_across_clauses() {
        let filter = FilterConfig {
            months: Some([Month::Jun].into_iter().collect()),
            weekend: Some(true),
            regions: Some([1, 3].into_iter().collect()),
            page_types: Some(
                [PageType::Administrative, PageType::ProductRelated]
                    .into_iter()
                    .collect(),
            ),
            ..Default::default()
        };
        let (sql, params) = filter_clause(&filter);
        assert_eq!(
            sql,
            " AND lower(trim(month)) IN (?1, ?2) AND weekend = ?3 AND region IN (?4, ?5) \
             AND (administrative > 0 OR productrelated > 0)"
        );
        assert_eq!(params.len(), 5);
    }
}
