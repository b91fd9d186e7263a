/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `SHOPINTENT_DUCKDB_MEMORY`, default `"1GB"`), which only admits
/// `<digits><unit>` strings.
///
/// Column names of `shopper_data` follow the cleaned clickstream export
/// (`productrelated`, `bouncerates`, `operatingsystems`, ...). Dimension
/// codes are plain integers with no foreign keys: a code without a
/// `dim_*` row is legal and gets a fallback label at query time.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- FACT TABLE: one row per visitor session
-- ===========================================
CREATE TABLE IF NOT EXISTS shopper_data (
    session_id               BIGINT PRIMARY KEY,
    administrative           INTEGER NOT NULL DEFAULT 0,
    administrative_duration  DOUBLE  NOT NULL DEFAULT 0,
    informational            INTEGER NOT NULL DEFAULT 0,
    informational_duration   DOUBLE  NOT NULL DEFAULT 0,
    productrelated           INTEGER NOT NULL DEFAULT 0,
    productrelated_duration  DOUBLE  NOT NULL DEFAULT 0,
    bouncerates              DOUBLE  NOT NULL DEFAULT 0,
    exitrates                DOUBLE  NOT NULL DEFAULT 0,
    pagevalues               DOUBLE  NOT NULL DEFAULT 0,
    specialday               DOUBLE  NOT NULL DEFAULT 0,
    month                    VARCHAR,              -- 'Feb', 'Mar', ..., 'June' (mixed spellings)
    operatingsystems         INTEGER,
    browser                  INTEGER,
    region                   INTEGER,
    traffictype              INTEGER,
    visitortype              VARCHAR,              -- 'New_Visitor' | 'Returning_Visitor' | 'Other'
    weekend                  BOOLEAN NOT NULL DEFAULT FALSE,
    revenue                  BOOLEAN NOT NULL DEFAULT FALSE
);
CREATE INDEX IF NOT EXISTS idx_shopper_month   ON shopper_data(month);
CREATE INDEX IF NOT EXISTS idx_shopper_browser ON shopper_data(browser);

-- ===========================================
-- DIMENSIONS: code -> display name
-- ===========================================
CREATE TABLE IF NOT EXISTS dim_browser (
    id      INTEGER PRIMARY KEY,
    name    VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS dim_os (
    id      INTEGER PRIMARY KEY,
    name    VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS dim_region (
    id      INTEGER PRIMARY KEY,
    name    VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS dim_traffic (
    id      INTEGER PRIMARY KEY,
    name    VARCHAR NOT NULL
);
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_sql_creates_every_dimension_table() {
        let sql = init_sql("512MB");
        assert!(sql.starts_with("SET memory_limit = '512MB';"));
        for dimension in shopintent_core::dimension::Dimension::ALL {
            assert!(
                sql.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", dimension.table_name())),
                "missing {}",
                dimension.table_name()
            );
        }
    }
}
