#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// DuckDB `memory_limit`, e.g. `"1GB"`.
    pub duckdb_memory_limit: String,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Result cache capacity. `0` disables caching.
    pub cache_max_entries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: "./data".to_string(),
            duckdb_memory_limit: "1GB".to_string(),
            cors_origins: Vec::new(),
            cache_max_entries: 256,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            port: match lookup("SHOPINTENT_PORT") {
                Some(raw) => raw.trim().parse().map_err(|e| format!("invalid port: {e}"))?,
                None => defaults.port,
            },
            data_dir: lookup("SHOPINTENT_DATA_DIR").unwrap_or(defaults.data_dir),
            duckdb_memory_limit: match lookup("SHOPINTENT_DUCKDB_MEMORY") {
                Some(raw) => validate_memory_limit(raw.trim())?,
                None => defaults.duckdb_memory_limit,
            },
            cors_origins: lookup("SHOPINTENT_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            cache_max_entries: match lookup("SHOPINTENT_CACHE_MAX_ENTRIES") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|e| format!("invalid cache size: {e}"))?,
                None => defaults.cache_max_entries,
            },
        })
    }
}

/// Accepts `<digits><unit>` with unit KB, MB, GB or TB. The value is
/// interpolated into a `SET` statement, so nothing else gets through.
fn validate_memory_limit(raw: &str) -> Result<String, String> {
    let upper = raw.to_ascii_uppercase();
    let digits = upper.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let unit = &upper[digits.len()..];
    let valid = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && matches!(unit, "KB" | "MB" | "GB" | "TB");
    if valid {
        Ok(upper)
    } else {
        Err(format!("invalid DuckDB memory limit: {raw}"))
    }
}
