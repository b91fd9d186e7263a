use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use shopintent_core::session::SessionRecord;

use crate::schema::init_sql;

/// A DuckDB backend for the session store.
///
/// DuckDB is single-writer, so the connection lives behind `Arc<Mutex<_>>`
/// and the struct can be shared across Axum handlers.
///
/// Every write to `shopper_data` or a `dim_*` table bumps `generation`.
/// Result caches compare it to decide whether their entries are stale.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
    generation: AtomicU64,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self::from_connection(conn))
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for tests; data is discarded when the struct is dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the DuckDB connection lock for direct queries.
    ///
    /// Intended for integration tests that need to verify stored data.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Insert or replace a batch of sessions in a single transaction.
    ///
    /// Used by fixtures and bulk loaders; the dashboard itself never writes
    /// sessions. Months are stored by abbreviation.
    pub async fn insert_sessions(&self, sessions: &[SessionRecord]) -> Result<()> {
        if sessions.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        for s in sessions {
            tx.execute(
                r#"INSERT OR REPLACE INTO shopper_data (
                    session_id,
                    administrative, administrative_duration,
                    informational, informational_duration,
                    productrelated, productrelated_duration,
                    bouncerates, exitrates, pagevalues, specialday,
                    month, operatingsystems, browser, region, traffictype,
                    visitortype, weekend, revenue
                ) VALUES (
                    ?1,
                    ?2,  ?3,
                    ?4,  ?5,
                    ?6,  ?7,
                    ?8,  ?9,  ?10, ?11,
                    ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19
                )"#,
                duckdb::params![
                    s.session_id,
                    s.administrative,
                    s.administrative_duration,
                    s.informational,
                    s.informational_duration,
                    s.product_related,
                    s.product_related_duration,
                    s.bounce_rate,
                    s.exit_rate,
                    s.page_value,
                    s.special_day,
                    s.month.map(|m| m.abbreviation()),
                    s.operating_system,
                    s.browser,
                    s.region,
                    s.traffic_type,
                    s.visitor_type,
                    s.weekend,
                    s.revenue,
                ],
            )?;
        }

        tx.commit()?;
        drop(conn);
        self.bump_generation();
        tracing::info!("Inserted {} sessions into DuckDB", sessions.len());
        Ok(())
    }
}
