use std::sync::Arc;

use tokio::sync::Mutex;

use shopintent_core::config::Config;
use shopintent_core::engine::{run, MetricOutput, MetricRequest};
use shopintent_core::source::SessionSource;
use shopintent_duckdb::DuckDbBackend;

use crate::cache::ResultCache;
use crate::error::AppError;

/// Shared application state passed to every Axum handler via
/// `State<Arc<AppState>>`.
pub struct AppState {
    /// The DuckDB backend. Internally uses `Arc<tokio::sync::Mutex<Connection>>`
    /// so it is already cheap to clone and async-safe.
    pub db: Arc<DuckDbBackend>,

    /// Where sessions and dimension names are read from. The DuckDB backend
    /// in production; tests may substitute another source.
    pub source: Arc<dyn SessionSource>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    cache: Mutex<ResultCache>,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        let db = Arc::new(db);
        let source: Arc<dyn SessionSource> = db.clone();
        Self::with_source(db, source, config)
    }

    pub fn with_source(
        db: Arc<DuckDbBackend>,
        source: Arc<dyn SessionSource>,
        config: Config,
    ) -> Self {
        let cache = Mutex::new(ResultCache::new(config.cache_max_entries));
        Self {
            db,
            source,
            config: Arc::new(config),
            cache,
        }
    }

    /// Evaluate `request`, serving from the result cache when the source
    /// has not changed since the entry was filled.
    pub async fn metric(&self, request: MetricRequest) -> Result<Arc<MetricOutput>, AppError> {
        request.validate()?;
        let generation = self.source.generation();

        if let Some(hit) = self.cache.lock().await.get(&request, generation) {
            tracing::debug!(kind = ?request.kind, "Result cache hit");
            return Ok(hit);
        }

        let output = Arc::new(run(self.source.as_ref(), &request).await?);
        self.cache
            .lock()
            .await
            .insert(request, Arc::clone(&output), generation);
        Ok(output)
    }

    pub async fn cached_results(&self) -> usize {
        self.cache.lock().await.len()
    }
}
