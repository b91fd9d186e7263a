use async_trait::async_trait;

use shopintent_core::dimension::{Dimension, DimensionRegistries};
use shopintent_core::engine::Snapshot;
use shopintent_core::filter::FilterConfig;
use shopintent_core::source::{FilterOptions, SessionSource};

use crate::queries::dimensions::load_dimensions_inner;
use crate::queries::sessions::load_sessions_inner;
use crate::DuckDbBackend;

#[async_trait]
impl SessionSource for DuckDbBackend {
    /// Sessions and registries are read under one connection lock, so a
    /// concurrent rename lands either wholly before or wholly after.
    async fn snapshot(&self, filter: &FilterConfig) -> anyhow::Result<Snapshot> {
        let conn = self.conn.lock().await;
        let sessions = load_sessions_inner(&conn, filter)?;
        let dimensions = load_dimensions_inner(&conn)?;
        Ok(Snapshot::new(sessions, dimensions))
    }

    async fn dimensions(&self) -> anyhow::Result<DimensionRegistries> {
        DuckDbBackend::load_dimensions(self).await
    }

    async fn filter_options(&self) -> anyhow::Result<FilterOptions> {
        DuckDbBackend::filter_options(self).await
    }

    async fn rename_dimension(
        &self,
        dimension: Dimension,
        code: u16,
        name: &str,
    ) -> anyhow::Result<Option<String>> {
        DuckDbBackend::upsert_dimension(self, dimension, code, name).await
    }

    fn generation(&self) -> u64 {
        DuckDbBackend::generation(self)
    }
}
