use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;

use crate::dimension::{Dimension, DimensionEntry, DimensionRegistries};
use crate::engine::Snapshot;
use crate::filter::FilterConfig;
use crate::session::{Month, PageType, SessionRecord};

/// Distinct values a dashboard can offer in its filter controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub months: Vec<Month>,
    pub visitor_types: Vec<String>,
    pub weekend: Vec<bool>,
    pub browsers: Vec<DimensionEntry>,
    pub operating_systems: Vec<DimensionEntry>,
    pub regions: Vec<DimensionEntry>,
    pub traffic_types: Vec<DimensionEntry>,
    pub page_types: Vec<PageType>,
}

impl FilterOptions {
    /// Derive options from loaded sessions, naming codes through the
    /// registries. Unregistered codes get their fallback label.
    pub fn from_sessions(sessions: &[SessionRecord], registries: &DimensionRegistries) -> Self {
        let mut months = BTreeSet::new();
        let mut visitor_types = BTreeSet::new();
        let mut weekend = BTreeSet::new();
        let mut codes: [BTreeSet<u16>; 4] = Default::default();

        for s in sessions {
            months.extend(s.month);
            visitor_types.extend(s.visitor_type.clone());
            weekend.insert(s.weekend);
            for (slot, code) in codes.iter_mut().zip([
                s.browser,
                s.operating_system,
                s.region,
                s.traffic_type,
            ]) {
                slot.extend(code);
            }
        }

        let named = |dimension: Dimension, codes: &BTreeSet<u16>| -> Vec<DimensionEntry> {
            let registry = registries.get(dimension);
            codes
                .iter()
                .map(|&code| DimensionEntry {
                    code,
                    name: registry
                        .name(code)
                        .map(str::to_string)
                        .unwrap_or_else(|| dimension.fallback_label(Some(code))),
                })
                .collect()
        };

        Self {
            months: months.into_iter().collect(),
            visitor_types: visitor_types.into_iter().collect(),
            weekend: weekend.into_iter().collect(),
            browsers: named(Dimension::Browser, &codes[0]),
            operating_systems: named(Dimension::OperatingSystem, &codes[1]),
            regions: named(Dimension::Region, &codes[2]),
            traffic_types: named(Dimension::Traffic, &codes[3]),
            page_types: PageType::ALL.to_vec(),
        }
    }
}

/// Read side of the session store.
///
/// `generation` changes whenever sessions or dimension names change, so a
/// caller can tell when cached results are stale.
#[async_trait]
pub trait SessionSource: Send + Sync + 'static {
    /// Sessions that may match `filter`, plus current dimension registries.
    /// Implementations may return a superset; the engine re-applies the
    /// filter in memory.
    async fn snapshot(&self, filter: &FilterConfig) -> anyhow::Result<Snapshot>;

    async fn dimensions(&self) -> anyhow::Result<DimensionRegistries>;

    async fn filter_options(&self) -> anyhow::Result<FilterOptions>;

    /// Insert or rename a dimension entry. Returns the previous name.
    async fn rename_dimension(
        &self,
        dimension: Dimension,
        code: u16,
        name: &str,
    ) -> anyhow::Result<Option<String>>;

    fn generation(&self) -> u64;
}

/// A source backed by vectors held in memory. Useful for tests and for
/// embedding the engine without a database.
#[derive(Debug, Default)]
pub struct InMemorySource {
    sessions: RwLock<Vec<SessionRecord>>,
    dimensions: RwLock<DimensionRegistries>,
    generation: AtomicU64,
}

impl InMemorySource {
    pub fn new(sessions: Vec<SessionRecord>, dimensions: DimensionRegistries) -> Self {
        Self {
            sessions: RwLock::new(sessions),
            dimensions: RwLock::new(dimensions),
            generation: AtomicU64::new(0),
        }
    }

    pub fn replace_sessions(&self, sessions: Vec<SessionRecord>) -> anyhow::Result<()> {
        *self
            .sessions
            .write()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))? = sessions;
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_sessions(&self) -> anyhow::Result<Vec<SessionRecord>> {
        Ok(self
            .sessions
            .read()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?
            .clone())
    }

    fn read_dimensions(&self) -> anyhow::Result<DimensionRegistries> {
        Ok(self
            .dimensions
            .read()
            .map_err(|_| anyhow::anyhow!("dimension store lock poisoned"))?
            .clone())
    }
}

#[async_trait]
impl SessionSource for InMemorySource {
    async fn snapshot(&self, filter: &FilterConfig) -> anyhow::Result<Snapshot> {
        let sessions = self
            .read_sessions()?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();
        Ok(Snapshot::new(sessions, self.read_dimensions()?))
    }

    async fn dimensions(&self) -> anyhow::Result<DimensionRegistries> {
        self.read_dimensions()
    }

    async fn filter_options(&self) -> anyhow::Result<FilterOptions> {
        let sessions = self.read_sessions()?;
        let dimensions = self.read_dimensions()?;
        Ok(FilterOptions::from_sessions(&sessions, &dimensions))
    }

    async fn rename_dimension(
        &self,
        dimension: Dimension,
        code: u16,
        name: &str,
    ) -> anyhow::Result<Option<String>> {
        let previous = self
            .dimensions
            .write()
            .map_err(|_| anyhow::anyhow!("dimension store lock poisoned"))?
            .get_mut(dimension)
            .insert(code, name);
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(previous)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session;

    #[tokio::test]
    async fn snapshot_applies_filter() {
        let mut weekend = session(2);
        weekend.weekend = true;
        let source = InMemorySource::new(
            vec![session(1), weekend],
            DimensionRegistries::default(),
        );

        let filter = FilterConfig {
            weekend: Some(true),
            ..Default::default()
        };
        let snapshot = source.snapshot(&filter).await.expect("snapshot");
        assert_eq!(snapshot.sessions.len(), 1);
        assert_eq!(snapshot.sessions[0].session_id, 2);
    }

    #[tokio::test]
    async fn rename_bumps_generation_and_returns_previous_name() {
        let source = InMemorySource::default();
        assert_eq!(source.generation(), 0);

        let previous = source
            .rename_dimension(Dimension::Browser, 1, "Chrome")
            .await
            .expect("insert");
        assert_eq!(previous, None);
        let previous = source
            .rename_dimension(Dimension::Browser, 1, "Google Chrome")
            .await
            .expect("rename");
        assert_eq!(previous.as_deref(), Some("Chrome"));
        assert_eq!(source.generation(), 2);

        let dims = source.dimensions().await.expect("dimensions");
        assert_eq!(dims.browser.name(1), Some("Google Chrome"));
    }

    #[tokio::test]
    async fn replacing_sessions_bumps_generation() {
        let source = InMemorySource::new(vec![session(1)], DimensionRegistries::default());
        let before = source.generation();

        source
            .replace_sessions(vec![session(2), session(3)])
            .expect("replace");
        assert_eq!(source.generation(), before + 1);

        let snapshot = source
            .snapshot(&FilterConfig::default())
            .await
            .expect("snapshot");
        let ids: Vec<_> = snapshot.sessions.iter().map(|s| s.session_id).collect();
        assert_eq!(ids, [2, 3]);
    }

    #[tokio::test]
    async fn filter_options_name_unregistered_codes() {
        let mut registries = DimensionRegistries::default();
        registries.region.insert(1, "North");
        let mut far = session(2);
        far.region = Some(7);
        let source = InMemorySource::new(vec![session(1), far], registries);

        let options = source.filter_options().await.expect("options");
        let regions: Vec<_> = options.regions.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(regions, ["North", "Region 7"]);
        assert_eq!(options.weekend, [false]);
        assert_eq!(options.page_types.len(), 3);
    }
}
