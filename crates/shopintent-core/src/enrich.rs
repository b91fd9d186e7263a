//! Denormalization view: sessions joined with their dimension names.
//!
//! Enrichment is computed on demand from a snapshot and never stored, so a
//! renamed dimension entry shows up in the very next query. The join is
//! outer: every session yields exactly one [`EnrichedRecord`], with a
//! synthetic label standing in for any code the registry does not know.

use std::borrow::Cow;
use std::ops::Deref;

use crate::dimension::{Dimension, DimensionRegistries};
use crate::session::SessionRecord;

/// A session plus resolved dimension names and derived labels.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord<'a> {
    pub session: &'a SessionRecord,
    pub browser_name: Cow<'a, str>,
    pub os_name: Cow<'a, str>,
    pub region_name: Cow<'a, str>,
    pub traffic_name: Cow<'a, str>,
    pub weekend_label: &'static str,
}

impl<'a> EnrichedRecord<'a> {
    pub fn new(session: &'a SessionRecord, registries: &'a DimensionRegistries) -> Self {
        Self {
            session,
            browser_name: resolve(registries, Dimension::Browser, session.browser),
            os_name: resolve(registries, Dimension::OperatingSystem, session.operating_system),
            region_name: resolve(registries, Dimension::Region, session.region),
            traffic_name: resolve(registries, Dimension::Traffic, session.traffic_type),
            weekend_label: session.weekend_label(),
        }
    }

    pub fn dimension_name(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Browser => &self.browser_name,
            Dimension::OperatingSystem => &self.os_name,
            Dimension::Region => &self.region_name,
            Dimension::Traffic => &self.traffic_name,
        }
    }
}

impl Deref for EnrichedRecord<'_> {
    type Target = SessionRecord;

    fn deref(&self) -> &SessionRecord {
        self.session
    }
}

fn resolve<'a>(
    registries: &'a DimensionRegistries,
    dimension: Dimension,
    code: Option<u16>,
) -> Cow<'a, str> {
    match code.and_then(|c| registries.get(dimension).name(c)) {
        Some(name) => Cow::Borrowed(name),
        None => Cow::Owned(dimension.fallback_label(code)),
    }
}

/// Enrich every session, preserving snapshot order.
pub fn enrich<'a>(
    sessions: &'a [SessionRecord],
    registries: &'a DimensionRegistries,
) -> impl Iterator<Item = EnrichedRecord<'a>> + 'a {
    sessions
        .iter()
        .map(move |session| EnrichedRecord::new(session, registries))
}
