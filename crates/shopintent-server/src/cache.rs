use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use shopintent_core::engine::{MetricOutput, MetricRequest};

/// Bounded metric result cache tied to a source data generation.
///
/// Entries are only valid for the generation they were computed at. Reading
/// or writing with a different generation drops every entry first. When
/// full, the oldest insertion is evicted.
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    generation: u64,
    entries: HashMap<MetricRequest, Arc<MetricOutput>>,
    order: VecDeque<MetricRequest>,
}

impl ResultCache {
    /// `capacity == 0` disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            generation: 0,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&mut self, request: &MetricRequest, generation: u64) -> Option<Arc<MetricOutput>> {
        self.sync_generation(generation);
        self.entries.get(request).cloned()
    }

    pub fn insert(&mut self, request: MetricRequest, output: Arc<MetricOutput>, generation: u64) {
        if self.capacity == 0 {
            return;
        }
        // Filled from a snapshot that is already stale.
        if generation < self.generation {
            return;
        }
        self.sync_generation(generation);

        if self.entries.contains_key(&request) {
            self.entries.insert(request, output);
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(request.clone());
        self.entries.insert(request, output);
    }

    fn sync_generation(&mut self, generation: u64) {
        if generation != self.generation {
            if !self.entries.is_empty() {
                tracing::debug!(
                    from = self.generation,
                    to = generation,
                    dropped = self.entries.len(),
                    "Source data changed, clearing result cache"
                );
            }
            self.entries.clear();
            self.order.clear();
            self.generation = generation;
        }
    }
}

#[cfg(test)]
mod tests {
    use shopintent_core::aggregate::{Rate, SummaryRow};
    use shopintent_core::cohort::CohortView;
    use shopintent_core::dimension::Dimension;

    use super::*;

    fn output(total: u64) -> Arc<MetricOutput> {
        Arc::new(MetricOutput::Summary(SummaryRow {
            total_sessions: total,
            total_conversions: 0,
            overall_conversion_rate: Rate::percentage(0, total),
        }))
    }

    fn request(view: CohortView) -> MetricRequest {
        MetricRequest::cohort(view)
    }

    #[test]
    fn hit_within_generation_miss_after_change() {
        let mut cache = ResultCache::new(4);
        let key = request(CohortView::ExecutiveSummary);
        cache.insert(key.clone(), output(3), 1);
        assert_eq!(cache.get(&key, 1), Some(output(3)));
        assert_eq!(cache.get(&key, 2), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn stale_fill_is_discarded() {
        let mut cache = ResultCache::new(4);
        let key = request(CohortView::SpecialDay);
        assert_eq!(cache.get(&key, 5), None);
        cache.insert(key.clone(), output(1), 4);
        assert_eq!(cache.get(&key, 5), None);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut cache = ResultCache::new(2);
        let first = request(CohortView::Leaderboard(Dimension::Browser));
        let second = request(CohortView::Leaderboard(Dimension::Region));
        let third = request(CohortView::WeekdayVsWeekend);
        cache.insert(first.clone(), output(1), 0);
        cache.insert(second.clone(), output(2), 0);
        cache.insert(third.clone(), output(3), 0);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&first, 0), None);
        assert!(cache.get(&second, 0).is_some());
        assert!(cache.get(&third, 0).is_some());
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let mut cache = ResultCache::new(0);
        let key = request(CohortView::ExecutiveSummary);
        cache.insert(key.clone(), output(1), 0);
        assert_eq!(cache.get(&key, 0), None);
    }
}
