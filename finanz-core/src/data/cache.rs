//! Bounded in-memory bar cache.
//!
//! [`BarCache`] stores fetched series keyed by `(symbol, start, end)` and
//! evicts the least recently used entry once `capacity` is exceeded. A
//! capacity of zero disables caching. [`CachedProvider`] wraps any
//! [`DataProvider`] with a cache; hits are reported as [`DataSource::Cache`].

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::Bar;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Cache key: one entry per requested range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(symbol: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_string(),
            start,
            end,
        }
    }
}

#[derive(Debug)]
struct Entry {
    bars: Arc<Vec<Bar>>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, Entry>,
    tick: u64,
    hits: u64,
    misses: u64,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Thread-safe LRU cache of bar series.
#[derive(Debug)]
pub struct BarCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl BarCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave entries half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a series, marking it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<Bar>>> {
        if self.capacity == 0 {
            return None;
        }
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        let found = inner.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            Arc::clone(&entry.bars)
        });
        if found.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        found
    }

    /// Store a series, evicting the least recently used entry if full.
    pub fn insert(&self, key: CacheKey, bars: Vec<Bar>) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!(symbol = %oldest.symbol, "evicting cached series");
                inner.entries.remove(&oldest);
            }
        }

        inner.entries.insert(
            key,
            Entry {
                bars: Arc::new(bars),
                last_used: tick,
            },
        );
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
        }
    }
}

/// A provider with a read-through [`BarCache`] in front of it.
#[derive(Debug)]
pub struct CachedProvider<P> {
    inner: P,
    cache: Arc<BarCache>,
}

impl<P: DataProvider> CachedProvider<P> {
    pub fn new(inner: P, capacity: usize) -> Self {
        Self::with_cache(inner, Arc::new(BarCache::new(capacity)))
    }

    /// Share one cache between several provider stacks.
    pub fn with_cache(inner: P, cache: Arc<BarCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &BarCache {
        &self.cache
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: DataProvider> DataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let key = CacheKey::new(symbol, start, end);
        if let Some(bars) = self.cache.get(&key) {
            debug!(symbol, %start, %end, "bar cache hit");
            return Ok(FetchResult {
                symbol: symbol.to_string(),
                bars: bars.as_ref().clone(),
                source: DataSource::Cache,
            });
        }

        let result = self.inner.fetch(symbol, start, end)?;
        // Synthetic series are never cached; they keep their own source tag.
        if result.source != DataSource::Synthetic {
            self.cache.insert(key, result.bars.clone());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SyntheticProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn key(symbol: &str) -> CacheKey {
        CacheKey::new(symbol, d(1, 1), d(1, 31))
    }

    fn bars(close: f64) -> Vec<Bar> {
        vec![Bar {
            date: d(1, 2),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1,
        }]
    }

    /// Counts fetches and serves one fixed bar.
    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl DataProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchResult {
                symbol: symbol.to_string(),
                bars: bars(10.0),
                source: DataSource::CsvImport,
            })
        }
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = BarCache::new(2);
        cache.insert(key("A"), bars(1.0));
        cache.insert(key("B"), bars(2.0));
        // Touch A so B becomes the eviction candidate.
        assert!(cache.get(&key("A")).is_some());
        cache.insert(key("C"), bars(3.0));

        assert!(cache.contains(&key("A")));
        assert!(!cache.contains(&key("B")));
        assert!(cache.contains(&key("C")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinserting_existing_key_does_not_evict() {
        let cache = BarCache::new(2);
        cache.insert(key("A"), bars(1.0));
        cache.insert(key("B"), bars(2.0));
        cache.insert(key("A"), bars(5.0));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("A")).unwrap()[0].close, 5.0);
    }

    #[test]
    fn zero_capacity_disables() {
        let cache = BarCache::new(0);
        cache.insert(key("A"), bars(1.0));
        assert!(cache.is_empty());
        assert!(cache.get(&key("A")).is_none());
    }

    #[test]
    fn distinct_ranges_are_distinct_entries() {
        let cache = BarCache::new(4);
        cache.insert(CacheKey::new("A", d(1, 1), d(1, 31)), bars(1.0));
        assert!(cache.get(&CacheKey::new("A", d(1, 1), d(2, 28))).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn cached_provider_serves_hits_from_cache() {
        let provider = CachedProvider::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            8,
        );

        let first = provider.fetch("A", d(1, 1), d(1, 31)).unwrap();
        let second = provider.fetch("A", d(1, 1), d(1, 31)).unwrap();

        assert_eq!(first.source, DataSource::CsvImport);
        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(first.bars, second.bars);
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.cache().stats().hits, 1);
    }

    #[test]
    fn synthetic_results_are_not_cached() {
        let provider = CachedProvider::new(SyntheticProvider, 8);
        provider.fetch("A", d(1, 1), d(1, 31)).unwrap();
        let again = provider.fetch("A", d(1, 1), d(1, 31)).unwrap();
        assert_eq!(again.source, DataSource::Synthetic);
        assert!(provider.cache().is_empty());
    }

    #[test]
    fn errors_are_not_cached() {
        let provider = CachedProvider::new(SyntheticProvider, 8);
        assert!(provider.fetch("A", d(1, 6), d(1, 7)).is_err());
        assert!(provider.cache().is_empty());
    }
}
