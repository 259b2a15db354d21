//! Eviction Engine Module
//!
//! Owns the expiry index and is the only component allowed to change which
//! keys are cached. Every insert, eviction, expiry and invalidation happens
//! under one lock, so the store and the index always hold the same key set
//! once a call returns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, CacheStore, ExpiryIndex};
use crate::tasks::{spawn_sweep_task, SweepTask};

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries removed to get back under the capacity bound
    pub evicted: usize,
    /// Entries removed because they reached their expiry
    pub expired: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.evicted + self.expired
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

// == Eviction Engine ==
/// Enforces the capacity and lifetime bounds of the cache.
///
/// Entries are evicted in expiry order for both bounds. With a single fixed
/// lifetime this is insertion order; reads do not refresh an entry.
#[derive(Debug)]
pub struct EvictionEngine {
    store: CacheStore,
    index: Mutex<ExpiryIndex<Instant>>,
    max_entries: usize,
    time_to_live: Duration,
    stats: Arc<CacheStats>,
}

impl EvictionEngine {
    // == Constructor ==
    /// Creates an engine managing `store`.
    ///
    /// # Arguments
    /// * `store` - The store whose membership the engine controls
    /// * `max_entries` - Maximum number of entries kept after each sweep
    /// * `time_to_live` - Lifetime given to every inserted entry
    /// * `stats` - Counters updated with evictions and expirations
    pub fn new(
        store: CacheStore,
        max_entries: usize,
        time_to_live: Duration,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self {
            store,
            index: Mutex::new(ExpiryIndex::new()),
            max_entries,
            time_to_live,
            stats,
        }
    }

    /// Wraps the engine in an `Arc` and starts its periodic sweep.
    ///
    /// The returned task handle owns the timer: stopping or dropping it ends
    /// the background sweeps.
    pub fn start(self, period: Duration) -> (Arc<Self>, SweepTask) {
        let engine = Arc::new(self);
        let task = spawn_sweep_task(Arc::clone(&engine), period);
        (engine, task)
    }

    // == Insert ==
    /// Caches `value` under `key` and enforces both bounds.
    ///
    /// Re-inserting a cached key replaces its entry and moves its single index
    /// record to the new expiry.
    pub fn insert(&self, key: String, value: Bytes) -> CacheEntry {
        self.insert_at(key, value, Instant::now())
    }

    pub(crate) fn insert_at(&self, key: String, value: Bytes, now: Instant) -> CacheEntry {
        let entry = CacheEntry::new(value, now, self.time_to_live);

        let report = {
            let mut index = self.index.lock();
            self.store.put(key.clone(), entry.clone());
            index.push_key(key, entry.expires_at);
            self.sweep_locked(&mut index, now)
        };

        if !report.is_empty() {
            debug!(
                evicted = report.evicted,
                expired = report.expired,
                "cache: insert triggered eviction"
            );
        }
        entry
    }

    // == Invalidate ==
    /// Drops `key` from the cache. Returns false if it was not cached.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut index = self.index.lock();
        let tracked = index.remove(key).is_some();
        self.store.delete(key);
        tracked
    }

    // == Sweep ==
    /// Removes entries over capacity and entries whose expiry has passed.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> SweepReport {
        let mut index = self.index.lock();
        self.sweep_locked(&mut index, now)
    }

    fn sweep_locked(&self, index: &mut ExpiryIndex<Instant>, now: Instant) -> SweepReport {
        let mut report = SweepReport::default();

        while index.len() > self.max_entries {
            let Some((key, _)) = index.pop_oldest() else {
                break;
            };
            self.store.delete(&key);
            report.evicted += 1;
        }

        while index.peek_oldest().is_some_and(|oldest| oldest <= now) {
            let Some((key, _)) = index.pop_oldest() else {
                break;
            };
            self.store.delete(&key);
            report.expired += 1;
        }

        self.stats.record_evictions(report.evicted);
        self.stats.record_expirations(report.expired);
        report
    }

    /// Number of keys tracked by the expiry index.
    pub fn len(&self) -> usize {
        self.index.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.lock().is_empty()
    }

    /// Snapshot of the keys tracked by the expiry index.
    pub fn tracked_keys(&self) -> Vec<String> {
        self.index.lock().keys().map(str::to_string).collect()
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let index = self.index.lock();
        index.assert_consistent();

        let mut tracked: Vec<String> = index.keys().map(str::to_string).collect();
        let mut stored = self.store.keys();
        tracked.sort();
        stored.sort();
        assert_eq!(tracked, stored, "expiry index and store hold different keys");
        for key in &tracked {
            let entry = self.store.get(key).expect("tracked key missing from store");
            assert_eq!(index.expiry_of(key), Some(entry.expires_at));
        }
    }
}
