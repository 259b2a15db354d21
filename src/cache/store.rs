//! Cache Store Module
//!
//! Concurrent key to entry table. The store has no eviction logic of its own:
//! membership changes go through the eviction engine, which keeps the expiry
//! index in step with it.

use std::sync::Arc;

use dashmap::DashMap;

use crate::cache::CacheEntry;

// == Cache Store ==
/// Sharded map of cached entries, safe for concurrent readers and writers.
///
/// Cloning the store is cheap and every clone refers to the same table.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Returns a copy of the entry stored under `key`.
    ///
    /// Entry values are reference counted so the copy does not clone the bytes.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    // == Put ==
    /// Stores `entry` under `key`, replacing any previous entry.
    pub(crate) fn put(&self, key: String, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(key, entry)
    }

    // == Delete ==
    /// Removes the entry stored under `key`.
    pub(crate) fn delete(&self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    /// Returns true if an entry is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns a snapshot of the stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    // == Length ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
