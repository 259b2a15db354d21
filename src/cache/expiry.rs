//! Expiry Index Module
//!
//! Min-heap of cached keys ordered by expiry. Each key has exactly one record;
//! a side table maps keys to heap positions so a record can be updated or
//! removed in O(log n) without scanning.

use std::collections::HashMap;

/// Heap record for one key.
#[derive(Debug, Clone)]
struct ExpiryRecord<T> {
    key: String,
    expires_at: T,
    /// Insertion counter, breaks ties between equal expiries in FIFO order
    sequence: u64,
}

impl<T: Ord> ExpiryRecord<T> {
    fn precedes(&self, other: &Self) -> bool {
        (&self.expires_at, self.sequence) < (&other.expires_at, other.sequence)
    }
}

// == Expiry Index ==
/// Priority queue of keys keyed by their expiry timestamp.
///
/// Not synchronized: the eviction engine owns it behind a single lock.
#[derive(Debug, Clone)]
pub struct ExpiryIndex<T> {
    heap: Vec<ExpiryRecord<T>>,
    positions: HashMap<String, usize>,
    next_sequence: u64,
}

impl<T> Default for ExpiryIndex<T> {
    fn default() -> Self {
        Self {
            heap: Vec::new(),
            positions: HashMap::new(),
            next_sequence: 0,
        }
    }
}

impl<T: Ord + Copy> ExpiryIndex<T> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push ==
    /// Tracks `key` with the given expiry.
    ///
    /// A key that is already tracked keeps its single record, which is moved to
    /// the position matching the new expiry.
    pub fn push_key(&mut self, key: String, expires_at: T) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        if let Some(&pos) = self.positions.get(&key) {
            let record = &mut self.heap[pos];
            record.expires_at = expires_at;
            record.sequence = sequence;
            self.fix(pos);
            return;
        }

        let pos = self.heap.len();
        self.positions.insert(key.clone(), pos);
        self.heap.push(ExpiryRecord {
            key,
            expires_at,
            sequence,
        });
        self.sift_up(pos);
    }

    // == Pop Oldest ==
    /// Removes and returns the key with the earliest expiry.
    pub fn pop_oldest(&mut self) -> Option<(String, T)> {
        if self.heap.is_empty() {
            return None;
        }
        let record = self.remove_at(0);
        Some((record.key, record.expires_at))
    }

    // == Peek Oldest ==
    /// Returns the earliest expiry without removing it.
    pub fn peek_oldest(&self) -> Option<T> {
        self.heap.first().map(|record| record.expires_at)
    }

    // == Remove ==
    /// Stops tracking `key`, returning its expiry if it was tracked.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let pos = *self.positions.get(key)?;
        Some(self.remove_at(pos).expires_at)
    }

    /// Returns the expiry recorded for `key`.
    pub fn expiry_of(&self, key: &str) -> Option<T> {
        self.positions.get(key).map(|&pos| self.heap[pos].expires_at)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Iterates over the tracked keys in heap order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.heap.iter().map(|record| record.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn remove_at(&mut self, pos: usize) -> ExpiryRecord<T> {
        let last = self.heap.len() - 1;
        if pos != last {
            self.swap(pos, last);
        }
        let record = self.heap.swap_remove(last);
        self.positions.remove(&record.key);
        if pos < self.heap.len() {
            self.fix(pos);
        }
        record
    }

    /// Restores heap order after the record at `pos` changed.
    fn fix(&mut self, pos: usize) {
        if !self.sift_up(pos) {
            self.sift_down(pos);
        }
    }

    /// Returns true if the record moved.
    fn sift_up(&mut self, mut pos: usize) -> bool {
        let start = pos;
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.heap[pos].precedes(&self.heap[parent]) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
        pos != start
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.heap[right].precedes(&self.heap[left]) {
                right
            } else {
                left
            };
            if !self.heap[child].precedes(&self.heap[pos]) {
                break;
            }
            self.swap(pos, child);
            pos = child;
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        for pos in [i, j] {
            if let Some(slot) = self.positions.get_mut(&self.heap[pos].key) {
                *slot = pos;
            }
        }
    }

    /// Checks heap order and position bookkeeping.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.heap.len(), self.positions.len());
        for (pos, record) in self.heap.iter().enumerate() {
            assert_eq!(self.positions.get(&record.key), Some(&pos));
            if pos > 0 {
                let parent = (pos - 1) / 2;
                assert!(!record.precedes(&self.heap[parent]));
            }
        }
    }
}
