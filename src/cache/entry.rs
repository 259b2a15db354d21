//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with an absolute expiry.

use std::time::{Duration, Instant};

use bytes::Bytes;

/// Upper bound applied when `now + ttl` does not fit in an `Instant`.
const MAX_TIME_TO_LIVE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// == Cache Entry ==
/// A value fetched from the backing store together with its expiry.
///
/// Entries are never mutated once created; refreshing a key replaces the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The stored value
    pub value: Bytes,
    /// Instant at which the entry stops being served
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl` after `now`.
    pub fn new(value: Bytes, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: expiry_after(now, ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches its expiry instant, matching the
    /// boundary the eviction sweep uses.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime at `now`, zero once expired.
    pub fn ttl_remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// Computes `now + ttl`, clamping absurd lifetimes instead of panicking.
pub fn expiry_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .unwrap_or_else(|| now + MAX_TIME_TO_LIVE)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let now = Instant::now();
        let entry = CacheEntry::new(Bytes::from_static(b"value"), now, Duration::from_secs(60));

        assert_eq!(entry.value, Bytes::from_static(b"value"));
        assert_eq!(entry.expires_at, now + Duration::from_secs(60));
        assert!(!entry.is_expired_at(now));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = CacheEntry::new(Bytes::new(), now, Duration::from_millis(100));

        assert!(!entry.is_expired_at(now + Duration::from_millis(99)));
        assert!(entry.is_expired_at(now + Duration::from_millis(100)));
        assert!(entry.is_expired_at(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let now = Instant::now();
        let entry = CacheEntry::new(Bytes::new(), now, Duration::ZERO);
        assert!(entry.is_expired_at(now));
    }

    #[test]
    fn test_ttl_remaining() {
        let now = Instant::now();
        let entry = CacheEntry::new(Bytes::new(), now, Duration::from_secs(10));

        assert_eq!(entry.ttl_remaining(now), Duration::from_secs(10));
        assert_eq!(
            entry.ttl_remaining(now + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
        assert_eq!(entry.ttl_remaining(now + Duration::from_secs(11)), Duration::ZERO);
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let now = Instant::now();
        let entry = CacheEntry::new(Bytes::new(), now, Duration::MAX);
        assert!(entry.expires_at > now);
        assert!(!entry.is_expired_at(now + Duration::from_secs(3600)));
    }
}
