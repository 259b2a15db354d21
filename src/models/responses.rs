//! Response DTOs for the admin endpoints
//!
//! Defines the structure of outgoing JSON bodies.

use serde::Serialize;

use crate::cache::StatsSnapshot;

/// Response body for the stats endpoint (GET /-/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of reads answered from the cache
    pub hits: u64,
    /// Number of reads forwarded to the backing store
    pub misses: u64,
    /// Entries removed to respect the capacity bound
    pub evictions: u64,
    /// Entries removed because their lifetime ran out
    pub expirations: u64,
    /// Failed backing-store reads
    pub backend_errors: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Backing-store commands awaiting a reply
    pub in_flight: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a counter snapshot and current gauges
    pub fn new(snapshot: StatsSnapshot, total_entries: usize, in_flight: usize) -> Self {
        Self {
            hits: snapshot.hits,
            misses: snapshot.misses,
            evictions: snapshot.evictions,
            expirations: snapshot.expirations,
            backend_errors: snapshot.backend_errors,
            total_entries,
            in_flight,
            hit_rate: snapshot.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /-/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" once the backing-store connection is lost
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self::with_status("healthy")
    }

    pub fn degraded() -> Self {
        Self::with_status("degraded")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
