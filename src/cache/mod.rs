//! Cache Module
//!
//! In-memory cache of backing-store values bounded by entry count and age.

mod entry;
mod eviction;
mod expiry;
mod stats;
mod store;


// Re-export public types
pub use entry::{expiry_after, CacheEntry};
pub use eviction::{EvictionEngine, SweepReport};
pub use expiry::ExpiryIndex;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 1024;
