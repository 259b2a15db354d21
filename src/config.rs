//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// They are read once at startup and stay fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP front-end listens on
    pub http_addr: SocketAddr,
    /// Address of the Redis backing store
    pub redis_addr: String,
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// How long a fetched value stays in the cache
    pub expire_after: Duration,
    /// Interval between background eviction sweeps
    pub sweep_interval: Duration,
    /// Maximum number of in-flight Redis commands
    pub redis_ops_limit: usize,
    /// Deadline for a single Redis round trip
    pub redis_timeout: Duration,
    /// Buffer size of the coordinator's request queue
    pub ingress_capacity: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `HTTP_ADDR` - Listen address (default: 0.0.0.0:8080)
    /// - `REDIS_ADDR` - Redis address (default: localhost:6379)
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `EXPIRE_AFTER_MS` - Entry lifetime in milliseconds (default: 60000)
    /// - `SWEEP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 1000)
    /// - `REDIS_OPS_LIMIT` - Maximum concurrent Redis operations (default: 10)
    /// - `REDIS_TIMEOUT_MS` - Redis reply deadline in milliseconds (default: 5000)
    /// - `INGRESS_CAPACITY` - Coordinator queue size (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            http_addr: env_or("HTTP_ADDR", defaults.http_addr),
            redis_addr: env::var("REDIS_ADDR").unwrap_or(defaults.redis_addr),
            capacity: env_or("CACHE_CAPACITY", defaults.capacity),
            expire_after: env_millis_or("EXPIRE_AFTER_MS", defaults.expire_after),
            sweep_interval: env_millis_or("SWEEP_INTERVAL_MS", defaults.sweep_interval)
                .max(Duration::from_millis(1)),
            redis_ops_limit: env_or("REDIS_OPS_LIMIT", defaults.redis_ops_limit).max(1),
            redis_timeout: env_millis_or("REDIS_TIMEOUT_MS", defaults.redis_timeout),
            ingress_capacity: env_or("INGRESS_CAPACITY", defaults.ingress_capacity).max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            redis_addr: "localhost:6379".to_string(),
            capacity: 1000,
            expire_after: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(1),
            redis_ops_limit: 10,
            redis_timeout: Duration::from_secs(5),
            ingress_capacity: 64,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_millis_or(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
