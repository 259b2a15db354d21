//! API Handlers
//!
//! HTTP request handlers for each proxy endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;

use crate::backend::PipelineAdapter;
use crate::cache::{CacheStats, EvictionEngine, MAX_KEY_LENGTH};
use crate::error::{ProxyError, Result};
use crate::models::{HealthResponse, StatsResponse};
use crate::proxy::{ProxyHandle, ReadThroughCache};

/// Application state shared across all handlers.
///
/// Every field is a cheap handle onto the running cache.
#[derive(Clone)]
pub struct AppState {
    /// Submits reads to the coordinator
    pub proxy: ProxyHandle,
    /// Invalidation and entry count
    pub engine: Arc<EvictionEngine>,
    /// In-flight gauge and connection health
    pub backend: PipelineAdapter,
    pub stats: Arc<CacheStats>,
}

impl AppState {
    /// Creates a new AppState backed by a running cache.
    pub fn from_cache(cache: &ReadThroughCache) -> Self {
        Self {
            proxy: cache.handle(),
            engine: Arc::clone(cache.engine()),
            backend: cache.backend().clone(),
            stats: Arc::clone(cache.stats()),
        }
    }
}

/// Handler for GET /:key
///
/// Serves the value from the cache, reading it from the backing store on a
/// miss. Any failure becomes a 500 with the error message as body.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Bytes> {
    validate_key(&key)?;
    state.proxy.get(&key).await
}

/// Handler for DELETE /:key
///
/// Drops the key from the local cache. The backing store is not touched.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode> {
    validate_key(&key)?;
    if state.engine.invalidate(&key) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ProxyError::NotCached(key))
    }
}

/// Handler for GET /-/stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.stats.snapshot(),
        state.engine.len(),
        state.backend.in_flight(),
    ))
}

/// Handler for GET /-/health
///
/// Reports 503 once the backing-store connection has failed.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if state.backend.is_connected() {
        (StatusCode::OK, Json(HealthResponse::healthy()))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse::degraded()))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(ProxyError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
