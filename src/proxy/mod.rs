//! Proxy Module
//!
//! Wires the cache, the eviction sweep and the coordinator into a running
//! read-through cache.

mod coordinator;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::PipelineAdapter;
use crate::cache::{CacheStats, CacheStore, EvictionEngine};
use crate::config::Config;
use crate::tasks::SweepTask;

pub use coordinator::{Coordinator, ProxyHandle};

/// How long `shutdown` waits for outstanding misses.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// A running read-through cache in front of one backing store.
pub struct ReadThroughCache {
    handle: ProxyHandle,
    engine: Arc<EvictionEngine>,
    stats: Arc<CacheStats>,
    backend: PipelineAdapter,
    sweeper: SweepTask,
    coordinator: JoinHandle<()>,
}

impl ReadThroughCache {
    /// Builds the cache from `config` and starts its background tasks.
    pub fn start(config: &Config, backend: PipelineAdapter) -> Self {
        let stats = Arc::new(CacheStats::new());
        let engine = EvictionEngine::new(
            CacheStore::new(),
            config.capacity,
            config.expire_after,
            Arc::clone(&stats),
        );
        let (engine, sweeper) = engine.start(config.sweep_interval);

        let (coordinator, handle) = Coordinator::new(
            config.ingress_capacity,
            Arc::clone(&engine),
            backend.clone(),
            Arc::clone(&stats),
        );
        let coordinator = coordinator.spawn();

        info!(
            capacity = config.capacity,
            expire_after_ms = config.expire_after.as_millis() as u64,
            sweep_interval_ms = config.sweep_interval.as_millis() as u64,
            "cache started"
        );

        Self {
            handle,
            engine,
            stats,
            backend,
            sweeper,
            coordinator,
        }
    }

    pub fn handle(&self) -> ProxyHandle {
        self.handle.clone()
    }

    pub fn engine(&self) -> &Arc<EvictionEngine> {
        &self.engine
    }

    pub fn stats(&self) -> &Arc<CacheStats> {
        &self.stats
    }

    pub fn backend(&self) -> &PipelineAdapter {
        &self.backend
    }

    /// Stops the sweep timer and waits for the coordinator to finish the
    /// misses it already accepted.
    ///
    /// The coordinator only exits once every `ProxyHandle` clone is gone.
    pub async fn shutdown(self) {
        let Self {
            handle,
            sweeper,
            mut coordinator,
            ..
        } = self;

        sweeper.stop();
        drop(handle);

        match tokio::time::timeout(DRAIN_TIMEOUT, &mut coordinator).await {
            Ok(Ok(())) => info!("cache stopped"),
            Ok(Err(err)) => warn!(error = %err, "coordinator ended abnormally"),
            Err(_) => {
                warn!("coordinator still busy after drain timeout, aborting");
                coordinator.abort();
            }
        }
    }
}
