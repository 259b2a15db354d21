//! Coordinator
//!
//! Single dispatch loop between the front-end and the cache. Hits are
//! answered inline; each miss gets its own handler task, so a slow backing
//! store never holds up other keys.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, warn};

use crate::backend::PipelineAdapter;
use crate::cache::{CacheStats, CacheStore, EvictionEngine};
use crate::error::ProxyError;
use crate::request::{Request, Response};

/// Front-end side of the coordinator.
#[derive(Debug, Clone)]
pub struct ProxyHandle {
    ingress: mpsc::Sender<Request>,
}

impl ProxyHandle {
    /// Reads `key` through the cache.
    pub async fn get(&self, key: &str) -> Response {
        let (request, reply) = Request::new(key);
        self.ingress
            .send(request)
            .await
            .map_err(|_| ProxyError::Closed)?;
        reply.await.map_err(|_| ProxyError::Closed)?
    }
}

// == Coordinator ==
pub struct Coordinator {
    ingress: mpsc::Receiver<Request>,
    store: CacheStore,
    engine: Arc<EvictionEngine>,
    backend: PipelineAdapter,
    stats: Arc<CacheStats>,
    handlers: JoinSet<()>,
}

impl Coordinator {
    /// Creates a coordinator and the handle requests are submitted through.
    ///
    /// The loop runs until every `ProxyHandle` is dropped.
    pub fn new(
        ingress_capacity: usize,
        engine: Arc<EvictionEngine>,
        backend: PipelineAdapter,
        stats: Arc<CacheStats>,
    ) -> (Self, ProxyHandle) {
        let (tx, rx) = mpsc::channel(ingress_capacity.max(1));
        let coordinator = Self {
            ingress: rx,
            store: engine.store().clone(),
            engine,
            backend,
            stats,
            handlers: JoinSet::new(),
        };
        (coordinator, ProxyHandle { ingress: tx })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        debug!("coordinator: started");
        loop {
            tokio::select! {
                request = self.ingress.recv() => match request {
                    Some(request) => self.dispatch(request),
                    None => break,
                },
                Some(joined) = self.handlers.join_next(), if !self.handlers.is_empty() => {
                    if let Err(err) = joined {
                        error!(error = %err, "coordinator: miss handler failed");
                    }
                }
            }
        }

        debug!(pending = self.handlers.len(), "coordinator: draining miss handlers");
        while let Some(joined) = self.handlers.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "coordinator: miss handler failed");
            }
        }
        debug!("coordinator: stopped");
    }

    fn dispatch(&mut self, request: Request) {
        if let Some(entry) = self.store.get(&request.key) {
            if !entry.is_expired_at(Instant::now()) {
                self.stats.record_hit();
                request.respond(Ok(entry.value));
                return;
            }
        }

        self.stats.record_miss();
        self.handlers.spawn(resolve_miss(
            request,
            Arc::clone(&self.engine),
            self.backend.clone(),
            Arc::clone(&self.stats),
        ));
    }
}

/// Fetches a missed key from the backing store, caches it on success and
/// answers the request.
async fn resolve_miss(
    request: Request,
    engine: Arc<EvictionEngine>,
    backend: PipelineAdapter,
    stats: Arc<CacheStats>,
) {
    let response = backend.fetch(&request.key).await;
    match &response {
        Ok(value) => {
            engine.insert(request.key.clone(), value.clone());
        }
        Err(err) => {
            stats.record_backend_error();
            warn!(key = %request.key, error = %err, "coordinator: read failed");
        }
    }
    request.respond(response);
}
