//! Backing-Store Pipeline Adapter
//!
//! Multiplexes concurrent reads onto one connection. Commands are written in
//! the order requests arrive and replies are matched to requests purely by
//! position, so the backing store must answer in send order (Redis does on a
//! single connection). At most `max_in_flight` commands are unanswered at
//! any time; further requests wait for a free slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, error, info, warn};

use crate::backend::connection::{self, CommandWriter, ReplyReader};
use crate::error::{ProxyError, Result};
use crate::request::{Request, Response};

/// Requests queued ahead of the in-flight window per window slot.
const INGRESS_PER_SLOT: usize = 16;

/// A request whose command has been handed to the connection.
struct InFlight {
    request: Request,
    // Returned to the window when the reply has been delivered.
    _slot: OwnedSemaphorePermit,
}

// == Pipeline Adapter ==
/// Handle to the pipelined backing-store connection.
///
/// Cloning is cheap. The connection tasks stop once every handle is dropped
/// and the last outstanding reply has been delivered.
#[derive(Debug, Clone)]
pub struct PipelineAdapter {
    ingress: mpsc::Sender<Request>,
    window: Arc<Semaphore>,
    max_in_flight: usize,
    request_timeout: Duration,
}

impl PipelineAdapter {
    /// Connects to Redis at `addr` and starts the pipeline.
    ///
    /// A connection failure here is a startup failure: there is no backing
    /// store to serve misses from.
    pub async fn connect(
        addr: &str,
        max_in_flight: usize,
        request_timeout: Duration,
    ) -> Result<Self> {
        let (writer, reader) = connection::dial(addr).await?;
        Ok(Self::spawn(writer, reader, max_in_flight, request_timeout))
    }

    /// Starts the sender and receiver loops over an established connection.
    pub fn spawn<W, R>(
        writer: W,
        reader: R,
        max_in_flight: usize,
        request_timeout: Duration,
    ) -> Self
    where
        W: CommandWriter,
        R: ReplyReader,
    {
        let max_in_flight = max_in_flight.max(1);
        let (ingress_tx, ingress_rx) = mpsc::channel(max_in_flight * INGRESS_PER_SLOT);
        let (window_tx, window_rx) = mpsc::unbounded_channel();
        let window = Arc::new(Semaphore::new(max_in_flight));

        tokio::spawn(run_sender(ingress_rx, writer, window_tx, Arc::clone(&window)));
        tokio::spawn(run_receiver(window_rx, reader, Arc::clone(&window)));
        info!(max_in_flight, "backend: pipeline started");

        Self {
            ingress: ingress_tx,
            window,
            max_in_flight,
            request_timeout,
        }
    }

    // == Fetch ==
    /// Reads `key` from the backing store.
    ///
    /// Gives up with `ProxyError::Timeout` if no reply arrives in time. The
    /// command keeps its window slot until its reply is read, so replies that
    /// arrive late are discarded without disturbing later requests.
    pub async fn fetch(&self, key: &str) -> Response {
        let (request, reply) = Request::new(key);

        let exchange = async {
            self.ingress
                .send(request)
                .await
                .map_err(|_| ProxyError::Closed)?;
            reply.await.map_err(|_| ProxyError::Closed)?
        };

        match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(response) => response,
            Err(_) => {
                warn!(key, timeout = ?self.request_timeout, "backend: request timed out");
                Err(ProxyError::Timeout(self.request_timeout))
            }
        }
    }

    /// Number of commands sent and not yet answered.
    pub fn in_flight(&self) -> usize {
        if self.window.is_closed() {
            return 0;
        }
        self.max_in_flight
            .saturating_sub(self.window.available_permits())
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns false once the connection has failed.
    pub fn is_connected(&self) -> bool {
        !self.window.is_closed()
    }
}

/// Takes requests off the ingress queue, admits them to the window and
/// writes their commands.
///
/// Buffered commands are flushed before the sender waits for a window slot:
/// slots only come back once the backing store has seen those commands.
async fn run_sender<W: CommandWriter>(
    mut ingress: mpsc::Receiver<Request>,
    mut writer: W,
    window: mpsc::UnboundedSender<InFlight>,
    slots: Arc<Semaphore>,
) {
    while let Some(request) = ingress.recv().await {
        let slot = match Arc::clone(&slots).try_acquire_owned() {
            Ok(slot) => slot,
            Err(TryAcquireError::NoPermits) => {
                if let Err(err) = writer.flush().await {
                    request.respond(Err(err.clone()));
                    error!(error = %err, "backend: write failed, closing pipeline");
                    slots.close();
                    break;
                }
                match Arc::clone(&slots).acquire_owned().await {
                    Ok(slot) => slot,
                    Err(_) => {
                        request.respond(Err(lost_connection()));
                        continue;
                    }
                }
            }
            Err(TryAcquireError::Closed) => {
                request.respond(Err(lost_connection()));
                continue;
            }
        };

        // The caller gave up while queued; nothing would read the reply.
        if request.is_abandoned() {
            debug!(key = %request.key, "backend: skipping abandoned request");
            continue;
        }

        let key = request.key.clone();
        // Registered before writing so the receiver always knows who a reply
        // belongs to.
        if let Err(rejected) = window.send(InFlight { request, _slot: slot }) {
            rejected.0.request.respond(Err(lost_connection()));
            continue;
        }

        debug!(key = %key, "backend: sending GET");
        let mut result = writer.send_get(&key).await;
        if result.is_ok() && (ingress.is_empty() || slots.available_permits() == 0) {
            result = writer.flush().await;
        }

        if let Err(err) = result {
            error!(error = %err, "backend: write failed, closing pipeline");
            slots.close();
            break;
        }
    }

    // Keep answering until every handle is gone.
    drop(window);
    while let Some(request) = ingress.recv().await {
        request.respond(Err(lost_connection()));
    }
    debug!("backend: sender stopped");
}

/// Reads replies and hands each one to the oldest request in the window.
async fn run_receiver<R: ReplyReader>(
    mut window: mpsc::UnboundedReceiver<InFlight>,
    mut reader: R,
    slots: Arc<Semaphore>,
) {
    while let Some(in_flight) = window.recv().await {
        let InFlight { request, _slot } = in_flight;

        let response = match reader.receive().await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(ProxyError::NotFound(request.key.clone())),
            Err(err) => Err(err),
        };
        debug!(key = %request.key, ok = response.is_ok(), "backend: got reply");

        let fatal = match &response {
            Err(err) if err.is_fatal() => Some(err.clone()),
            _ => None,
        };
        if fatal.is_some() {
            slots.close();
        }
        request.respond(response);
        drop(_slot);

        if let Some(err) = fatal {
            error!(error = %err, "backend: connection failed, failing pending requests");
            let lost = match err {
                ProxyError::ConnectionLost(_) => err,
                other => ProxyError::ConnectionLost(other.to_string()),
            };
            window.close();
            while let Some(pending) = window.recv().await {
                pending.request.respond(Err(lost.clone()));
            }
            break;
        }
    }
    debug!("backend: receiver stopped");
}

fn lost_connection() -> ProxyError {
    ProxyError::ConnectionLost("pipeline is no longer connected".to_string())
}
