//! Request and Response types exchanged between the front-end, the
//! coordinator and the backing-store pipeline.

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::ProxyError;

/// Outcome of a read: the value bytes or the error that prevented it.
pub type Response = std::result::Result<Bytes, ProxyError>;

/// A read for one key together with the slot its answer goes to.
///
/// `respond` consumes the request, so a request is answered at most once.
#[derive(Debug)]
pub struct Request {
    pub key: String,
    reply: oneshot::Sender<Response>,
}

impl Request {
    /// Creates a request and the receiver its response will arrive on.
    pub fn new(key: impl Into<String>) -> (Self, oneshot::Receiver<Response>) {
        let (reply, rx) = oneshot::channel();
        let request = Self {
            key: key.into(),
            reply,
        };
        (request, rx)
    }

    /// Delivers the response. A caller that stopped waiting is not an error.
    pub fn respond(self, response: Response) {
        if self.reply.send(response).is_err() {
            trace!(key = %self.key, "requester went away before the response");
        }
    }

    /// Returns true if the requester stopped waiting.
    pub fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }
}
