//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror. Every failure a caller can
//! observe is a `ProxyError`; the cache layer never invents errors of its own
//! beyond forwarding what the backing store reported.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

// == Proxy Error Enum ==
/// Unified error type for the caching proxy.
///
/// The enum is `Clone` so a single transport failure can be delivered to every
/// request that was waiting on the broken connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// The backing store could not be reached at startup
    #[error("failed to connect to backing store at {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// The backing store has no value for the key
    #[error("key not found: {0}")]
    NotFound(String),

    /// The backing store answered with an error reply
    #[error("backing store error: {0}")]
    Backend(String),

    /// The backing store answered with a reply that is not a value
    #[error("unexpected reply from backing store: {0}")]
    UnexpectedReply(String),

    /// The connection to the backing store failed
    #[error("connection to backing store lost: {0}")]
    ConnectionLost(String),

    /// The reply stream could not be decoded
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No reply arrived within the configured deadline
    #[error("backing store did not reply within {0:?}")]
    Timeout(Duration),

    /// The pipeline or coordinator is no longer running
    #[error("proxy is shutting down")]
    Closed,

    /// The requested key cannot be served
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Invalidation of a key that is not cached
    #[error("key not cached: {0}")]
    NotCached(String),
}

impl ProxyError {
    /// Returns true when the error leaves the backing-store connection unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProxyError::ConnectionLost(_) | ProxyError::Protocol(_))
    }

    /// Wraps an I/O failure on the backing-store connection.
    pub fn io(err: std::io::Error) -> Self {
        ProxyError::ConnectionLost(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            ProxyError::NotCached(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
