//! API Module
//!
//! HTTP handlers and routing for the proxy front-end.
//!
//! # Endpoints
//! - `GET /:key` - Read a value through the cache
//! - `DELETE /:key` - Invalidate a cached key
//! - `GET /-/stats` - Get cache statistics
//! - `GET /-/health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
