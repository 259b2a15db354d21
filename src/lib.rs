//! Cache Proxy - A read-through caching proxy in front of Redis
//!
//! Serves `GET /{key}` from a bounded in-memory cache, reading misses from
//! Redis over one pipelined connection. Entries leave the cache when they
//! reach their lifetime or when the cache is over capacity.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;
pub mod request;
pub mod tasks;

pub use api::{create_router, AppState};
pub use backend::PipelineAdapter;
pub use config::Config;
pub use error::{ProxyError, Result};
pub use proxy::{ProxyHandle, ReadThroughCache};
pub use request::{Request, Response};
