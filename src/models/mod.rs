//! Response models for the admin endpoints
//!
//! Cached values are served as raw bytes; only the admin endpoints return
//! JSON bodies.

pub mod responses;

pub use responses::{HealthResponse, StatsResponse};
