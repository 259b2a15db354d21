//! API Routes
//!
//! Configures the Axum router with all proxy endpoints.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{delete_handler, get_handler, health_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /:key` - Read a value through the cache
/// - `DELETE /:key` - Invalidate a cached key
/// - `GET /-/stats` - Get cache statistics
/// - `GET /-/health` - Health check endpoint
///
/// The admin paths have two segments so they never shadow a key.
///
/// # Middleware
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/-/stats", get(stats_handler))
        .route("/-/health", get(health_handler))
        .route("/:key", get(get_handler).delete(delete_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
