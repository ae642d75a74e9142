// crates/server/src/lib.rs
//! Chartmatch server library.
//!
//! This crate provides the Axum-based HTTP server for the chartmatch
//! application. Recordings come in over /api/upload, analysis runs in a
//! background task, and clients poll /api/job/{id} until the outcome lands.

pub mod error;
pub mod routes;
pub mod state;

#[cfg(test)]
pub mod test_support;

pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// How often the background sweeper looks for expired jobs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (upload, analyze, jobs, health)
/// - Static mounts for the landing page, uploaded recordings, and results
/// - A background sweeper that drops jobs past the retention window
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    // Hourly sweep keeps the store and the data dirs from growing forever.
    let sweeper = state.manager.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;
            let removed = sweeper.sweep().await;
            tracing::debug!(removed, "periodic sweep finished");
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let storage = state.manager.storage().clone();

    Router::new()
        .route_service("/", ServeFile::new(storage.static_root().join("index.html")))
        .nest_service("/static", ServeDir::new(storage.static_root()))
        .nest_service("/results", ServeDir::new(storage.results_root()))
        .nest_service("/uploads", ServeDir::new(storage.uploads_root()))
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
