//! API route handlers for the chartmatch server.

pub mod analyze;
pub mod health;
pub mod jobs;
pub mod upload;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET    /api/health - Health check
/// - POST   /api/upload - Submit a recording (multipart)
/// - POST   /api/analyze/{id} - Dispatch analysis for an uploaded job
/// - GET    /api/job/{id} - Full status of one job
/// - GET    /api/jobs - List all jobs, newest first
/// - GET    /api/jobs/category/{category} - Jobs for one category (or `all`)
/// - DELETE /api/job/{id} - Remove a job and its files
/// - GET    /api/cleanup - Sweep jobs older than the retention window
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", upload::router())
        .nest("/api", analyze::router())
        .nest("/api", jobs::router())
        .with_state(state)
}
