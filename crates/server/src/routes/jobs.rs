// crates/server/src/routes/jobs.rs
//! Job inspection and lifecycle routes.
//!
//! - GET /job/{id} - Full view of one job, including results or error
//! - GET /jobs - List every job, newest first
//! - GET /jobs/category/{category} - List jobs for one category
//! - DELETE /job/{id} - Remove a job and its files
//! - GET /cleanup - Sweep jobs past the retention window

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use chartmatch_core::{CategoryFilter, JobDetail, JobId, JobSummary};

use crate::error::{parse_job_id, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct DeleteResponse {
    pub status: String,
    pub job_id: JobId,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CleanupResponse {
    pub removed: usize,
}

/// GET /api/job/{id} - Full view of one job.
async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobDetail>> {
    let id = parse_job_id(&id)?;
    let detail = state.manager.get_job(id)?;
    Ok(Json(detail))
}

/// GET /api/jobs - List every job, newest first.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<JobListResponse> {
    Json(JobListResponse {
        jobs: state.manager.list_jobs(CategoryFilter::All),
    })
}

/// GET /api/jobs/category/{category} - List jobs for one category.
///
/// `all` is accepted as a category name and matches every job.
async fn list_jobs_by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> ApiResult<Json<JobListResponse>> {
    let filter = category.parse::<CategoryFilter>()?;
    Ok(Json(JobListResponse {
        jobs: state.manager.list_jobs(filter),
    }))
}

/// DELETE /api/job/{id} - Remove a job and its files.
async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = parse_job_id(&id)?;
    state.manager.delete_job(id).await?;
    Ok(Json(DeleteResponse {
        status: "deleted".to_string(),
        job_id: id,
    }))
}

/// GET /api/cleanup - Sweep jobs past the retention window.
async fn cleanup(State(state): State<Arc<AppState>>) -> Json<CleanupResponse> {
    let removed = state.manager.sweep().await;
    Json(CleanupResponse { removed })
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/job/{id}", get(get_job).delete(delete_job))
        .route("/jobs", get(list_jobs))
        .route("/jobs/category/{category}", get(list_jobs_by_category))
        .route("/cleanup", get(cleanup))
}
