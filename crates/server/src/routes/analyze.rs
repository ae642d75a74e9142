// crates/server/src/routes/analyze.rs
//! Analysis dispatch endpoint.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use chartmatch_core::{AnalysisParams, Category, JobId, JobStatus};

use crate::error::{parse_job_id, ApiResult};
use crate::state::AppState;

/// Response for a dispatched analysis.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct AnalyzeResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub category: Option<Category>,
}

/// POST /api/analyze/{id} - Kick off analysis for an uploaded job.
///
/// Returns as soon as the job is marked processing; callers poll
/// GET /api/job/{id} for the outcome.
pub async fn start_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(params): Json<AnalysisParams>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let id = parse_job_id(&id)?;
    let job = state.manager.start_analysis(id, params).await?;

    Ok(Json(AnalyzeResponse {
        job_id: job.id,
        status: job.status,
        category: job.category,
    }))
}

/// Create the analyze routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/analyze/{id}", post(start_analysis))
}
