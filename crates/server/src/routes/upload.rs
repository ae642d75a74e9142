// crates/server/src/routes/upload.rs
//! Recording upload endpoint.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use chartmatch_core::{Category, JobId, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Largest accepted upload body. Screen recordings run big.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Response for a successful upload.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct UploadResponse {
    pub job_id: JobId,
    pub filename: String,
    pub status: JobStatus,
    pub category: Option<Category>,
}

/// POST /api/upload - Accept a recording and create its job.
///
/// Multipart fields: `file` (required, keeps its client filename),
/// `category` (optional, one of gold | btc | usdcad).
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut category: Option<Category> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                if filename.is_empty() {
                    return Err(ApiError::BadRequest(
                        "file field has no filename".to_string(),
                    ));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read file: {e}")))?;
                file = Some((filename, data.to_vec()));
            }
            "category" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read category: {e}")))?;
                category = Some(value.parse::<Category>()?);
            }
            _ => {} // ignore unknown fields
        }
    }

    let (filename, data) =
        file.ok_or_else(|| ApiError::BadRequest("missing required 'file' field".to_string()))?;

    let job = state.manager.create_upload(&filename, category, &data).await?;

    Ok(Json(UploadResponse {
        job_id: job.id,
        filename: job.filename,
        status: job.status,
        category: job.category,
    }))
}

/// Create the upload routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/upload",
        post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}
