// crates/server/tests/api_flow.rs
//! End-to-end API tests over the full router, with the analyzer replaced
//! by in-process doubles.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

use chartmatch_core::{
    AnalysisEngine, AnalysisRequest, EngineError, JobManager, ProgressReporter, StorageLayout,
};
use chartmatch_server::{create_app, AppState};

/// Engine double that parks mid-run until the test releases it.
struct StagedEngine {
    reached: Arc<Notify>,
    release: Arc<Notify>,
    results: serde_json::Value,
}

#[async_trait]
impl AnalysisEngine for StagedEngine {
    async fn run(
        &self,
        _request: AnalysisRequest,
        progress: ProgressReporter,
    ) -> Result<serde_json::Value, EngineError> {
        progress.report(50);
        self.reached.notify_one();
        self.release.notified().await;
        Ok(self.results.clone())
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "staged"
    }
}

/// Engine double that fails every run.
struct FailEngine(&'static str);

#[async_trait]
impl AnalysisEngine for FailEngine {
    async fn run(
        &self,
        _request: AnalysisRequest,
        _progress: ProgressReporter,
    ) -> Result<serde_json::Value, EngineError> {
        Err(EngineError::AnalyzerFailed(self.0.to_string()))
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "fail"
    }
}

/// Engine double that succeeds immediately.
struct OkEngine(serde_json::Value);

#[async_trait]
impl AnalysisEngine for OkEngine {
    async fn run(
        &self,
        _request: AnalysisRequest,
        progress: ProgressReporter,
    ) -> Result<serde_json::Value, EngineError> {
        progress.report(100);
        Ok(self.0.clone())
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "ok"
    }
}

fn app_with(engine: Arc<dyn AnalysisEngine>) -> (Router, Arc<AppState>, TempDir) {
    let dir = TempDir::new().unwrap();
    let manager = JobManager::new(StorageLayout::new(dir.path()), engine);
    let state = AppState::new(manager);
    (create_app(state.clone()), state, dir)
}

/// Helper to make a request to the app.
async fn request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = if let Some(json) = body {
        builder = builder.header("content-type", "application/json");
        Body::from(serde_json::to_string(&json).unwrap())
    } else {
        Body::empty()
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Helper to upload a recording through the multipart endpoint.
async fn upload(
    app: Router,
    filename: &str,
    category: Option<&str>,
    data: &[u8],
) -> (StatusCode, serde_json::Value) {
    let boundary = "----chartmatch-it-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    if let Some(category) = category {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"category\"\r\n\r\n{category}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Poll GET /api/job/{id} until the status leaves `processing`.
async fn wait_for_outcome(app: &Router, id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let (status, body) = request(app.clone(), "GET", &format!("/api/job/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        if json["status"] != "processing" {
            return json;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("job {id} never finished");
}

#[tokio::test]
async fn full_analysis_flow() {
    let reached = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let engine = StagedEngine {
        reached: reached.clone(),
        release: release.clone(),
        results: serde_json::json!({ "bestMatch": "frame_12", "score": 0.93 }),
    };
    let (app, _state, _dir) = app_with(Arc::new(engine));

    // Upload a categorized recording.
    let (status, uploaded) = upload(app.clone(), "chart.mp4", Some("gold"), b"frame bytes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(uploaded["status"], "uploaded");
    assert_eq!(uploaded["category"], "gold");
    let id = uploaded["job_id"].as_str().unwrap().to_string();

    // Fresh job: no progress, no outcome.
    let (status, body) = request(app.clone(), "GET", &format!("/api/job/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let detail: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(detail["status"], "uploaded");
    assert_eq!(detail["progress"], 0);
    assert!(detail.get("results").is_none());

    // Dispatch.
    let (status, body) = request(
        app.clone(),
        "POST",
        &format!("/api/analyze/{id}"),
        Some(serde_json::json!({ "fps": 2.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let dispatched: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(dispatched["status"], "processing");

    // Mid-run the job shows partial progress and still no outcome.
    reached.notified().await;
    let (status, body) = request(app.clone(), "GET", &format!("/api/job/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let detail: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(detail["status"], "processing");
    assert_eq!(detail["progress"], 50);
    assert!(detail.get("results").is_none());

    // Let the analyzer finish and wait for the commit.
    release.notify_one();
    let detail = wait_for_outcome(&app, &id).await;
    assert_eq!(detail["status"], "completed");
    assert_eq!(detail["progress"], 100);
    assert_eq!(detail["results"]["bestMatch"], "frame_12");
    assert_eq!(detail["results"]["category"], "gold");
    assert!(detail.get("error").is_none());

    // The result document is fetchable through the static mount.
    let (status, body) = request(
        app.clone(),
        "GET",
        &format!("/results/{id}/results.json"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("frame_12"));
    assert!(body.contains("\"category\""));

    // So is the original upload.
    let (status, body) = request(
        app.clone(),
        "GET",
        &format!("/uploads/{id}/chart.mp4"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "frame bytes");

    // Listings see it under its category.
    let (_, body) = request(app.clone(), "GET", "/api/jobs", None).await;
    let listing: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(listing["jobs"].as_array().unwrap().len(), 1);

    let (_, body) = request(app.clone(), "GET", "/api/jobs/category/gold", None).await;
    let listing: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(listing["jobs"].as_array().unwrap().len(), 1);

    let (_, body) = request(app.clone(), "GET", "/api/jobs/category/btc", None).await;
    let listing: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(listing["jobs"].as_array().unwrap().len(), 0);

    let (status, _) = request(app.clone(), "GET", "/api/jobs/category/eth", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Delete tears the job down; a second delete finds nothing.
    let (status, _) = request(app.clone(), "DELETE", &format!("/api/job/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = request(app.clone(), "GET", &format!("/api/job/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = request(app.clone(), "DELETE", &format!("/api/job/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Nothing left for the sweeper.
    let (status, body) = request(app, "GET", "/api/cleanup", None).await;
    assert_eq!(status, StatusCode::OK);
    let cleaned: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cleaned["removed"], 0);
}

#[tokio::test]
async fn failed_analysis_records_error() {
    let (app, state, _dir) = app_with(Arc::new(FailEngine("no frames decoded")));

    let (_, uploaded) = upload(app.clone(), "chart.mov", None, b"frames").await;
    let id = uploaded["job_id"].as_str().unwrap().to_string();

    let (status, _) = request(
        app.clone(),
        "POST",
        &format!("/api/analyze/{id}"),
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let detail = wait_for_outcome(&app, &id).await;
    assert_eq!(detail["status"], "failed");
    assert!(detail["error"].as_str().unwrap().contains("no frames decoded"));
    assert!(detail.get("results").is_none());

    // No result document was written.
    let job_id = id.parse().unwrap();
    let results_file = state.manager.storage().results_file(&job_id);
    assert!(!results_file.exists());
}

#[tokio::test]
async fn upload_rejects_unsupported_extension() {
    let (app, state, _dir) = app_with(Arc::new(OkEngine(serde_json::json!({}))));

    let (status, body) = upload(app, "notes.txt", None, b"text").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported file format");
    assert!(state.manager.store().is_empty());
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let (app, _state, _dir) = app_with(Arc::new(OkEngine(serde_json::json!({}))));

    let boundary = "----chartmatch-it-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"category\"\r\n\r\ngold\r\n--{boundary}--\r\n"
    );
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ids_map_to_not_found() {
    let (app, _state, _dir) = app_with(Arc::new(OkEngine(serde_json::json!({}))));

    let (status, _) = request(
        app.clone(),
        "GET",
        "/api/job/11111111-2222-3333-4444-555555555555",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // An unparseable id names no job either.
    let (status, _) = request(app.clone(), "GET", "/api/job/garbage", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
        app,
        "POST",
        "/api/analyze/garbage",
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejected_dispatch_leaves_job_uploaded() {
    let (app, _state, _dir) = app_with(Arc::new(OkEngine(serde_json::json!({}))));

    let (_, uploaded) = upload(app.clone(), "chart.mkv", None, b"frames").await;
    let id = uploaded["job_id"].as_str().unwrap().to_string();

    let (status, body) = request(
        app.clone(),
        "POST",
        &format!("/api/analyze/{id}"),
        Some(serde_json::json!({ "fps": -1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(error["error"], "Invalid analysis parameters");

    let (_, body) = request(app, "GET", &format!("/api/job/{id}"), None).await;
    let detail: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(detail["status"], "uploaded");
}

#[tokio::test]
async fn cleanup_removes_expired_jobs_and_files() {
    let (app, state, _dir) = app_with(Arc::new(OkEngine(serde_json::json!({}))));

    let (_, old) = upload(app.clone(), "old.mp4", None, b"frames").await;
    let (_, fresh) = upload(app.clone(), "fresh.mp4", None, b"frames").await;
    let old_id: chartmatch_core::JobId = old["job_id"].as_str().unwrap().parse().unwrap();

    // Age one job past the retention window.
    state.manager.store().update(&old_id, |job| {
        job.created_at = job.created_at - chrono::Duration::hours(25);
    });
    let old_dir = state.manager.storage().upload_dir(&old_id);
    assert!(old_dir.exists());

    let (status, body) = request(app.clone(), "GET", "/api/cleanup", None).await;
    assert_eq!(status, StatusCode::OK);
    let cleaned: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cleaned["removed"], 1);
    assert!(!old_dir.exists());

    let (_, body) = request(app, "GET", "/api/jobs", None).await;
    let listing: serde_json::Value = serde_json::from_str(&body).unwrap();
    let jobs = listing["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], fresh["job_id"]);
}

#[tokio::test]
async fn health_reports_store_size() {
    let (app, _state, _dir) = app_with(Arc::new(OkEngine(serde_json::json!({}))));

    upload(app.clone(), "chart.mp4", None, b"frames").await;

    let (status, body) = request(app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["jobs"], 1);
}
