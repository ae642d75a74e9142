// crates/server/src/test_support.rs
//! Shared fixtures for route and app tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use tempfile::TempDir;

use chartmatch_core::{
    AnalysisEngine, AnalysisRequest, Category, EngineError, Job, JobManager, ProgressReporter,
    StorageLayout,
};

use crate::state::AppState;

/// Engine double that reports full progress and returns a canned document.
pub struct StubEngine {
    results: serde_json::Value,
}

impl StubEngine {
    pub fn new() -> Self {
        Self {
            results: serde_json::json!({ "bestMatch": "frame_0", "score": 0.97 }),
        }
    }
}

#[async_trait]
impl AnalysisEngine for StubEngine {
    async fn run(
        &self,
        _request: AnalysisRequest,
        progress: ProgressReporter,
    ) -> Result<serde_json::Value, EngineError> {
        progress.report(100);
        Ok(self.results.clone())
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Fresh state over a temp data dir. Keep the `TempDir` alive for the test.
pub fn test_state() -> (Arc<AppState>, TempDir) {
    let dir = TempDir::new().unwrap();
    let manager = JobManager::new(StorageLayout::new(dir.path()), Arc::new(StubEngine::new()));
    (AppState::new(manager), dir)
}

/// Put one recording into the store without going through HTTP.
pub async fn upload_fixture(
    state: &Arc<AppState>,
    filename: &str,
    category: Option<Category>,
) -> Job {
    state
        .manager
        .create_upload(filename, category, b"test frames")
        .await
        .unwrap()
}

/// A multipart POST with a `file` part and an optional `category` part.
pub fn multipart_request(
    uri: &str,
    filename: &str,
    category: Option<&str>,
    data: &[u8],
) -> Request<Body> {
    let boundary = "----chartmatch-test-boundary";
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

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A request with a JSON body.
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
