// crates/core/src/manager.rs
//! Job lifecycle manager: upload, dispatch, query, delete, sweep.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::engine::{AnalysisEngine, AnalysisRequest};
use crate::error::CoreError;
use crate::job::{
    AnalysisParams, Category, CategoryFilter, Job, JobDetail, JobId, JobStatus, JobSummary,
};
use crate::progress::ProgressReporter;
use crate::storage::StorageLayout;
use crate::store::JobStore;

/// File extensions accepted for upload, lowercase.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// How long a job is kept before the sweeper removes it.
pub const RETENTION_HOURS: i64 = 24;

/// Coordinates the whole job lifecycle over the shared store.
///
/// Cloning is cheap; every clone shares the same store and engine, which
/// is how dispatched background tasks reach back in to commit outcomes.
#[derive(Clone)]
pub struct JobManager {
    store: Arc<JobStore>,
    storage: StorageLayout,
    engine: Arc<dyn AnalysisEngine>,
}

impl JobManager {
    pub fn new(storage: StorageLayout, engine: Arc<dyn AnalysisEngine>) -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            storage,
            engine,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn storage(&self) -> &StorageLayout {
        &self.storage
    }

    /// Accept an uploaded recording and create its job record.
    ///
    /// The extension is checked before anything touches the disk, and a
    /// failed write leaves neither a record nor a directory behind.
    pub async fn create_upload(
        &self,
        filename: &str,
        category: Option<Category>,
        data: &[u8],
    ) -> Result<Job, CoreError> {
        let filename = sanitize_filename(filename)?;
        if !has_supported_extension(&filename) {
            return Err(CoreError::UnsupportedFormat(filename));
        }

        let id = Uuid::new_v4();
        let dir = self.storage.upload_dir(&id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CoreError::storage(dir.clone(), e))?;

        let file_path = dir.join(&filename);
        if let Err(e) = tokio::fs::write(&file_path, data).await {
            // Failed write: take the directory we just made back out.
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(CoreError::storage(file_path, e));
        }

        let job = Job::new(id, filename, file_path, category);
        self.store.insert(job.clone());
        tracing::info!(job_id = %id, filename = %job.filename, "upload accepted");
        Ok(job)
    }

    /// Move a job into `Processing` and dispatch its analysis task.
    ///
    /// Validation happens before any mutation, so a bad request leaves the
    /// record untouched. Re-dispatching a finished job is allowed; the
    /// transition clears the previous outcome in the same atomic update
    /// that flips the status.
    pub async fn start_analysis(
        &self,
        id: JobId,
        params: AnalysisParams,
    ) -> Result<Job, CoreError> {
        params.validate()?;

        let job = self.store.get(&id).ok_or(CoreError::NotFound(id))?;

        let result_dir = self.storage.result_dir(&id);
        tokio::fs::create_dir_all(&result_dir)
            .await
            .map_err(|e| CoreError::storage(result_dir.clone(), e))?;

        let record = params.clone();
        let updated = self.store.update(&id, move |job| {
            job.status = JobStatus::Processing;
            job.progress = 0;
            if record.category.is_some() {
                job.category = record.category;
            }
            job.params = Some(record);
            job.results = None;
            job.error = None;
        });
        if !updated {
            // Deleted between the lookup and the transition.
            return Err(CoreError::NotFound(id));
        }

        let request = AnalysisRequest {
            input_path: job.file_path,
            output_dir: result_dir,
            fps: params.fps,
        };
        let manager = self.clone();
        tokio::spawn(async move {
            manager.execute(id, request).await;
        });
        tracing::info!(job_id = %id, fps = params.fps, "analysis dispatched");

        self.store.get(&id).ok_or(CoreError::NotFound(id))
    }

    /// The background half of a dispatched analysis.
    ///
    /// Every outcome lands in the store through a single atomic update.
    /// If the job was deleted or swept mid-run, the outcome is dropped.
    async fn execute(self, id: JobId, request: AnalysisRequest) {
        let store = Arc::clone(&self.store);
        let progress = ProgressReporter::new(move |percent| {
            if !store.update(&id, |job| job.progress = percent) {
                tracing::debug!(job_id = %id, "progress report for missing job dropped");
            }
        });

        match self.engine.run(request, progress).await {
            Ok(results) => self.commit_success(id, results).await,
            Err(e) => self.commit_failure(id, e.to_string()),
        }
    }

    /// Persist the result document and commit `Completed`.
    ///
    /// The category is stamped into the document first so clients fetching
    /// `results.json` directly see the same thing the API returns. A failed
    /// write turns the whole run into a failure.
    async fn commit_success(&self, id: JobId, mut results: serde_json::Value) {
        let category = self.store.get(&id).and_then(|job| job.category);
        if let (Some(category), Some(map)) = (category, results.as_object_mut()) {
            map.insert(
                "category".to_string(),
                serde_json::Value::String(category.as_str().to_string()),
            );
        }

        let path = self.storage.results_file(&id);
        let payload = match serde_json::to_vec_pretty(&results) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.commit_failure(id, format!("failed to encode results: {e}"));
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&path, payload).await {
            self.commit_failure(id, format!("failed to write {}: {e}", path.display()));
            return;
        }

        let committed = self.store.update(&id, move |job| {
            job.status = JobStatus::Completed;
            job.results = Some(results);
            job.progress = 100;
        });
        if committed {
            tracing::info!(job_id = %id, "analysis completed");
        } else {
            tracing::debug!(job_id = %id, "completion for deleted job dropped");
        }
    }

    fn commit_failure(&self, id: JobId, message: String) {
        let record = message.clone();
        let committed = self.store.update(&id, move |job| {
            job.status = JobStatus::Failed;
            job.error = Some(record);
        });
        if committed {
            tracing::error!(job_id = %id, error = %message, "analysis failed");
        } else {
            tracing::debug!(job_id = %id, "failure for deleted job dropped");
        }
    }

    /// Full view of one job.
    pub fn get_job(&self, id: JobId) -> Result<JobDetail, CoreError> {
        self.store
            .get(&id)
            .map(|job| job.detail())
            .ok_or(CoreError::NotFound(id))
    }

    /// Summaries of all jobs matching `filter`, newest first.
    pub fn list_jobs(&self, filter: CategoryFilter) -> Vec<JobSummary> {
        let mut jobs: Vec<Job> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|job| filter.matches(job.category))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.into_iter().map(|job| job.summary()).collect()
    }

    /// Remove a job and its directories.
    ///
    /// The record goes first; directory removal is best-effort, so a disk
    /// hiccup can orphan files but never leave a half-alive job.
    pub async fn delete_job(&self, id: JobId) -> Result<(), CoreError> {
        if self.store.remove(&id).is_none() {
            return Err(CoreError::NotFound(id));
        }
        self.storage.remove_job_dirs(&id).await;
        tracing::info!(job_id = %id, "job deleted");
        Ok(())
    }

    /// Remove every job older than `window`, measured against `now`.
    ///
    /// Age is the only criterion: a job still `Processing` past the window
    /// is removed too, and its worker's final commit then drops silently.
    /// Returns how many records this call actually removed, so a sweep
    /// racing a delete never double-counts.
    pub async fn sweep_at(&self, now: DateTime<Utc>, window: Duration) -> usize {
        let expired: Vec<JobId> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|job| now - job.created_at > window)
            .map(|job| job.id)
            .collect();

        let mut removed = 0;
        for id in expired {
            if self.store.remove(&id).is_some() {
                self.storage.remove_job_dirs(&id).await;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, "swept expired jobs");
        }
        removed
    }

    /// Sweep with the default retention window.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now(), Duration::hours(RETENTION_HOURS))
            .await
    }
}

/// Reduce a client-supplied filename to its final path component.
fn sanitize_filename(filename: &str) -> Result<String, CoreError> {
    match Path::new(filename).file_name().and_then(|n| n.to_str()) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(CoreError::UnsupportedFormat(filename.to_string())),
    }
}

/// Case-insensitive check against the supported extension list. A name
/// with no dot has no extension.
fn has_supported_extension(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}
