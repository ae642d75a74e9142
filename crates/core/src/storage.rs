// crates/core/src/storage.rs
//! On-disk layout for uploads, analysis artifacts, and frontend assets.
//!
//! Single source of truth for every path the service touches. Layout under
//! the data root:
//! - `uploads/<job-id>/<filename>` - the submitted recording
//! - `results/<job-id>/` - analyzer artifacts, `results.json` on success
//! - `results/<category>/` - per-category folders the analyzer can file into
//! - `static/` - frontend assets

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::job::{Category, JobId};

/// Environment variable naming the data root. Defaults to the working
/// directory when unset.
pub const DATA_DIR_ENV: &str = "CHARTMATCH_DATA_DIR";

/// Resolves every path the service reads or writes.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    uploads_root: PathBuf,
    results_root: PathBuf,
    static_root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            uploads_root: root.join("uploads"),
            results_root: root.join("results"),
            static_root: root.join("static"),
        }
    }

    /// Layout rooted at `CHARTMATCH_DATA_DIR`, falling back to the working
    /// directory.
    pub fn from_env() -> Self {
        let root = std::env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        Self::new(root)
    }

    pub fn uploads_root(&self) -> &Path {
        &self.uploads_root
    }

    pub fn results_root(&self) -> &Path {
        &self.results_root
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    /// Directory holding the uploaded recording for `id`.
    pub fn upload_dir(&self, id: &JobId) -> PathBuf {
        self.uploads_root.join(id.to_string())
    }

    /// Directory the analyzer writes artifacts into for `id`.
    pub fn result_dir(&self, id: &JobId) -> PathBuf {
        self.results_root.join(id.to_string())
    }

    /// Final results document for `id`.
    pub fn results_file(&self, id: &JobId) -> PathBuf {
        self.result_dir(id).join("results.json")
    }

    /// Create the top-level directories, including one artifact folder per
    /// category.
    pub async fn ensure_roots(&self) -> Result<(), CoreError> {
        for dir in [&self.uploads_root, &self.results_root, &self.static_root] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| CoreError::storage(dir.clone(), e))?;
        }
        for category in Category::ALL {
            let dir = self.results_root.join(category.as_str());
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| CoreError::storage(dir, e))?;
        }
        Ok(())
    }

    /// Remove both per-job directories, tolerating ones that never existed.
    ///
    /// Failures are logged and swallowed: callers run this after the record
    /// is already gone, and an orphaned directory beats a half-deleted job.
    pub async fn remove_job_dirs(&self, id: &JobId) {
        for dir in [self.upload_dir(id), self.result_dir(id)] {
            if let Err(e) = remove_dir_if_present(&dir).await {
                tracing::warn!(path = %dir.display(), error = %e, "failed to remove job directory");
            }
        }
    }
}

async fn remove_dir_if_present(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
