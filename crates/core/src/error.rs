// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::job::JobId;

/// Errors from the job lifecycle layer.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid analysis parameters: {0}")]
    InvalidParams(String),

    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}
