// crates/core/src/job.rs
//! Job records and the client-facing views derived from them.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Unique identifier for a submitted job. Never reused: ids are v4 UUIDs
/// allocated at upload time.
pub type JobId = Uuid;

/// Lifecycle states of a job.
///
/// `Uploaded → Processing → Completed | Failed`. Re-dispatching a finished
/// job is allowed, so `Completed` and `Failed` can transition back to
/// `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "uploaded",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Asset categories a recording can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Gold,
    Btc,
    UsdCad,
}

impl Category {
    /// All known categories.
    pub const ALL: [Category; 3] = [Category::Gold, Category::Btc, Category::UsdCad];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Gold => "gold",
            Category::Btc => "btc",
            Category::UsdCad => "usdcad",
        }
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gold" => Ok(Category::Gold),
            "btc" => Ok(Category::Btc),
            "usdcad" => Ok(Category::UsdCad),
            _ => Err(CoreError::UnknownCategory(s.to_string())),
        }
    }
}

/// Listing filter: everything, or a single category.
///
/// Parses from the same path segment as [`Category`], with the extra
/// literal `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Option<Category>) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => category == Some(*c),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

/// Parameters accepted when dispatching an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Frames per second to sample from the recording.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Marker color the analyzer looks for. Recorded on the job; the
    /// engine contract itself takes only path, output dir, and fps.
    #[serde(default = "default_detect_color")]
    pub detect_color: String,
    /// Overrides the upload-time category when set.
    #[serde(default)]
    pub category: Option<Category>,
}

fn default_fps() -> f64 {
    1.0
}

fn default_detect_color() -> String {
    "green".to_string()
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            detect_color: default_detect_color(),
            category: None,
        }
    }
}

impl AnalysisParams {
    /// Reject parameter values the analyzer cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(CoreError::InvalidParams(format!(
                "fps must be a positive number, got {}",
                self.fps
            )));
        }
        Ok(())
    }
}

/// One submitted recording and everything known about it.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Original filename, reduced to its final path component.
    pub filename: String,
    /// Where the recording lives on disk.
    pub file_path: PathBuf,
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
    /// Percent complete; meaningful while `Processing`.
    pub progress: u8,
    /// Parameters of the most recent dispatch.
    pub params: Option<AnalysisParams>,
    /// Analyzer output; present exactly when `Completed`.
    pub results: Option<serde_json::Value>,
    /// Failure message; present exactly when `Failed`.
    pub error: Option<String>,
}

impl Job {
    /// Create a freshly-uploaded job record.
    pub fn new(
        id: JobId,
        filename: String,
        file_path: PathBuf,
        category: Option<Category>,
    ) -> Self {
        Self {
            id,
            status: JobStatus::Uploaded,
            filename,
            file_path,
            category,
            created_at: Utc::now(),
            progress: 0,
            params: None,
            results: None,
            error: None,
        }
    }

    /// Full client-facing view of this job.
    pub fn detail(&self) -> JobDetail {
        JobDetail {
            id: self.id,
            status: self.status,
            filename: self.filename.clone(),
            progress: self.progress,
            category: self.category,
            results: self.results.clone(),
            error: self.error.clone(),
        }
    }

    /// Listing row for this job.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            status: self.status,
            filename: self.filename.clone(),
            created_at: self.created_at,
            category: self.category,
        }
    }
}

/// Full status of one job as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct JobDetail {
    pub id: JobId,
    pub status: JobStatus,
    pub filename: String,
    pub progress: u8,
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One row of a job listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub status: JobStatus,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub category: Option<Category>,
}
