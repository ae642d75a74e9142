// crates/core/src/engine/mod.rs
//! Analysis engine contract.
//!
//! The comparator that actually inspects frames is an external program.
//! This module defines the seam the job manager drives it through, so the
//! lifecycle never depends on how frames get compared.

mod cli;

pub use cli::{CliAnalyzer, ANALYZER_ENV, DEFAULT_ANALYZER};

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::progress::ProgressReporter;

/// One analysis invocation: which recording, where artifacts go, and how
/// densely to sample frames.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub fps: f64,
}

/// Errors from an analysis engine run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to spawn analyzer: {0}")]
    SpawnFailed(String),

    #[error("Analyzer failed: {0}")]
    AnalyzerFailed(String),

    #[error("Failed to parse analyzer output: {0}")]
    ParseFailed(String),
}

/// Seam between the job lifecycle and the frame comparator.
///
/// Implementations include:
/// - [`CliAnalyzer`] - spawns the external analyzer binary
/// - Test doubles that script success, failure, or progress sequences
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Run one analysis to completion, reporting percent progress along
    /// the way. The returned value is the result document exactly as the
    /// engine produced it.
    async fn run(
        &self,
        request: AnalysisRequest,
        progress: ProgressReporter,
    ) -> Result<serde_json::Value, EngineError>;

    /// Check the engine is usable (binary installed, reachable, etc.).
    async fn health_check(&self) -> Result<(), EngineError>;

    /// Engine name for logging/display.
    fn name(&self) -> &str;
}
