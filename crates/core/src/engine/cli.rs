// crates/core/src/engine/cli.rs
//! External analyzer engine: spawns the comparator binary and streams its
//! stdout.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;

use super::{AnalysisEngine, AnalysisRequest, EngineError};
use crate::progress::ProgressReporter;

/// Environment variable overriding the analyzer command.
pub const ANALYZER_ENV: &str = "CHARTMATCH_ANALYZER";

/// Default analyzer command, looked up on PATH.
pub const DEFAULT_ANALYZER: &str = "chart-analyzer";

/// Engine that shells out to the frame comparator.
///
/// Invocation: `chart-analyzer --input <file> --output-dir <dir> --fps <n>`.
///
/// Stdout protocol: lines of the form `progress <n>` update the percent
/// complete; the last non-progress line must be the result JSON object.
/// A non-zero exit fails the run with whatever the analyzer wrote to
/// stderr. There is no deadline; a dispatched run goes to completion or
/// failure.
pub struct CliAnalyzer {
    command: String,
}

impl CliAnalyzer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Analyzer named by `CHARTMATCH_ANALYZER`, falling back to
    /// `chart-analyzer`.
    pub fn from_env() -> Self {
        Self::new(std::env::var(ANALYZER_ENV).unwrap_or_else(|_| DEFAULT_ANALYZER.to_string()))
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// Parse a `progress <n>` stdout line into a percent value.
///
/// Malformed or out-of-range values yield `None` and the line falls
/// through to result parsing.
fn parse_progress_line(line: &str) -> Option<u8> {
    let rest = line.strip_prefix("progress ")?;
    rest.trim().parse::<u8>().ok().filter(|p| *p <= 100)
}

fn build_args(request: &AnalysisRequest) -> Vec<String> {
    vec![
        "--input".to_string(),
        request.input_path.display().to_string(),
        "--output-dir".to_string(),
        request.output_dir.display().to_string(),
        "--fps".to_string(),
        request.fps.to_string(),
    ]
}

/// Cap `text` at `max` bytes for a log field without splitting a
/// multi-byte character. Analyzer output is arbitrary; slicing at a raw
/// byte index would panic mid-character.
fn truncate_for_log(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
impl AnalysisEngine for CliAnalyzer {
    async fn run(
        &self,
        request: AnalysisRequest,
        progress: ProgressReporter,
    ) -> Result<serde_json::Value, EngineError> {
        tracing::info!(
            command = %self.command,
            input = %request.input_path.display(),
            fps = request.fps,
            "analyzer: spawning"
        );

        let mut child = TokioCommand::new(&self.command)
            .args(build_args(&request))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| {
                tracing::error!(error = %e, "analyzer: failed to spawn");
                EngineError::SpawnFailed(e.to_string())
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::SpawnFailed("failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::SpawnFailed("failed to capture stderr".to_string()))?;

        // Drain stderr concurrently so a chatty analyzer can't fill the pipe
        // and deadlock against our stdout loop.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            buf
        });

        let mut last_line: Option<String> = None;
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(percent) = parse_progress_line(&line) {
                        progress.report(percent);
                    } else if !line.trim().is_empty() {
                        last_line = Some(line);
                    }
                }
                Ok(None) => break,
                // A non-UTF-8 line is dropped, but keep draining or the
                // child blocks writing into a full pipe.
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    tracing::warn!(error = %e, "analyzer: skipping non-UTF-8 output line");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "analyzer: stdout read failed");
                    break;
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| EngineError::SpawnFailed(format!("failed to wait for analyzer: {e}")))?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            tracing::error!(
                exit_code = ?status.code(),
                stderr = %truncate_for_log(&stderr_text, 500),
                "analyzer: non-zero exit"
            );
            let message = if stderr_text.trim().is_empty() {
                format!("analyzer exited with {status}")
            } else {
                stderr_text.trim().to_string()
            };
            return Err(EngineError::AnalyzerFailed(message));
        }

        let line = last_line.ok_or_else(|| {
            EngineError::ParseFailed("analyzer produced no result line".to_string())
        })?;
        serde_json::from_str(&line).map_err(|e| {
            tracing::warn!(line = %truncate_for_log(&line, 200), "analyzer: non-JSON result line");
            EngineError::ParseFailed(e.to_string())
        })
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        let output = TokioCommand::new(&self.command)
            .arg("--version")
            .output()
            .await
            .map_err(|e| EngineError::SpawnFailed(format!("{} not found: {}", self.command, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(EngineError::AnalyzerFailed(format!(
                "{} --version failed",
                self.command
            )))
        }
    }

    fn name(&self) -> &str {
        "cli-analyzer"
    }
}
