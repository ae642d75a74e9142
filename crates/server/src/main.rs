// crates/server/src/main.rs
//! Chartmatch server binary.
//!
//! Prepares the data directories, wires the CLI analyzer into the job
//! manager, and serves the HTTP API until killed.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use chartmatch_core::{AnalysisEngine, CliAnalyzer, JobManager, StorageLayout};
use chartmatch_server::{create_app, AppState};

/// Default port for the server.
const DEFAULT_PORT: u16 = 5000;

/// Get the server port from environment or use default.
fn get_port() -> u16 {
    std::env::var("CHARTMATCH_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,chartmatch_server=info,chartmatch_core=info".into()),
        )
        .init();

    let storage = StorageLayout::from_env();
    storage
        .ensure_roots()
        .await
        .context("failed to prepare data directories")?;

    let analyzer = CliAnalyzer::from_env();
    if let Err(e) = analyzer.health_check().await {
        // Uploads still work without the analyzer; dispatched jobs will fail.
        tracing::warn!(command = analyzer.command(), error = %e, "analyzer not available");
    }

    let manager = JobManager::new(storage, Arc::new(analyzer));
    let state = AppState::new(manager);
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], get_port()));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("chartmatch listening on {addr}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
