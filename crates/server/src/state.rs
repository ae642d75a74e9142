// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use chartmatch_core::JobManager;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Job lifecycle manager, shared with dispatched analysis tasks.
    pub manager: JobManager,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(manager: JobManager) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            manager,
        })
    }

    /// Seconds since the server started.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
