// crates/core/src/progress.rs
//! Progress reporting handle handed to analysis engines.

use std::sync::Arc;

/// Callback an engine uses to report percent complete.
///
/// Reports are clamped to 100 and applied last-write-wins; reports for a
/// job that no longer exists are dropped by the store, so an engine can
/// keep calling this after its job was deleted.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn Fn(u8) + Send + Sync>,
}

impl ProgressReporter {
    pub fn new(sink: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Reporter that discards everything. For tests and dry runs.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Record `percent` complete, clamped to 100.
    pub fn report(&self, percent: u8) {
        (self.sink)(percent.min(100));
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProgressReporter")
    }
}
