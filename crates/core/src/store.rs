// crates/core/src/store.rs
//! In-memory job table shared between request handlers and analysis tasks.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::job::{Job, JobId};

/// Thread-safe map of every known job.
///
/// Uses `std::sync::RwLock` (not `tokio::sync::RwLock`): every operation
/// copies in or out under the guard and nothing holds it across an
/// `.await`. Multi-field transitions go through [`JobStore::update`], so
/// readers only ever see a record before or after a transition, never
/// between fields.
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a freshly-created job.
    pub fn insert(&self, job: Job) {
        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(job.id, job);
            }
            Err(e) => tracing::error!("RwLock poisoned writing jobs map: {e}"),
        }
    }

    /// Snapshot of a single job.
    pub fn get(&self, id: &JobId) -> Option<Job> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(id).cloned(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        }
    }

    /// Apply `f` to the job under the write lock.
    ///
    /// Returns `false` when the record no longer exists; the mutation is
    /// dropped, which is exactly what a worker finishing after a delete
    /// wants.
    pub fn update<F>(&self, id: &JobId, f: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        match self.jobs.write() {
            Ok(mut jobs) => match jobs.get_mut(id) {
                Some(job) => {
                    f(job);
                    true
                }
                None => false,
            },
            Err(e) => {
                tracing::error!("RwLock poisoned updating jobs map: {e}");
                false
            }
        }
    }

    /// Remove a record, returning it if it was present.
    pub fn remove(&self, id: &JobId) -> Option<Job> {
        match self.jobs.write() {
            Ok(mut jobs) => jobs.remove(id),
            Err(e) => {
                tracing::error!("RwLock poisoned removing from jobs map: {e}");
                None
            }
        }
    }

    /// Consistent point-in-time copy of every job.
    pub fn snapshot(&self) -> Vec<Job> {
        match self.jobs.read() {
            Ok(jobs) => jobs.values().cloned().collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                Vec::new()
            }
        }
    }

    pub fn contains(&self, id: &JobId) -> bool {
        match self.jobs.read() {
            Ok(jobs) => jobs.contains_key(id),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.jobs.read() {
            Ok(jobs) => jobs.len(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
