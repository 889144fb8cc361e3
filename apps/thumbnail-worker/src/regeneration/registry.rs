//! Job Registry: which resources have a regeneration in flight.
//!
//! One entry per resource carries the dispatch time and, once the backend has
//! accepted the request, the baseline timestamp. Keeping both in the same
//! entry means membership, start time and baseline can never drift apart.

use std::collections::{BTreeSet, HashMap};

use tokio::time::Instant;

/// Where a tracked attempt is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPhase {
    /// Start request issued, response not yet received. Never polled.
    Dispatching,
    /// Backend accepted. Complete once the artifact timestamp differs from `baseline`.
    Polling { baseline: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedJob {
    /// Unique per dispatch; results carrying an older attempt are dropped.
    pub attempt: u64,
    pub started_at: Instant,
    pub phase: JobPhase,
}

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<String, TrackedJob>,
}

impl JobRegistry {
    /// Marks `resource_id` as in flight. Returns false if it already was.
    pub fn begin(&mut self, resource_id: &str, attempt: u64, now: Instant) -> bool {
        if self.jobs.contains_key(resource_id) {
            return false;
        }
        self.jobs.insert(
            resource_id.to_string(),
            TrackedJob {
                attempt,
                started_at: now,
                phase: JobPhase::Dispatching,
            },
        );
        true
    }

    /// Records the baseline for a dispatched attempt and moves it to polling.
    /// Returns false if that attempt is no longer tracked.
    pub fn record_baseline(
        &mut self,
        resource_id: &str,
        attempt: u64,
        baseline: Option<String>,
    ) -> bool {
        match self.jobs.get_mut(resource_id) {
            Some(job) if job.attempt == attempt => {
                job.phase = JobPhase::Polling { baseline };
                true
            }
            _ => false,
        }
    }

    /// Removes the entry only if it still belongs to `attempt`.
    pub fn finish(&mut self, resource_id: &str, attempt: u64) -> bool {
        match self.jobs.get(resource_id) {
            Some(job) if job.attempt == attempt => {
                self.jobs.remove(resource_id);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, resource_id: &str) -> bool {
        self.jobs.contains_key(resource_id)
    }

    pub fn get(&self, resource_id: &str) -> Option<&TrackedJob> {
        self.jobs.get(resource_id)
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn ids(&self) -> BTreeSet<String> {
        self.jobs.keys().cloned().collect()
    }

    /// Copy of every entry, taken at the start of a poll tick.
    pub fn snapshot(&self) -> Vec<(String, TrackedJob)> {
        self.jobs
            .iter()
            .map(|(id, job)| (id.clone(), job.clone()))
            .collect()
    }
}
