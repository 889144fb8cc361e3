//! Retry Scheduler: capped backoff per resource.
//!
//! Attempt `n` (0-based) waits `backoff[n]`, reusing the last entry once the
//! table runs out. After `max_attempts` scheduled retries the next failure
//! abandons the resource for the rest of the session.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub backoff: Vec<Duration>,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: vec![
                Duration::from_secs(30),
                Duration::from_secs(120),
                Duration::from_secs(600),
            ],
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt_count: u32) -> Duration {
        self.backoff
            .get(attempt_count as usize)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryState {
    pub attempt_count: u32,
    /// Set between a failure and the retry being dispatched.
    pub next_retry_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Scheduled {
        attempt_count: u32,
        delay: Duration,
        at: Instant,
    },
    Abandoned {
        attempts: u32,
    },
}

#[derive(Debug, Default)]
pub struct RetryScheduler {
    policy: RetryPolicy,
    entries: HashMap<String, RetryState>,
}

impl RetryScheduler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
        }
    }

    /// Books the next retry for `resource_id`, or abandons it once exhausted.
    pub fn schedule(&mut self, resource_id: &str, now: Instant) -> RetryDecision {
        let current = self.entries.get(resource_id).copied().unwrap_or_default();

        if current.attempt_count >= self.policy.max_attempts {
            self.entries.remove(resource_id);
            return RetryDecision::Abandoned {
                attempts: current.attempt_count,
            };
        }

        let delay = self.policy.delay_for(current.attempt_count);
        let at = now + delay;
        let attempt_count = current.attempt_count + 1;
        self.entries.insert(
            resource_id.to_string(),
            RetryState {
                attempt_count,
                next_retry_at: Some(at),
            },
        );

        RetryDecision::Scheduled {
            attempt_count,
            delay,
            at,
        }
    }

    pub fn clear(&mut self, resource_id: &str) {
        self.entries.remove(resource_id);
    }

    pub fn get(&self, resource_id: &str) -> Option<RetryState> {
        self.entries.get(resource_id).copied()
    }

    /// Returns every resource whose retry time has passed, un-setting
    /// `next_retry_at` first so a later tick cannot fire the same retry again.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        let mut due = Vec::new();
        for (resource_id, state) in self.entries.iter_mut() {
            if matches!(state.next_retry_at, Some(at) if at <= now) {
                state.next_retry_at = None;
                due.push(resource_id.clone());
            }
        }
        if !due.is_empty() {
            debug!("{} scheduled retries are due", due.len());
        }
        due
    }
}
