// Thumbnail regeneration core.
// Asks the backend to re-render a stale thumbnail, polls until the artifact
// timestamp moves past its baseline, retries with capped backoff, and notifies
// the registered listener exactly once per completed regeneration.
// All tracking state lives in one `RegenerationTracker`; locks are never held
// across an await, so every map mutation is atomic with respect to the others.

pub mod notifier;
mod poller;
pub mod registry;
pub mod retry;
pub mod tracker;
mod trigger;


use std::time::Duration;

pub use notifier::{CompletionEvent, CompletionListener};
pub use retry::{RetryPolicy, RetryState};
pub use tracker::RegenerationTracker;

/// Timing constants for the regeneration lifecycle.
#[derive(Debug, Clone)]
pub struct RegenerationConfig {
    /// Period of the completion poller while any job is in flight.
    pub poll_interval: Duration,
    /// An attempt with no observed completion after this long is retried.
    pub attempt_timeout: Duration,
    /// Period of the retry ticker, which runs for the whole session.
    pub retry_tick: Duration,
    pub retry: RetryPolicy,
}

impl Default for RegenerationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(60),
            retry_tick: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}
