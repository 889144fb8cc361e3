//! Trigger Controller: dispatches a regeneration and routes the backend's answer.

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::retry::RetryDecision;
use super::tracker::RegenerationTracker;
use crate::backend::StartOutcome;

impl RegenerationTracker {
    /// Requests a fresh thumbnail for `resource_id`.
    ///
    /// Safe to call redundantly: while an attempt for the same resource is in
    /// flight, further calls return immediately without contacting the backend.
    /// Failures are absorbed here and become retries or silent abandonment.
    pub async fn trigger(&self, resource_id: &str) {
        let resource_id = resource_id.trim();
        if resource_id.is_empty() {
            warn!("Ignoring regeneration trigger with an empty resource id");
            return;
        }
        if self.is_shut_down() {
            debug!("Tracker shut down, ignoring trigger for {resource_id}");
            return;
        }

        // Membership check and insertion happen under one lock.
        let attempt = self.with_state(|state| {
            if state.registry.contains(resource_id) {
                return None;
            }
            let attempt = state.next_attempt();
            state.registry.begin(resource_id, attempt, Instant::now());
            self.spawn_poller_if_needed(state);
            Some(attempt)
        });
        let Some(attempt) = attempt else {
            debug!("Regeneration already in flight for {resource_id}, skipping");
            return;
        };

        info!("Dispatching thumbnail regeneration for {resource_id} (attempt #{attempt})");

        let session = self.inner.sessions.current_session().await;
        let response = self
            .inner
            .backend
            .start_regeneration(resource_id, session.as_ref())
            .await;

        match response {
            Ok(StartOutcome::Accepted { generated_at }) => {
                let tracked = self.with_state(|state| {
                    let tracked = state
                        .registry
                        .record_baseline(resource_id, attempt, generated_at.clone());
                    if tracked {
                        state.retries.clear(resource_id);
                    }
                    tracked
                });
                if tracked {
                    debug!(
                        "Regeneration accepted for {resource_id}, baseline {:?}",
                        generated_at
                    );
                } else {
                    debug!("Start response for superseded attempt #{attempt} of {resource_id} dropped");
                }
            }
            Ok(StartOutcome::Rejected {
                retryable: true,
                error,
            }) => {
                warn!("Regeneration for {resource_id} rejected (retryable): {error}");
                self.fail_attempt(resource_id, attempt);
            }
            Ok(StartOutcome::Rejected {
                retryable: false,
                error,
            }) => {
                warn!("Regeneration for {resource_id} rejected permanently: {error}");
                self.with_state(|state| {
                    if state.registry.finish(resource_id, attempt) {
                        state.retries.clear(resource_id);
                    }
                });
            }
            Err(e) => {
                warn!("Start regeneration request for {resource_id} failed: {e}");
                self.fail_attempt(resource_id, attempt);
            }
        }
    }

    /// Ends `attempt` and books a retry, unless a newer attempt owns the resource.
    pub(super) fn fail_attempt(&self, resource_id: &str, attempt: u64) {
        let decision = self.with_state(|state| {
            state
                .registry
                .finish(resource_id, attempt)
                .then(|| state.retries.schedule(resource_id, Instant::now()))
        });

        match decision {
            Some(RetryDecision::Scheduled {
                attempt_count,
                delay,
                ..
            }) => info!(
                "Retry #{attempt_count} for {resource_id} scheduled in {}s",
                delay.as_secs()
            ),
            Some(RetryDecision::Abandoned { attempts }) => warn!(
                "Giving up on thumbnail regeneration for {resource_id} after {attempts} retries"
            ),
            None => debug!("Failure for superseded attempt #{attempt} of {resource_id} ignored"),
        }
    }
}
