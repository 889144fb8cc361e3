//! Poller: watches in-flight jobs until their artifact timestamp moves.
//!
//! Runs only while the registry is non-empty. Each tick checks every tracked
//! job concurrently and applies the results once all checks have resolved.

use futures::future::join_all;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::notifier::CompletionEvent;
use super::registry::{JobPhase, TrackedJob};
use super::tracker::RegenerationTracker;
use crate::backend::{ArtifactMetadata, Session};

#[derive(Debug, PartialEq, Eq)]
enum PollVerdict {
    Pending,
    Completed {
        generated_at: String,
        artifact_ref: String,
    },
    TimedOut,
    Errored,
}

struct PollOutcome {
    resource_id: String,
    attempt: u64,
    verdict: PollVerdict,
}

impl RegenerationTracker {
    pub(super) async fn run_poller(self) {
        let period = self.inner.config.poll_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("Thumbnail poller started");

        loop {
            tokio::select! {
                _ = self.inner.shutdown.cancelled() => {
                    self.with_state(|state| state.poller_active = false);
                    break;
                }
                _ = ticker.tick() => {}
            }

            if self.stop_poller_if_idle() {
                break;
            }
            self.poll_once().await;
            if self.stop_poller_if_idle() {
                break;
            }
        }

        debug!("Thumbnail poller stopped");
    }

    fn stop_poller_if_idle(&self) -> bool {
        self.with_state(|state| {
            if state.registry.is_empty() {
                state.poller_active = false;
                true
            } else {
                false
            }
        })
    }

    /// One poll tick over every tracked job.
    pub(super) async fn poll_once(&self) {
        let jobs = self.with_state(|state| state.registry.snapshot());
        if jobs.is_empty() {
            return;
        }

        // Without a session the whole tick is skipped, timeout checks included.
        let Some(session) = self.inner.sessions.current_session().await else {
            debug!(
                "No active session, skipping thumbnail poll for {} jobs",
                jobs.len()
            );
            return;
        };

        let now = Instant::now();
        let checks = jobs
            .into_iter()
            .map(|(resource_id, job)| self.check_job(resource_id, job, now, &session));
        let outcomes = join_all(checks).await;

        for outcome in outcomes {
            let PollOutcome {
                resource_id,
                attempt,
                verdict,
            } = outcome;

            match verdict {
                PollVerdict::Pending => {}
                PollVerdict::Completed {
                    generated_at,
                    artifact_ref,
                } => {
                    let finished = self.with_state(|state| {
                        let finished = state.registry.finish(&resource_id, attempt);
                        if finished {
                            state.retries.clear(&resource_id);
                        }
                        finished
                    });
                    if !finished {
                        continue;
                    }
                    info!("Thumbnail for {resource_id} regenerated at {generated_at}");
                    self.inner.notifier.notify(&CompletionEvent {
                        resource_id,
                        generated_at,
                        artifact_ref,
                    });
                }
                PollVerdict::TimedOut => {
                    warn!("Thumbnail regeneration for {resource_id} timed out");
                    self.fail_attempt(&resource_id, attempt);
                }
                PollVerdict::Errored => self.fail_attempt(&resource_id, attempt),
            }
        }
    }

    async fn check_job(
        &self,
        resource_id: String,
        job: TrackedJob,
        now: Instant,
        session: &Session,
    ) -> PollOutcome {
        let verdict = if now.duration_since(job.started_at) > self.inner.config.attempt_timeout {
            PollVerdict::TimedOut
        } else {
            match job.phase {
                // The start request has not returned yet; nothing to compare against.
                JobPhase::Dispatching => PollVerdict::Pending,
                JobPhase::Polling { baseline } => {
                    match self.inner.backend.fetch_artifact(&resource_id, session).await {
                        Ok(metadata) => detect_completion(baseline.as_deref(), metadata),
                        Err(e) => {
                            warn!("Thumbnail poll for {resource_id} failed: {e}");
                            PollVerdict::Errored
                        }
                    }
                }
            }
        };

        PollOutcome {
            resource_id,
            attempt: job.attempt,
            verdict,
        }
    }
}

/// Complete only when a timestamp is present and differs from the baseline.
fn detect_completion(baseline: Option<&str>, metadata: ArtifactMetadata) -> PollVerdict {
    match metadata.generated_at {
        Some(generated_at) if baseline != Some(generated_at.as_str()) => PollVerdict::Completed {
            generated_at,
            artifact_ref: metadata.artifact_ref,
        },
        _ => PollVerdict::Pending,
    }
}
