use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::notifier::{CompletionListener, CompletionNotifier};
use super::registry::JobRegistry;
use super::retry::{RetryScheduler, RetryState};
use super::RegenerationConfig;
use crate::backend::{SessionProvider, ThumbnailBackend};

/// The regeneration controller. Built once at startup and shared by clone;
/// every clone drives the same tracking state.
#[derive(Clone)]
pub struct RegenerationTracker {
    pub(super) inner: Arc<Inner>,
}

pub(super) struct Inner {
    pub(super) backend: Arc<dyn ThumbnailBackend>,
    pub(super) sessions: Arc<dyn SessionProvider>,
    pub(super) config: RegenerationConfig,
    pub(super) notifier: CompletionNotifier,
    pub(super) shutdown: CancellationToken,
    state: Mutex<TrackerState>,
    generating: watch::Sender<BTreeSet<String>>,
}

pub(super) struct TrackerState {
    pub(super) registry: JobRegistry,
    pub(super) retries: RetryScheduler,
    pub(super) poller_active: bool,
    last_attempt: u64,
}

impl TrackerState {
    pub(super) fn next_attempt(&mut self) -> u64 {
        self.last_attempt += 1;
        self.last_attempt
    }
}

impl RegenerationTracker {
    pub fn new(
        backend: Arc<dyn ThumbnailBackend>,
        sessions: Arc<dyn SessionProvider>,
        config: RegenerationConfig,
    ) -> Self {
        let (generating, _) = watch::channel(BTreeSet::new());
        let retries = RetryScheduler::new(config.retry.clone());

        Self {
            inner: Arc::new(Inner {
                backend,
                sessions,
                config,
                notifier: CompletionNotifier::default(),
                shutdown: CancellationToken::new(),
                state: Mutex::new(TrackerState {
                    registry: JobRegistry::default(),
                    retries,
                    poller_active: false,
                    last_attempt: 0,
                }),
                generating,
            }),
        }
    }

    /// Runs `f` under the state lock and republishes the generating set.
    /// Never call this across an await point.
    pub(super) fn with_state<R>(&self, f: impl FnOnce(&mut TrackerState) -> R) -> R {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut *state);

        self.inner.generating.send_if_modified(|published| {
            let current = state.registry.ids();
            if *published == current {
                false
            } else {
                *published = current;
                true
            }
        });

        result
    }

    /// Replaces the completion listener. Takes effect for jobs already in flight.
    pub fn set_completion_listener(&self, listener: Arc<dyn CompletionListener>) {
        self.inner.notifier.set_listener(listener);
    }

    /// Watches the generating set, e.g. to drive loading indicators.
    pub fn subscribe_generating(&self) -> watch::Receiver<BTreeSet<String>> {
        self.inner.generating.subscribe()
    }

    pub fn generating_ids(&self) -> BTreeSet<String> {
        self.with_state(|state| state.registry.ids())
    }

    pub fn is_generating(&self, resource_id: &str) -> bool {
        self.with_state(|state| state.registry.contains(resource_id))
    }

    /// Whether the completion poller task is currently running.
    pub fn is_polling(&self) -> bool {
        self.with_state(|state| state.poller_active)
    }

    pub fn retry_state(&self, resource_id: &str) -> Option<RetryState> {
        self.with_state(|state| state.retries.get(resource_id))
    }

    /// Stops the poller and the retry ticker. In-flight requests are left to
    /// finish but their results no longer schedule anything new.
    pub fn shutdown(&self) {
        info!("Shutting down thumbnail regeneration tracker");
        self.inner.shutdown.cancel();
    }

    pub(super) fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Starts the poller if jobs are tracked and none is running yet.
    pub(super) fn spawn_poller_if_needed(&self, state: &mut TrackerState) {
        if state.poller_active || state.registry.is_empty() {
            return;
        }
        state.poller_active = true;
        let tracker = self.clone();
        tokio::spawn(async move { tracker.run_poller().await });
    }

    /// Spawns the session-long retry ticker. It fires due retries every
    /// `retry_tick` whether or not any job is active.
    pub fn spawn_retry_ticker(&self) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            let period = tracker.inner.config.retry_tick;
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = tracker.inner.shutdown.cancelled() => break,
                    _ = ticker.tick() => tracker.dispatch_due_retries(),
                }
            }
            debug!("Retry ticker stopped");
        })
    }

    fn dispatch_due_retries(&self) {
        let due = self.with_state(|state| state.retries.take_due(Instant::now()));
        for resource_id in due {
            info!("Retrying thumbnail regeneration for {resource_id}");
            let tracker = self.clone();
            tokio::spawn(async move { tracker.trigger(&resource_id).await });
        }
    }
}
