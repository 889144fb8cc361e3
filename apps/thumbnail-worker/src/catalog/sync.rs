use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cache::ResumeCache;
use super::scan::StaleScanner;
use crate::backend::{SessionProvider, ThumbnailBackend};
use crate::regeneration::RegenerationTracker;

/// Dependencies of the resume sync loop.
pub struct ResumeSync {
    pub backend: Arc<dyn ThumbnailBackend>,
    pub sessions: Arc<dyn SessionProvider>,
    pub cache: Arc<ResumeCache>,
    pub tracker: RegenerationTracker,
}

/// Refreshes the cached resume list every `interval` (first pass immediately)
/// and triggers regeneration for stale thumbnails, until `shutdown` fires.
pub async fn run_resume_sync(sync: ResumeSync, interval: Duration, shutdown: CancellationToken) {
    let mut scanner = StaleScanner::default();
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => sync_once(&sync, &mut scanner).await,
        }
    }
    debug!("Resume sync stopped");
}

async fn sync_once(sync: &ResumeSync, scanner: &mut StaleScanner) {
    let Some(session) = sync.sessions.current_session().await else {
        debug!("No active session, skipping resume sync");
        return;
    };

    match sync.backend.list_resumes(&session).await {
        Ok(resumes) => {
            debug!("Loaded {} resumes", resumes.len());
            sync.cache.replace_all(resumes);
        }
        Err(e) => {
            warn!("Failed to refresh resume list: {e}");
            return;
        }
    }

    let stale = scanner.select(&sync.cache.snapshot(), &sync.tracker.generating_ids());
    if stale.is_empty() {
        return;
    }

    info!("Auto-triggering thumbnail regeneration for {} stale resumes", stale.len());
    for resume_id in stale {
        let tracker = sync.tracker.clone();
        tokio::spawn(async move { tracker.trigger(&resume_id).await });
    }
}
