use std::sync::Arc;

use crate::catalog::ResumeCache;
use crate::regeneration::RegenerationTracker;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub tracker: RegenerationTracker,
    /// Resume list cache; completed regenerations are merged into it.
    pub cache: Arc<ResumeCache>,
}
