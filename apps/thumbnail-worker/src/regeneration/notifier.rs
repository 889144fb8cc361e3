//! Completion Notifier: hands finished regenerations to whoever is listening.
//!
//! The listener lives in a replaceable slot that is read at notify time, so a
//! caller may swap it at any point without affecting jobs already in flight.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionEvent {
    pub resource_id: String,
    pub generated_at: String,
    pub artifact_ref: String,
}

pub trait CompletionListener: Send + Sync {
    fn on_completion(&self, event: &CompletionEvent);
}

impl<F> CompletionListener for F
where
    F: Fn(&CompletionEvent) + Send + Sync,
{
    fn on_completion(&self, event: &CompletionEvent) {
        self(event)
    }
}

#[derive(Default)]
pub struct CompletionNotifier {
    listener: RwLock<Option<Arc<dyn CompletionListener>>>,
}

impl CompletionNotifier {
    pub fn set_listener(&self, listener: Arc<dyn CompletionListener>) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Must only be called after the resource has left every tracking map.
    pub fn notify(&self, event: &CompletionEvent) {
        // Clone out of the slot so the listener runs without the lock held.
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match listener {
            Some(listener) => listener.on_completion(event),
            None => debug!(
                "Thumbnail for {} completed with no listener registered",
                event.resource_id
            ),
        }
    }
}
