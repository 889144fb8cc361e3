use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::resume::ResumeSummary;
use crate::regeneration::{CompletionEvent, CompletionListener};

/// In-memory resume list, keyed by resume id.
#[derive(Default)]
pub struct ResumeCache {
    resumes: RwLock<HashMap<String, ResumeSummary>>,
}

impl ResumeCache {
    /// Replaces the whole list with a fresh backend listing.
    pub fn replace_all(&self, resumes: Vec<ResumeSummary>) {
        let fresh = resumes.into_iter().map(|r| (r.id.clone(), r)).collect();
        *self.resumes.write().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    pub fn get(&self, id: &str) -> Option<ResumeSummary> {
        self.resumes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// All cached resumes, most recently updated first.
    pub fn snapshot(&self) -> Vec<ResumeSummary> {
        let mut resumes: Vec<_> = self
            .resumes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        resumes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        resumes
    }

    /// Overwrites the two thumbnail fields of one resume. Nothing else changes,
    /// so merges for different resumes commute.
    pub fn apply_completion(&self, event: &CompletionEvent) {
        let mut resumes = self
            .resumes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(resume) = resumes.get_mut(&event.resource_id) else {
            debug!(
                "Completed thumbnail for {} is not in the cache, ignoring",
                event.resource_id
            );
            return;
        };

        match parse_timestamp(&event.generated_at) {
            Some(generated_at) => resume.thumbnail_generated_at = Some(generated_at),
            None => warn!(
                "Unparseable thumbnail timestamp {:?} for {}",
                event.generated_at, event.resource_id
            ),
        }
        resume.thumbnail_url = Some(event.artifact_ref.clone());
    }
}

impl CompletionListener for ResumeCache {
    fn on_completion(&self, event: &CompletionEvent) {
        self.apply_completion(event);
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
