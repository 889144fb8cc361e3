//! Stale auto-scan: picks which listed resumes need a fresh thumbnail.
//!
//! Each resume is auto-triggered at most once per content version
//! (`updated_at`). A resource abandoned after exhausting its retries is only
//! picked up again once the user edits it and `updated_at` moves.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::models::resume::ResumeSummary;

#[derive(Debug, Default)]
pub struct StaleScanner {
    triggered: HashMap<String, DateTime<Utc>>,
}

impl StaleScanner {
    /// Returns the resume ids to trigger, recording them as triggered.
    pub fn select(&mut self, resumes: &[ResumeSummary], generating: &BTreeSet<String>) -> Vec<String> {
        let mut selected = Vec::new();
        for resume in resumes.iter().filter(|r| r.is_stale()) {
            if generating.contains(&resume.id) {
                continue;
            }
            if self.triggered.get(&resume.id) == Some(&resume.updated_at) {
                continue;
            }
            self.triggered.insert(resume.id.clone(), resume.updated_at);
            selected.push(resume.id.clone());
        }
        selected
    }
}
