//! Scripted backend and session doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{
    ArtifactMetadata, BackendError, Session, SessionProvider, StartOutcome, ThumbnailBackend,
};
use crate::models::resume::ResumeSummary;

/// `Err(status)` steps surface as `BackendError::Api` with that status.
pub type Step<T> = Result<T, u16>;

/// Pops the next step, repeating the last one once the script runs dry.
fn next_sticky<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn api_error(status: u16) -> BackendError {
    BackendError::Api {
        status,
        message: "scripted failure".to_string(),
    }
}

pub fn accepted(generated_at: Option<&str>) -> Step<StartOutcome> {
    Ok(StartOutcome::Accepted {
        generated_at: generated_at.map(str::to_string),
    })
}

pub fn rejected(retryable: bool) -> Step<StartOutcome> {
    Ok(StartOutcome::Rejected {
        retryable,
        error: "scripted rejection".to_string(),
    })
}

pub fn artifact(generated_at: Option<&str>, artifact_ref: &str) -> Step<ArtifactMetadata> {
    Ok(ArtifactMetadata {
        generated_at: generated_at.map(str::to_string),
        artifact_ref: artifact_ref.to_string(),
    })
}

#[derive(Default)]
pub struct MockBackend {
    start_script: Mutex<VecDeque<Step<StartOutcome>>>,
    start_delay: Duration,
    fetch_scripts: Mutex<HashMap<String, VecDeque<Step<ArtifactMetadata>>>>,
    resumes: Mutex<Vec<ResumeSummary>>,
    start_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every start request sleeps this long before answering.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn script_start(&self, steps: Vec<Step<StartOutcome>>) {
        *self.start_script.lock().unwrap() = steps.into();
    }

    pub fn script_fetch(&self, resource_id: &str, steps: Vec<Step<ArtifactMetadata>>) {
        self.fetch_scripts
            .lock()
            .unwrap()
            .insert(resource_id.to_string(), steps.into());
    }

    pub fn set_resumes(&self, resumes: Vec<ResumeSummary>) {
        *self.resumes.lock().unwrap() = resumes;
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThumbnailBackend for MockBackend {
    async fn start_regeneration(
        &self,
        _resource_id: &str,
        _session: Option<&Session>,
    ) -> Result<StartOutcome, BackendError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let step = next_sticky(&mut self.start_script.lock().unwrap())
            .unwrap_or_else(|| accepted(Some("T0")));
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        step.map_err(api_error)
    }

    async fn fetch_artifact(
        &self,
        resource_id: &str,
        _session: &Session,
    ) -> Result<ArtifactMetadata, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .fetch_scripts
            .lock()
            .unwrap()
            .get_mut(resource_id)
            .and_then(next_sticky)
            .unwrap_or_else(|| artifact(None, ""));
        step.map_err(api_error)
    }

    async fn list_resumes(&self, _session: &Session) -> Result<Vec<ResumeSummary>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.resumes.lock().unwrap().clone())
    }
}

pub struct MockSessions {
    session: Mutex<Option<Session>>,
}

impl MockSessions {
    pub fn signed_in() -> Self {
        Self {
            session: Mutex::new(Some(Session {
                access_token: "test-token".to_string(),
            })),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }

    pub fn sign_in(&self) {
        *self.session.lock().unwrap() = Some(Session {
            access_token: "test-token".to_string(),
        });
    }
}

#[async_trait]
impl SessionProvider for MockSessions {
    async fn current_session(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }
}
