//! Backend seams: the external collaborators the regeneration core talks to.
//!
//! The core never builds HTTP requests itself. It only sees `ThumbnailBackend`
//! and `SessionProvider`, carried as `Arc<dyn ...>` so tests can swap in a
//! scripted backend without touching the tracker.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::resume::ResumeSummary;

pub mod http;

pub use http::HttpBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Authenticated session used for backend reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
}

/// How the backend answered a start-regeneration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Regeneration accepted. `generated_at` is the artifact timestamp in effect
    /// right now; the job is done once a read returns something different.
    Accepted { generated_at: Option<String> },
    /// Regeneration refused. `retryable` decides between retry and abandonment.
    Rejected { retryable: bool, error: String },
}

/// Current artifact state as reported by the read API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub generated_at: Option<String>,
    #[serde(default)]
    pub artifact_ref: String,
}

#[async_trait]
pub trait ThumbnailBackend: Send + Sync {
    /// Asks the backend to re-render the thumbnail for `resource_id`.
    async fn start_regeneration(
        &self,
        resource_id: &str,
        session: Option<&Session>,
    ) -> Result<StartOutcome, BackendError>;

    /// Reads the current artifact metadata for `resource_id`.
    async fn fetch_artifact(
        &self,
        resource_id: &str,
        session: &Session,
    ) -> Result<ArtifactMetadata, BackendError>;

    /// Lists the resumes visible to the session.
    async fn list_resumes(&self, session: &Session) -> Result<Vec<ResumeSummary>, BackendError>;
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the active session, or `None` while signed out.
    async fn current_session(&self) -> Option<Session>;
}

/// Session provider backed by a token fixed at startup.
pub struct StaticSession(Option<Session>);

impl StaticSession {
    pub fn new(access_token: Option<String>) -> Self {
        Self(
            access_token
                .filter(|t| !t.trim().is_empty())
                .map(|access_token| Session { access_token }),
        )
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_session(&self) -> Option<Session> {
        self.0.clone()
    }
}
