//! HTTP backend: the reqwest implementation of `ThumbnailBackend`.
//!
//! Endpoints (relative to `BACKEND_URL`):
//! - `POST resumes/{id}/thumbnail/regenerate` starts a regeneration
//! - `GET resumes/{id}/thumbnail` reads artifact metadata
//! - `GET resumes` lists resumes for the session
//!
//! No retries happen here. Retry policy belongs to the regeneration core.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::debug;

use super::{ArtifactMetadata, BackendError, Session, StartOutcome, ThumbnailBackend};
use crate::models::resume::ResumeSummary;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Wire shape of the start-regeneration response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartResponseBody {
    success: bool,
    generated_at: Option<String>,
    #[serde(default)]
    retryable: bool,
    error: Option<String>,
}

impl From<StartResponseBody> for StartOutcome {
    fn from(body: StartResponseBody) -> Self {
        if body.success {
            StartOutcome::Accepted {
                generated_at: body.generated_at,
            }
        } else {
            StartOutcome::Rejected {
                retryable: body.retryable,
                error: body
                    .error
                    .unwrap_or_else(|| "regeneration rejected".to_string()),
            }
        }
    }
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let base_url =
            Url::parse(base_url).map_err(|e| BackendError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            base_url,
        })
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ThumbnailBackend for HttpBackend {
    async fn start_regeneration(
        &self,
        resource_id: &str,
        session: Option<&Session>,
    ) -> Result<StartOutcome, BackendError> {
        let url = self.endpoint(&["resumes", resource_id, "thumbnail", "regenerate"])?;
        let mut request = self.client.post(url);
        if let Some(session) = session {
            request = request.bearer_auth(&session.access_token);
        }

        let response = request.send().await?;
        let status = response.status();

        // Throttling and server faults are transient whatever the body says.
        if status.as_u16() == 429 || status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        debug!("Start regeneration for {resource_id} returned {status}");

        if status.is_success() {
            let parsed: StartResponseBody = serde_json::from_str(&body)?;
            return Ok(parsed.into());
        }

        Ok(parse_rejection(&body))
    }

    async fn fetch_artifact(
        &self,
        resource_id: &str,
        session: &Session,
    ) -> Result<ArtifactMetadata, BackendError> {
        let url = self.endpoint(&["resumes", resource_id, "thumbnail"])?;
        let response = Self::send(self.client.get(url).bearer_auth(&session.access_token)).await?;
        Ok(response.json().await?)
    }

    async fn list_resumes(&self, session: &Session) -> Result<Vec<ResumeSummary>, BackendError> {
        let url = self.endpoint(&["resumes"])?;
        let response = Self::send(self.client.get(url).bearer_auth(&session.access_token)).await?;
        Ok(response.json().await?)
    }
}

/// Interprets a non-2xx, non-transient start response.
/// A body the backend shaped itself is respected; anything else is permanent.
fn parse_rejection(body: &str) -> StartOutcome {
    match serde_json::from_str::<StartResponseBody>(body) {
        Ok(parsed) if !parsed.success => parsed.into(),
        _ => StartOutcome::Rejected {
            retryable: false,
            error: if body.is_empty() {
                "regeneration rejected".to_string()
            } else {
                body.to_string()
            },
        },
    }
}
