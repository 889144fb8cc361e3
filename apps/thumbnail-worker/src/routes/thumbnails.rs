use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::resume::ResumeSummary;
use crate::state::AppState;

/// A cached resume plus the flags a list view needs for its thumbnail badge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeView {
    #[serde(flatten)]
    pub resume: ResumeSummary,
    pub needs_refresh: bool,
    pub generating: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateResponse {
    pub resource_id: String,
    pub generating: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratingResponse {
    pub resource_ids: Vec<String>,
}

fn to_view(state: &AppState, resume: ResumeSummary) -> ResumeView {
    ResumeView {
        needs_refresh: resume.is_stale(),
        generating: state.tracker.is_generating(&resume.id),
        resume,
    }
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(State(state): State<AppState>) -> Json<Vec<ResumeView>> {
    let views = state
        .cache
        .snapshot()
        .into_iter()
        .map(|resume| to_view(&state, resume))
        .collect();
    Json(views)
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeView>, AppError> {
    let resume = state
        .cache
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;
    Ok(Json(to_view(&state, resume)))
}

/// POST /api/v1/resumes/:id/thumbnail/regenerate
/// Fire-and-forget: answers immediately, the tracker does the rest.
pub async fn handle_regenerate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<RegenerateResponse>), AppError> {
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(AppError::Validation("resume id must not be empty".to_string()));
    }

    let tracker = state.tracker.clone();
    let resource_id = id.clone();
    tokio::spawn(async move { tracker.trigger(&resource_id).await });

    Ok((
        StatusCode::ACCEPTED,
        Json(RegenerateResponse {
            resource_id: id,
            generating: true,
        }),
    ))
}

/// GET /api/v1/thumbnails/generating
pub async fn handle_generating(State(state): State<AppState>) -> Json<GeneratingResponse> {
    Json(GeneratingResponse {
        resource_ids: state.tracker.generating_ids().into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::catalog::ResumeCache;
    use crate::regeneration::{RegenerationConfig, RegenerationTracker};
    use crate::routes::build_router;
    use crate::testing::{accepted, MockBackend, MockSessions};

    fn make_state(backend: &Arc<MockBackend>) -> AppState {
        let tracker = RegenerationTracker::new(
            backend.clone(),
            Arc::new(MockSessions::signed_in()),
            RegenerationConfig::default(),
        );
        AppState {
            tracker,
            cache: Arc::new(ResumeCache::default()),
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_regenerate_accepts_and_tracks() {
        let backend = Arc::new(MockBackend::new());
        backend.script_start(vec![accepted(Some("T1"))]);
        let state = make_state(&backend);
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/v1/resumes/resume-42/thumbnail/regenerate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["resourceId"], "resume-42");

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.start_calls(), 1);

        let response = app
            .oneshot(
                Request::get("/api/v1/thumbnails/generating")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            body_json(response).await["resourceIds"],
            serde_json::json!(["resume-42"])
        );
    }

    #[tokio::test]
    async fn test_blank_id_is_rejected() {
        let backend = Arc::new(MockBackend::new());
        let app = build_router(make_state(&backend));

        let response = app
            .oneshot(
                Request::post("/api/v1/resumes/%20/thumbnail/regenerate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(backend.start_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_resume_is_not_found() {
        let backend = Arc::new(MockBackend::new());
        let app = build_router(make_state(&backend));

        let response = app
            .oneshot(Request::get("/api/v1/resumes/ghost").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_flags_stale_resumes() {
        let backend = Arc::new(MockBackend::new());
        let state = make_state(&backend);
        state.cache.replace_all(vec![ResumeSummary {
            id: "r1".to_string(),
            title: "Staff Engineer".to_string(),
            updated_at: Utc::now(),
            thumbnail_generated_at: None,
            thumbnail_url: None,
        }]);
        let app = build_router(state);

        let response = app
            .oneshot(Request::get("/api/v1/resumes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["id"], "r1");
        assert_eq!(body[0]["title"], "Staff Engineer");
        assert_eq!(body[0]["needsRefresh"], true);
        assert_eq!(body[0]["generating"], false);
    }

    #[tokio::test]
    async fn test_health() {
        let backend = Arc::new(MockBackend::new());
        let app = build_router(make_state(&backend));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["status"], "ok");
    }
}
