pub mod health;
pub mod thumbnails;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/resumes", get(thumbnails::handle_list_resumes))
        .route("/api/v1/resumes/:id", get(thumbnails::handle_get_resume))
        .route(
            "/api/v1/resumes/:id/thumbnail/regenerate",
            post(thumbnails::handle_regenerate),
        )
        .route(
            "/api/v1/thumbnails/generating",
            get(thumbnails::handle_generating),
        )
        .with_state(state)
}
