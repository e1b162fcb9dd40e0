pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/analyses",
            post(handlers::handle_create_analysis).get(handlers::handle_list_analyses),
        )
        .route("/api/v1/analyses/:id", get(handlers::handle_get_analysis))
        .route(
            "/api/v1/analyses/:id/resume",
            get(handlers::handle_download_resume),
        )
        .route(
            "/api/v1/analyses/:id/improved-resume",
            get(handlers::handle_download_improved_resume),
        )
        .route("/api/v1/models", get(handlers::handle_list_models))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
