pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::embedding::handlers as embedding_handlers;
use crate::state::AppState;
use crate::suggestions::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Suggestion API
        .route(
            "/api/v1/suggestions",
            get(handlers::handle_list).post(handlers::handle_create),
        )
        .route("/api/v1/suggestions/generate", post(handlers::handle_generate))
        .route(
            "/api/v1/suggestions/:id",
            get(handlers::handle_get).delete(handlers::handle_delete),
        )
        .route(
            "/api/v1/suggestions/:id/status",
            patch(handlers::handle_update_status),
        )
        // Vector index maintenance
        .route("/api/v1/index/sync", post(embedding_handlers::handle_index_sync))
        .with_state(state)
}
