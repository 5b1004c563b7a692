use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::suggestion::{
    NewSuggestion, SuggestedEventRow, SuggestedEventSummary, SuggestionStatus,
};
use crate::state::AppState;
use crate::suggestions::store::{
    create_suggestion, delete_suggestion, get_suggestion, list_suggestions, update_status,
    DEFAULT_PAGE_SIZE,
};

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub user_id: Uuid,
    pub status: Option<SuggestionStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub user_id: Uuid,
    pub status: SuggestionStatus,
}

/// POST /api/v1/suggestions/generate
///
/// Runs one synthesis pass for the user's upcoming week and returns the
/// persisted suggestions. Synchronous: the caller waits for the pipeline.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<Vec<SuggestedEventRow>>, AppError> {
    let rows = state.synthesis.synthesize(&state.db, req.user_id).await?;
    Ok(Json(rows))
}

/// GET /api/v1/suggestions
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<SuggestedEventSummary>>, AppError> {
    let rows = list_suggestions(
        &state.db,
        params.user_id,
        params.status,
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(DEFAULT_PAGE_SIZE),
    )
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/suggestions/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SuggestedEventRow>, AppError> {
    let row = get_suggestion(&state.db, params.user_id, id).await?;
    Ok(Json(row))
}

/// POST /api/v1/suggestions
pub async fn handle_create(
    State(state): State<AppState>,
    Json(req): Json<NewSuggestion>,
) -> Result<Json<SuggestedEventRow>, AppError> {
    if req.suggested_end_time <= req.suggested_start_time {
        return Err(AppError::Validation(
            "suggested_end_time must follow suggested_start_time".to_string(),
        ));
    }
    if !(1..=5).contains(&req.priority) {
        return Err(AppError::Validation("priority must be between 1 and 5".to_string()));
    }

    let row = create_suggestion(&state.db, req).await?;
    Ok(Json(row))
}

/// PATCH /api/v1/suggestions/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<SuggestedEventRow>, AppError> {
    let row = update_status(&state.db, req.user_id, id, req.status).await?;
    Ok(Json(row))
}

/// DELETE /api/v1/suggestions/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    delete_suggestion(&state.db, params.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
