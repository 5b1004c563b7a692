use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::embedding::indexer::{embed_items, EmbedReport};
use crate::embedding::{EmbeddableItem, SourceType};
use crate::errors::AppError;
use crate::models::telemetry::{EngineeringArtifact, LockedCalendarEvent};
use crate::state::AppState;
use crate::telemetry::aggregator::{
    fetch_recent_artifacts, fetch_week_locked_events, LOOKBACK_DAYS,
};

#[derive(Debug, Deserialize)]
pub struct IndexSyncRequest {
    pub user_id: Uuid,
}

/// POST /api/v1/index/sync
///
/// Embeds the user's recent engineering artifacts and calendar events into
/// the vector index. Per-item failures are tallied in the report, not raised.
pub async fn handle_index_sync(
    State(state): State<AppState>,
    Json(req): Json<IndexSyncRequest>,
) -> Result<Json<EmbedReport>, AppError> {
    let now = Utc::now();
    let since = now - Duration::days(LOOKBACK_DAYS);

    let artifacts = fetch_recent_artifacts(&state.db, req.user_id, since).await?;
    let events =
        fetch_week_locked_events(&state.db, req.user_id, since, now + Duration::days(7)).await?;

    let mut items: Vec<EmbeddableItem> = artifacts.iter().map(artifact_item).collect();
    items.extend(events.iter().map(event_item));

    info!(
        "Index sync for user {}: {} artifacts, {} events",
        req.user_id,
        artifacts.len(),
        events.len()
    );

    let report = embed_items(state.embedder.as_ref(), state.index.as_ref(), &items).await;
    Ok(Json(report))
}

fn artifact_item(artifact: &EngineeringArtifact) -> EmbeddableItem {
    let (source_type, url, status) = match artifact {
        EngineeringArtifact::Issue(r) => {
            (SourceType::Issue, r.external_url.clone(), Some(r.status.clone()))
        }
        EngineeringArtifact::PullRequest(r) => {
            (SourceType::PullRequest, r.external_url.clone(), Some(r.status.clone()))
        }
        EngineeringArtifact::Commit(r) => (SourceType::Commit, r.external_url.clone(), None),
    };

    let mut metadata = Map::new();
    metadata.insert("url".to_string(), json!(url));
    if let Some(status) = status {
        metadata.insert("status".to_string(), json!(status));
    }
    if let Some(project_id) = artifact.project_id() {
        metadata.insert("project_id".to_string(), json!(project_id));
    }

    EmbeddableItem {
        id: artifact.id(),
        source_type,
        content: artifact.content(),
        metadata,
    }
}

fn event_item(event: &LockedCalendarEvent) -> EmbeddableItem {
    let content = match &event.description {
        Some(description) => format!("{}\n\n{}", event.title, description),
        None => event.title.clone(),
    };

    let mut metadata = Map::new();
    metadata.insert("start_time".to_string(), json!(event.start_time));
    metadata.insert("end_time".to_string(), json!(event.end_time));
    if let Some(location) = &event.location {
        metadata.insert("location".to_string(), Value::String(location.clone()));
    }

    EmbeddableItem {
        id: event.id,
        source_type: SourceType::CalendarEvent,
        content,
        metadata,
    }
}
