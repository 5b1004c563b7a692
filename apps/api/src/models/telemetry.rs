//! Typed rows for the telemetry tables the aggregator reads.
//!
//! Everything here is read-only input to mining and indexing; the synthesis
//! pipeline never writes these tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A tracked application/window activity interval.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_type: String,
    pub application_name: Option<String>,
    pub window_title: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub project_id: Option<Uuid>,
}

/// An editor heartbeat aggregate reported by the coding-time tracker.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CodingSessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub language: Option<String>,
    pub editor: Option<String>,
    pub duration_secs: Option<i64>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IssueRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub body: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub external_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PullRequestRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub body: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub external_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommitRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub message: String,
    pub sha: String,
    /// Author timestamp from the provider payload. Nullable: some sync paths
    /// store commits whose author date was missing or malformed upstream.
    pub committed_at: Option<DateTime<Utc>>,
    pub external_url: String,
}

/// An engineering artifact mined for work patterns and indexed for retrieval.
/// Explicit sum type; suggestions and calendar events are separate types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineeringArtifact {
    Issue(IssueRecord),
    PullRequest(PullRequestRecord),
    Commit(CommitRecord),
}

impl EngineeringArtifact {
    pub fn id(&self) -> Uuid {
        match self {
            EngineeringArtifact::Issue(r) => r.id,
            EngineeringArtifact::PullRequest(r) => r.id,
            EngineeringArtifact::Commit(r) => r.id,
        }
    }

    pub fn project_id(&self) -> Option<Uuid> {
        match self {
            EngineeringArtifact::Issue(r) => r.project_id,
            EngineeringArtifact::PullRequest(r) => r.project_id,
            EngineeringArtifact::Commit(r) => r.project_id,
        }
    }

    /// Timestamp used for pattern mining. `None` when the provider did not
    /// supply a usable date; the miner skips such records with a warning.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        match self {
            EngineeringArtifact::Issue(r) => Some(r.created_at),
            EngineeringArtifact::PullRequest(r) => Some(r.created_at),
            EngineeringArtifact::Commit(r) => r.committed_at,
        }
    }

    /// Textual content fed to the embedding indexer.
    pub fn content(&self) -> String {
        match self {
            EngineeringArtifact::Issue(r) => match &r.body {
                Some(body) => format!("{}\n\n{}", r.title, body),
                None => r.title.clone(),
            },
            EngineeringArtifact::PullRequest(r) => match &r.body {
                Some(body) => format!("{}\n\n{}", r.title, body),
                None => r.title.clone(),
            },
            EngineeringArtifact::Commit(r) => r.message.clone(),
        }
    }
}

/// A calendar event already on the user's schedule for the target week.
/// Immutable scheduling constraint: the pipeline reads it, never writes it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LockedCalendarEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub is_all_day: bool,
    pub recurrence_rule: Option<String>,
    pub external_calendar_id: Option<String>,
}
