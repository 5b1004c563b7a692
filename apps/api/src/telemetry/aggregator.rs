//! Telemetry Aggregator — read-only fetches feeding the miner and the
//! synthesis context.
//!
//! Any storage failure here maps to `AppError::TelemetryFetch` and aborts the
//! run; there is no local retry.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::project::ProjectRow;
use crate::models::settings::UserSettingsRow;
use crate::models::telemetry::{
    ActivityRecord, CodingSessionRecord, CommitRecord, EngineeringArtifact, IssueRecord,
    LockedCalendarEvent, PullRequestRecord,
};

/// How far back mining looks, in days.
pub const LOOKBACK_DAYS: i64 = 30;

/// Everything the pattern miner and the drafting context need, fetched in one
/// pass for one user.
#[derive(Debug, Clone)]
pub struct TelemetryBundle {
    pub activities: Vec<ActivityRecord>,
    pub coding_sessions: Vec<CodingSessionRecord>,
    pub artifacts: Vec<EngineeringArtifact>,
    pub locked_events: Vec<LockedCalendarEvent>,
}

/// Fetches the lookback window of telemetry plus the target week's locked
/// calendar events.
pub async fn fetch_telemetry(
    pool: &PgPool,
    user_id: Uuid,
    lookback_start: DateTime<Utc>,
    week_start: DateTime<Utc>,
    week_end: DateTime<Utc>,
) -> Result<TelemetryBundle, AppError> {
    let activities = fetch_recent_activities(pool, user_id, lookback_start).await?;
    let coding_sessions = fetch_recent_coding_sessions(pool, user_id, lookback_start).await?;
    let artifacts = fetch_recent_artifacts(pool, user_id, lookback_start).await?;
    let locked_events = fetch_week_locked_events(pool, user_id, week_start, week_end).await?;

    debug!(
        "Telemetry for user {user_id}: {} activities, {} coding sessions, {} artifacts, {} locked events",
        activities.len(),
        coding_sessions.len(),
        artifacts.len(),
        locked_events.len()
    );

    Ok(TelemetryBundle {
        activities,
        coding_sessions,
        artifacts,
        locked_events,
    })
}

async fn fetch_recent_activities(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<ActivityRecord>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, user_id, activity_type, application_name, window_title,
               start_time, end_time, duration_secs, project_id
        FROM activities
        WHERE user_id = $1 AND start_time >= $2
        ORDER BY start_time DESC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await
    .map_err(AppError::TelemetryFetch)
}

async fn fetch_recent_coding_sessions(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<CodingSessionRecord>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, user_id, project_id, language, editor, duration_secs, recorded_at
        FROM coding_sessions
        WHERE user_id = $1 AND recorded_at >= $2
        ORDER BY recorded_at DESC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await
    .map_err(AppError::TelemetryFetch)
}

/// Fetches issues, pull requests, and commits and folds them into the
/// artifact sum type, newest first per source.
pub async fn fetch_recent_artifacts(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<EngineeringArtifact>, AppError> {
    let issues: Vec<IssueRecord> = sqlx::query_as(
        r#"
        SELECT id, user_id, project_id, title, body, status, created_at, updated_at, external_url
        FROM issues
        WHERE user_id = $1 AND created_at >= $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await
    .map_err(AppError::TelemetryFetch)?;

    let pull_requests: Vec<PullRequestRecord> = sqlx::query_as(
        r#"
        SELECT id, user_id, project_id, title, body, status, created_at, updated_at, external_url
        FROM pull_requests
        WHERE user_id = $1 AND created_at >= $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await
    .map_err(AppError::TelemetryFetch)?;

    let commits: Vec<CommitRecord> = sqlx::query_as(
        r#"
        SELECT id, user_id, project_id, message, sha, committed_at, external_url
        FROM commits
        WHERE user_id = $1 AND (committed_at IS NULL OR committed_at >= $2)
        ORDER BY committed_at DESC NULLS LAST
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await
    .map_err(AppError::TelemetryFetch)?;

    let mut artifacts = Vec::with_capacity(issues.len() + pull_requests.len() + commits.len());
    artifacts.extend(issues.into_iter().map(EngineeringArtifact::Issue));
    artifacts.extend(pull_requests.into_iter().map(EngineeringArtifact::PullRequest));
    artifacts.extend(commits.into_iter().map(EngineeringArtifact::Commit));
    Ok(artifacts)
}

/// Fetches the calendar events already scheduled inside the target week.
pub async fn fetch_week_locked_events(
    pool: &PgPool,
    user_id: Uuid,
    week_start: DateTime<Utc>,
    week_end: DateTime<Utc>,
) -> Result<Vec<LockedCalendarEvent>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, user_id, title, description, start_time, end_time,
               location, is_all_day, recurrence_rule, external_calendar_id
        FROM calendar_events
        WHERE user_id = $1 AND start_time >= $2 AND end_time <= $3
        ORDER BY start_time
        "#,
    )
    .bind(user_id)
    .bind(week_start)
    .bind(week_end)
    .fetch_all(pool)
    .await
    .map_err(AppError::TelemetryFetch)
}

/// Loads scheduling preferences, defaulting when the user has no row.
pub async fn fetch_user_settings(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<UserSettingsRow, AppError> {
    let row: Option<UserSettingsRow> = sqlx::query_as(
        r#"
        SELECT user_id, time_zone, working_hours_start, working_hours_end,
               week_start_day, activity_tracking_enabled, calendar_sync_enabled
        FROM user_settings
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::TelemetryFetch)?;

    Ok(row.unwrap_or_else(|| UserSettingsRow::defaults(user_id)))
}

/// Bounded set of projects for the drafting context.
pub async fn fetch_projects(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<ProjectRow>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, user_id, name, description
        FROM projects
        WHERE user_id = $1
        ORDER BY name
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(AppError::TelemetryFetch)
}
