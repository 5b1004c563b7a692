//! Suggestion Store — persistence and lifecycle for suggested events.
//!
//! The lifecycle guard lives here at the store boundary: a suggestion leaves
//! `pending` exactly once, and both the Rust check and the SQL predicate
//! enforce it (the predicate closes the race between concurrent updates).

use anyhow::anyhow;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::suggestion::{
    NewSuggestion, SuggestedEventRow, SuggestedEventSummary, SuggestionStatus,
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Paged listing, ascending by suggested start, trimmed columns.
pub async fn list_suggestions(
    pool: &PgPool,
    user_id: Uuid,
    status: Option<SuggestionStatus>,
    page: i64,
    per_page: i64,
) -> Result<Vec<SuggestedEventSummary>, AppError> {
    let offset = (page.max(1) - 1) * per_page;

    let rows = match status {
        Some(status) => {
            sqlx::query_as(
                r#"
                SELECT id, title, suggested_start_time, suggested_end_time, priority, status
                FROM suggested_events
                WHERE user_id = $1 AND status = $2
                ORDER BY suggested_start_time
                LIMIT $3 OFFSET $4
                "#,
            )
            .bind(user_id)
            .bind(status.as_str())
            .bind(per_page)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                r#"
                SELECT id, title, suggested_start_time, suggested_end_time, priority, status
                FROM suggested_events
                WHERE user_id = $1
                ORDER BY suggested_start_time
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(user_id)
            .bind(per_page)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}

pub async fn get_suggestion(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<SuggestedEventRow, AppError> {
    let row: Option<SuggestedEventRow> = sqlx::query_as(
        r#"
        SELECT id, user_id, title, description, suggested_start_time, suggested_end_time,
               priority, related_activity_id, related_project_id, status,
               steps, background, challenges, created_at, updated_at
        FROM suggested_events
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| AppError::NotFound(format!("Suggestion {id} not found")))
}

/// Manual creation path (external callers). Synthesis runs go through
/// [`insert_batch`].
pub async fn create_suggestion(
    pool: &PgPool,
    new: NewSuggestion,
) -> Result<SuggestedEventRow, AppError> {
    let row = SuggestedEventRow {
        id: Uuid::new_v4(),
        user_id: new.user_id,
        title: new.title,
        description: new.description,
        suggested_start_time: new.suggested_start_time,
        suggested_end_time: new.suggested_end_time,
        priority: new.priority,
        related_activity_id: new.related_activity_id,
        related_project_id: new.related_project_id,
        status: SuggestionStatus::Pending.as_str().to_string(),
        steps: None,
        background: None,
        challenges: None,
        created_at: Utc::now(),
        updated_at: None,
    };

    insert_batch(pool, std::slice::from_ref(&row)).await?;
    Ok(row)
}

/// Bulk insert for one synthesis run; every row lands as pending.
pub async fn insert_batch(pool: &PgPool, rows: &[SuggestedEventRow]) -> Result<(), AppError> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO suggested_events
                (id, user_id, title, description, suggested_start_time, suggested_end_time,
                 priority, related_activity_id, related_project_id, status,
                 steps, background, challenges, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.suggested_start_time)
        .bind(row.suggested_end_time)
        .bind(row.priority)
        .bind(row.related_activity_id)
        .bind(row.related_project_id)
        .bind(&row.status)
        .bind(&row.steps)
        .bind(&row.background)
        .bind(&row.challenges)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// One-way transition out of pending. Only `accepted` and `rejected` are
/// reachable; everything else is a lifecycle violation.
pub async fn update_status(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    target: SuggestionStatus,
) -> Result<SuggestedEventRow, AppError> {
    let current = get_suggestion(pool, user_id, id).await?;
    ensure_transition(&current.status, target)?;

    let updated: Option<SuggestedEventRow> = sqlx::query_as(
        r#"
        UPDATE suggested_events
        SET status = $1, updated_at = $2
        WHERE id = $3 AND user_id = $4 AND status = 'pending'
        RETURNING id, user_id, title, description, suggested_start_time, suggested_end_time,
                  priority, related_activity_id, related_project_id, status,
                  steps, background, challenges, created_at, updated_at
        "#,
    )
    .bind(target.as_str())
    .bind(Utc::now())
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    // A concurrent update can win between the read and the guarded write.
    updated.ok_or_else(|| {
        AppError::Lifecycle(format!("Suggestion {id} already left the pending state"))
    })
}

pub async fn delete_suggestion(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM suggested_events WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Suggestion {id} not found")));
    }
    Ok(())
}

/// Pure transition guard, shared by the store and tested directly.
fn ensure_transition(current_status: &str, target: SuggestionStatus) -> Result<(), AppError> {
    let current: SuggestionStatus = current_status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow!(e)))?;

    if !current.can_transition_to(target) {
        return Err(AppError::Lifecycle(format!(
            "Cannot move a {current} suggestion to {target}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_may_become_accepted_or_rejected() {
        assert!(ensure_transition("pending", SuggestionStatus::Accepted).is_ok());
        assert!(ensure_transition("pending", SuggestionStatus::Rejected).is_ok());
    }

    #[test]
    fn test_no_way_back_to_pending() {
        for current in ["accepted", "rejected"] {
            let result = ensure_transition(current, SuggestionStatus::Pending);
            assert!(matches!(result, Err(AppError::Lifecycle(_))));
        }
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        assert!(matches!(
            ensure_transition("accepted", SuggestionStatus::Rejected),
            Err(AppError::Lifecycle(_))
        ));
        assert!(matches!(
            ensure_transition("rejected", SuggestionStatus::Accepted),
            Err(AppError::Lifecycle(_))
        ));
    }

    #[test]
    fn test_pending_to_pending_is_rejected() {
        assert!(matches!(
            ensure_transition("pending", SuggestionStatus::Pending),
            Err(AppError::Lifecycle(_))
        ));
    }

    #[test]
    fn test_unknown_stored_status_is_internal() {
        assert!(matches!(
            ensure_transition("archived", SuggestionStatus::Accepted),
            Err(AppError::Internal(_))
        ));
    }
}
