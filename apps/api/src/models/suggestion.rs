use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Suggestion lifecycle state. Transitions are one-way: a suggestion leaves
/// `pending` exactly once and never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Accepted => "accepted",
            SuggestionStatus::Rejected => "rejected",
        }
    }

    /// Whether a transition from `self` to `target` is legal.
    pub fn can_transition_to(&self, target: SuggestionStatus) -> bool {
        matches!(
            (self, target),
            (
                SuggestionStatus::Pending,
                SuggestionStatus::Accepted | SuggestionStatus::Rejected
            )
        )
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuggestionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SuggestionStatus::Pending),
            "accepted" => Ok(SuggestionStatus::Accepted),
            "rejected" => Ok(SuggestionStatus::Rejected),
            other => Err(format!("unknown suggestion status: {other}")),
        }
    }
}

/// A persisted AI-suggested event. Suggested times are immutable after
/// creation; a different slot means a new suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SuggestedEventRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub suggested_start_time: DateTime<Utc>,
    pub suggested_end_time: DateTime<Utc>,
    /// 1 = highest, 5 = lowest.
    pub priority: i32,
    pub related_activity_id: Option<Uuid>,
    pub related_project_id: Option<Uuid>,
    pub status: String,
    pub steps: Option<String>,
    pub background: Option<String>,
    pub challenges: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Trimmed columns for paged listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SuggestedEventSummary {
    pub id: Uuid,
    pub title: String,
    pub suggested_start_time: DateTime<Utc>,
    pub suggested_end_time: DateTime<Utc>,
    pub priority: i32,
    pub status: String,
}

/// Payload for manually created suggestions (external callers, not the
/// synthesis pipeline).
#[derive(Debug, Clone, Deserialize)]
pub struct NewSuggestion {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub suggested_start_time: DateTime<Utc>,
    pub suggested_end_time: DateTime<Utc>,
    pub priority: i32,
    pub related_activity_id: Option<Uuid>,
    pub related_project_id: Option<Uuid>,
}
