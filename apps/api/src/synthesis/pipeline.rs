//! Multi-stage synthesis pipeline — the reference
//! [`ScheduleSynthesisStrategy`] implementation.
//!
//! Stages run sequentially; DETAILING fans out per task and joins before
//! REFINING. A DRAFTING failure aborts the run with nothing persisted.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::embedding::index::VectorIndex;
use crate::embedding::retriever::{retrieve_related, DEFAULT_RETRIEVAL_LIMIT};
use crate::errors::AppError;
use crate::llm_client::{strip_json_fences, LlmClient, LlmError};
use crate::models::suggestion::{SuggestedEventRow, SuggestionStatus};
use crate::patterns::{
    combine_patterns, mine_activity_patterns, mine_artifact_patterns, mine_coding_patterns,
};
use crate::suggestions::store::insert_batch;
use crate::synthesis::context::{build_context, next_week_bounds, MAX_CONTEXT_PROJECTS};
use crate::synthesis::prompts::{
    DETAIL_PROMPT_TEMPLATE, DETAIL_SYSTEM, DRAFT_PROMPT_TEMPLATE, DRAFT_SYSTEM,
    REFINE_PROMPT_TEMPLATE, REFINE_SYSTEM,
};
use crate::synthesis::validate::validate_events;
use crate::synthesis::{ScheduleSynthesisStrategy, SynthesisStage};
use crate::telemetry::aggregator::{
    fetch_projects, fetch_telemetry, fetch_user_settings, LOOKBACK_DAYS,
};

use async_trait::async_trait;

/// A drafted schedule slot as returned by the DRAFTING call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftTask {
    pub title: String,
    pub suggested_start_time: chrono::DateTime<Utc>,
    pub suggested_end_time: chrono::DateTime<Utc>,
    pub priority: i32,
}

/// Per-task output of the DETAILING call.
#[derive(Debug, Clone, Deserialize)]
struct TaskDetail {
    description: String,
    #[serde(default)]
    steps: Option<String>,
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    challenges: Option<String>,
}

/// A drafted slot plus its working brief. This is what REFINING and
/// VALIDATING operate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedTask {
    pub title: String,
    pub suggested_start_time: chrono::DateTime<Utc>,
    pub suggested_end_time: chrono::DateTime<Utc>,
    pub priority: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub challenges: Option<String>,
}

/// Parses the DRAFTING output: fence-tolerant, otherwise strict. Any failure
/// here is fatal to the run.
pub fn parse_draft(raw: &str) -> Result<Vec<DraftTask>, serde_json::Error> {
    serde_json::from_str(strip_json_fences(raw))
}

/// Parses the REFINING output. Failures here fall back to the pre-refinement
/// list at the call site.
pub fn parse_refined(raw: &str) -> Result<Vec<DetailedTask>, serde_json::Error> {
    serde_json::from_str(strip_json_fences(raw))
}

/// Draft → detail (with retrieval) → refine → validate → persist.
pub struct MultiStageSynthesis {
    llm: LlmClient,
    index: Arc<dyn VectorIndex>,
}

impl MultiStageSynthesis {
    pub fn new(llm: LlmClient, index: Arc<dyn VectorIndex>) -> Self {
        Self { llm, index }
    }

    async fn run(&self, pool: &PgPool, user_id: Uuid) -> Result<Vec<SuggestedEventRow>, AppError> {
        enter(SynthesisStage::Init, user_id);
        let now = Utc::now();

        let settings = fetch_user_settings(pool, user_id).await?;
        let tz = settings.tz();
        let week = next_week_bounds(now, tz, settings.week_start());
        let lookback_start = now - chrono::Duration::days(LOOKBACK_DAYS);

        let bundle = fetch_telemetry(pool, user_id, lookback_start, week.start, week.end).await?;
        let projects = fetch_projects(pool, user_id, MAX_CONTEXT_PROJECTS as i64).await?;

        let work_patterns = combine_patterns(
            mine_activity_patterns(&bundle.activities, tz),
            mine_coding_patterns(&bundle.coding_sessions, tz),
        );
        let artifact_patterns = mine_artifact_patterns(&bundle.artifacts, tz);
        info!(
            "Mined {} work patterns and {} artifact patterns for user {user_id}",
            work_patterns.len(),
            artifact_patterns.len()
        );

        let context = build_context(
            &settings,
            &week,
            &bundle,
            work_patterns,
            artifact_patterns,
            &projects,
        );

        // DRAFTING: one call, fatal on invocation or parse failure.
        enter(SynthesisStage::Drafting, user_id);
        let context_json = serde_json::to_string_pretty(&context)
            .map_err(|e| AppError::Internal(anyhow!("Failed to serialize context: {e}")))?;
        let local_now = now.with_timezone(&tz);
        let prompt = DRAFT_PROMPT_TEMPLATE
            .replace("{today}", &local_now.format("%Y-%m-%d").to_string())
            .replace("{today_weekday}", &local_now.format("%A").to_string())
            .replace("{context_json}", &context_json);

        let response = self
            .llm
            .call(&prompt, DRAFT_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Drafting call failed: {e}")))?;
        let text = response
            .text()
            .ok_or_else(|| AppError::Llm("Drafting returned no text content".to_string()))?;
        let draft = parse_draft(text)
            .map_err(|e| AppError::LlmParse(format!("Draft is not a JSON event array: {e}")))?;
        info!("Draft contains {} events for user {user_id}", draft.len());

        // DETAILING: fan out per task; a failed task drops, the run continues.
        enter(SynthesisStage::Detailing, user_id);
        let drafted_count = draft.len();
        let detailed: Vec<DetailedTask> =
            join_all(draft.into_iter().map(|task| self.detail_task(task)))
                .await
                .into_iter()
                .flatten()
                .collect();
        if detailed.len() < drafted_count {
            warn!(
                "Detailing dropped {} of {drafted_count} events",
                drafted_count - detailed.len()
            );
        }

        // REFINING: best-effort holistic pass; any failure keeps the
        // pre-refinement list.
        enter(SynthesisStage::Refining, user_id);
        let refined = if detailed.is_empty() {
            detailed
        } else {
            match self.refine(&detailed).await {
                Ok(refined) => refined,
                Err(e) => {
                    warn!("Refinement pass failed ({e}); keeping pre-refinement schedule");
                    detailed
                }
            }
        };

        // VALIDATING: constraint checks; violators drop.
        enter(SynthesisStage::Validating, user_id);
        let surviving = validate_events(refined, &week, &settings, &bundle.locked_events);

        // PERSISTED: bulk insert as pending.
        let rows: Vec<SuggestedEventRow> = surviving
            .into_iter()
            .map(|task| SuggestedEventRow {
                id: Uuid::new_v4(),
                user_id,
                title: task.title,
                description: task.description,
                suggested_start_time: task.suggested_start_time,
                suggested_end_time: task.suggested_end_time,
                priority: task.priority,
                related_activity_id: None,
                related_project_id: None,
                status: SuggestionStatus::Pending.as_str().to_string(),
                steps: task.steps,
                background: task.background,
                challenges: task.challenges,
                created_at: now,
                updated_at: None,
            })
            .collect();
        insert_batch(pool, &rows).await?;
        enter(SynthesisStage::Persisted, user_id);
        info!("Persisted {} suggested events for user {user_id}", rows.len());

        Ok(rows)
    }

    async fn detail_task(&self, task: DraftTask) -> Option<DetailedTask> {
        let related =
            retrieve_related(self.index.as_ref(), &task.title, DEFAULT_RETRIEVAL_LIMIT).await;
        let related_context = if related.is_empty() {
            "No related history found.".to_string()
        } else {
            related
                .iter()
                .map(|chunk| {
                    let source = chunk
                        .metadata
                        .get("type")
                        .and_then(|t| t.as_str())
                        .unwrap_or("unknown");
                    format!("- [{source}] {}", chunk.content)
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let prompt = DETAIL_PROMPT_TEMPLATE
            .replace("{title}", &task.title)
            .replace(
                "{window}",
                &format!(
                    "{} to {}",
                    task.suggested_start_time.to_rfc3339(),
                    task.suggested_end_time.to_rfc3339()
                ),
            )
            .replace("{related_context}", &related_context);

        match self.llm.call_json::<TaskDetail>(&prompt, DETAIL_SYSTEM).await {
            Ok(detail) => Some(DetailedTask {
                title: task.title,
                suggested_start_time: task.suggested_start_time,
                suggested_end_time: task.suggested_end_time,
                priority: task.priority,
                description: Some(detail.description),
                steps: detail.steps,
                background: detail.background,
                challenges: detail.challenges,
            }),
            Err(e) => {
                warn!("Detailing '{}' failed ({e}); dropping the event", task.title);
                None
            }
        }
    }

    async fn refine(&self, detailed: &[DetailedTask]) -> Result<Vec<DetailedTask>, LlmError> {
        let events_json = serde_json::to_string_pretty(detailed)?;
        let prompt = REFINE_PROMPT_TEMPLATE.replace("{events_json}", &events_json);

        let response = self.llm.call(&prompt, REFINE_SYSTEM).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(parse_refined(text)?)
    }
}

#[async_trait]
impl ScheduleSynthesisStrategy for MultiStageSynthesis {
    async fn synthesize(
        &self,
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<SuggestedEventRow>, AppError> {
        self.run(pool, user_id).await.map_err(|e| {
            warn!("Synthesis for user {user_id} entered {}: {e}", SynthesisStage::Failed);
            e
        })
    }
}

fn enter(stage: SynthesisStage, user_id: Uuid) {
    info!("Synthesis for user {user_id}: entering {stage}");
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_draft_accepts_plain_json_array() {
        let raw = r#"[
            {
                "title": "Deep work: tracker ingestion",
                "suggestedStartTime": "2026-08-10T09:00:00Z",
                "suggestedEndTime": "2026-08-10T11:00:00Z",
                "priority": 1
            }
        ]"#;
        let draft = parse_draft(raw).unwrap();
        assert_eq!(draft.len(), 1);
        assert_eq!(draft[0].title, "Deep work: tracker ingestion");
        assert_eq!(
            draft[0].suggested_start_time,
            Utc.with_ymd_and_hms(2026, 8, 10, 9, 0, 0).unwrap()
        );
        assert_eq!(draft[0].priority, 1);
    }

    #[test]
    fn test_parse_draft_strips_markdown_fences() {
        let raw = "```json\n[{\"title\":\"t\",\"suggestedStartTime\":\"2026-08-10T09:00:00Z\",\"suggestedEndTime\":\"2026-08-10T10:00:00Z\",\"priority\":3}]\n```";
        let draft = parse_draft(raw).unwrap();
        assert_eq!(draft.len(), 1);
    }

    #[test]
    fn test_parse_draft_accepts_offset_timestamps() {
        let raw = r#"[{"title":"t","suggestedStartTime":"2026-08-10T09:00:00+02:00","suggestedEndTime":"2026-08-10T10:00:00+02:00","priority":3}]"#;
        let draft = parse_draft(raw).unwrap();
        assert_eq!(
            draft[0].suggested_start_time,
            Utc.with_ymd_and_hms(2026, 8, 10, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_draft_rejects_prose() {
        let raw = "Here is your schedule for next week:\n- Monday: deep work";
        assert!(parse_draft(raw).is_err());
    }

    #[test]
    fn test_parse_draft_rejects_missing_fields() {
        let raw = r#"[{"title": "incomplete"}]"#;
        assert!(parse_draft(raw).is_err());
    }

    #[test]
    fn test_parse_refined_tolerates_missing_detail_fields() {
        let raw = r#"[{
            "title": "t",
            "suggestedStartTime": "2026-08-10T09:00:00Z",
            "suggestedEndTime": "2026-08-10T10:00:00Z",
            "priority": 2
        }]"#;
        let refined = parse_refined(raw).unwrap();
        assert_eq!(refined.len(), 1);
        assert!(refined[0].description.is_none());
    }

    #[test]
    fn test_detailed_task_round_trips_camel_case() {
        let task = DetailedTask {
            title: "Review open pull requests".to_string(),
            suggested_start_time: Utc.with_ymd_and_hms(2026, 8, 10, 9, 0, 0).unwrap(),
            suggested_end_time: Utc.with_ymd_and_hms(2026, 8, 10, 10, 0, 0).unwrap(),
            priority: 2,
            description: Some("Catch up on the review queue".to_string()),
            steps: None,
            background: None,
            challenges: None,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("suggestedStartTime").is_some());
        let back: DetailedTask = serde_json::from_value(json).unwrap();
        assert_eq!(back.title, task.title);
        assert_eq!(back.priority, 2);
    }
}
