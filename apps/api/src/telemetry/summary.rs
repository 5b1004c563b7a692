//! Compact telemetry summaries for the drafting prompt. Top-N aggregates
//! keep the context small regardless of how much raw telemetry exists.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::telemetry::{ActivityRecord, CodingSessionRecord};

/// How many entries each summary keeps.
const TOP_N: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct SummaryEntry {
    pub name: String,
    pub weight: i64,
}

/// Top activity types by record count, descending. Ties break by name so the
/// prompt context is stable between runs.
pub fn summarize_activity_types(activities: &[ActivityRecord]) -> Vec<SummaryEntry> {
    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
    for activity in activities {
        *counts.entry(activity.activity_type.as_str()).or_insert(0) += 1;
    }
    top_n(counts)
}

/// Top coding languages by summed duration, descending. Sessions without a
/// language bucket under "unknown".
pub fn summarize_languages(sessions: &[CodingSessionRecord]) -> Vec<SummaryEntry> {
    let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
    for session in sessions {
        let language = session.language.as_deref().unwrap_or("unknown");
        *totals.entry(language).or_insert(0) += session.duration_secs.unwrap_or(0);
    }
    top_n(totals)
}

fn top_n(map: BTreeMap<&str, i64>) -> Vec<SummaryEntry> {
    let mut entries: Vec<SummaryEntry> = map
        .into_iter()
        .map(|(name, weight)| SummaryEntry {
            name: name.to_string(),
            weight,
        })
        .collect();
    // BTreeMap iteration is already name-ordered, so equal weights stay
    // alphabetical after the stable sort.
    entries.sort_by(|a, b| b.weight.cmp(&a.weight));
    entries.truncate(TOP_N);
    entries
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn activity(activity_type: &str) -> ActivityRecord {
        ActivityRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            activity_type: activity_type.to_string(),
            application_name: None,
            window_title: None,
            start_time: Utc::now(),
            end_time: None,
            duration_secs: None,
            project_id: None,
        }
    }

    fn session(language: Option<&str>, duration_secs: i64) -> CodingSessionRecord {
        CodingSessionRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            project_id: None,
            language: language.map(String::from),
            editor: None,
            duration_secs: Some(duration_secs),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_activity_summary_counts_and_orders() {
        let records = vec![
            activity("coding"),
            activity("coding"),
            activity("coding"),
            activity("meetings"),
            activity("browsing"),
            activity("browsing"),
        ];
        let summary = summarize_activity_types(&records);
        assert_eq!(summary[0].name, "coding");
        assert_eq!(summary[0].weight, 3);
        assert_eq!(summary[1].name, "browsing");
        assert_eq!(summary[2].name, "meetings");
    }

    #[test]
    fn test_activity_summary_keeps_top_five() {
        let mut records = Vec::new();
        for t in ["a", "b", "c", "d", "e", "f", "g"] {
            records.push(activity(t));
        }
        assert_eq!(summarize_activity_types(&records).len(), 5);
    }

    #[test]
    fn test_language_summary_sums_duration() {
        let sessions = vec![
            session(Some("rust"), 3600),
            session(Some("rust"), 1800),
            session(Some("typescript"), 4000),
            session(None, 100),
        ];
        let summary = summarize_languages(&sessions);
        assert_eq!(summary[0].name, "rust");
        assert_eq!(summary[0].weight, 5400);
        assert_eq!(summary[1].name, "typescript");
        assert_eq!(summary[2].name, "unknown");
    }

    #[test]
    fn test_empty_input_yields_empty_summary() {
        assert!(summarize_activity_types(&[]).is_empty());
        assert!(summarize_languages(&[]).is_empty());
    }
}
