//! Pattern Miner — buckets telemetry into recurring (day-of-week,
//! time-of-day) work patterns.
//!
//! Records are keyed by an explicit composite [`PatternKey`] and folded
//! through a [`PatternAccumulator`]; there is no shared mutable state between
//! mining passes. Time-of-day values are floored to 15-minute buckets so
//! semantically equal observations land in the same pattern.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveTime, Timelike};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use tracing::warn;
use uuid::Uuid;

use crate::models::telemetry::{ActivityRecord, CodingSessionRecord, EngineeringArtifact};

/// Minutes per bucket.
const BUCKET_MINUTES: u32 = 15;

/// Activity type assigned to patterns mined from coding sessions and
/// engineering artifacts.
const CODING_ACTIVITY: &str = "coding";

/// A mined recurring work bucket. Ephemeral: built per generation run and
/// serialized into the drafting prompt, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkPattern {
    /// 0 = Sunday … 6 = Saturday.
    pub day_of_week: u8,
    #[serde(serialize_with = "serialize_hhmm")]
    pub start_time: NaiveTime,
    #[serde(serialize_with = "serialize_hhmm")]
    pub end_time: NaiveTime,
    pub activity_type: String,
    pub project_id: Option<Uuid>,
    pub frequency: u32,
}

/// Composite bucket key. `activity_type` is `None` for sources that are all
/// coding by definition (sessions, artifacts).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PatternKey {
    day_of_week: u8,
    bucket: NaiveTime,
    activity_type: Option<String>,
    project_id: Option<Uuid>,
}

/// Accumulator threaded through each mining fold. One entry per key; a
/// repeat observation increments frequency and widens the span end.
#[derive(Debug, Default)]
struct PatternAccumulator {
    buckets: HashMap<PatternKey, WorkPattern>,
}

impl PatternAccumulator {
    fn observe(&mut self, key: PatternKey, span_end: NaiveTime) {
        self.buckets
            .entry(key)
            .and_modify(|pattern| {
                pattern.frequency += 1;
                if span_end > pattern.end_time {
                    pattern.end_time = span_end;
                }
            })
            .or_insert_with_key(|k| WorkPattern {
                day_of_week: k.day_of_week,
                start_time: k.bucket,
                end_time: span_end.max(k.bucket),
                activity_type: k
                    .activity_type
                    .clone()
                    .unwrap_or_else(|| CODING_ACTIVITY.to_string()),
                project_id: k.project_id,
                frequency: 1,
            });
    }

    fn into_sorted(self) -> Vec<WorkPattern> {
        let mut patterns: Vec<WorkPattern> = self.buckets.into_values().collect();
        sort_patterns(&mut patterns);
        patterns
    }
}

/// Frequency descending; equal frequencies order by (day, start) so output
/// is deterministic.
fn sort_patterns(patterns: &mut [WorkPattern]) {
    patterns.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then(a.day_of_week.cmp(&b.day_of_week))
            .then(a.start_time.cmp(&b.start_time))
    });
}

/// Floors a time-of-day to its 15-minute bucket, dropping seconds.
/// Idempotent: normalizing a normalized time is a no-op.
pub fn normalize_time(time: NaiveTime) -> NaiveTime {
    let minute = time.minute() / BUCKET_MINUTES * BUCKET_MINUTES;
    NaiveTime::from_hms_opt(time.hour(), minute, 0).unwrap_or(time)
}

fn day_of_week(local: &DateTime<Tz>) -> u8 {
    local.weekday().num_days_from_sunday() as u8
}

/// Mines activity telemetry, keyed by (day, start bucket, activity type,
/// project). The span end widens to the latest normalized end observed for
/// the key.
pub fn mine_activity_patterns(activities: &[ActivityRecord], tz: Tz) -> Vec<WorkPattern> {
    let acc = activities
        .iter()
        .fold(PatternAccumulator::default(), |mut acc, record| {
            let local_start = record.start_time.with_timezone(&tz);
            let start_bucket = normalize_time(local_start.time());
            let span_end = record
                .end_time
                .map(|end| normalize_time(end.with_timezone(&tz).time()))
                .unwrap_or(start_bucket);

            acc.observe(
                PatternKey {
                    day_of_week: day_of_week(&local_start),
                    bucket: start_bucket,
                    activity_type: Some(record.activity_type.clone()),
                    project_id: record.project_id,
                },
                span_end,
            );
            acc
        });
    acc.into_sorted()
}

/// Mines coding-session telemetry, keyed by (day, bucket, project). The
/// session heartbeat is a point in time, so the span starts out zero-width.
pub fn mine_coding_patterns(sessions: &[CodingSessionRecord], tz: Tz) -> Vec<WorkPattern> {
    let acc = sessions
        .iter()
        .fold(PatternAccumulator::default(), |mut acc, session| {
            let local = session.recorded_at.with_timezone(&tz);
            let bucket = normalize_time(local.time());

            acc.observe(
                PatternKey {
                    day_of_week: day_of_week(&local),
                    bucket,
                    activity_type: None,
                    project_id: session.project_id,
                },
                bucket,
            );
            acc
        });
    acc.into_sorted()
}

/// Mines engineering artifacts analogously to coding sessions, tagged as
/// coding activity. Artifacts without a usable timestamp are skipped with a
/// warning rather than failing the run.
pub fn mine_artifact_patterns(artifacts: &[EngineeringArtifact], tz: Tz) -> Vec<WorkPattern> {
    let acc = artifacts
        .iter()
        .fold(PatternAccumulator::default(), |mut acc, artifact| {
            let Some(occurred_at) = artifact.occurred_at() else {
                warn!("Artifact {} has no usable timestamp; skipped", artifact.id());
                return acc;
            };
            let local = occurred_at.with_timezone(&tz);
            let bucket = normalize_time(local.time());

            acc.observe(
                PatternKey {
                    day_of_week: day_of_week(&local),
                    bucket,
                    activity_type: None,
                    project_id: artifact.project_id(),
                },
                bucket,
            );
            acc
        });
    acc.into_sorted()
}

/// Merges activity- and coding-derived patterns. Patterns on the same day
/// whose intervals overlap union their spans and sum their frequencies; the
/// earlier pattern's activity type and project survive the merge.
pub fn combine_patterns(
    activity_patterns: Vec<WorkPattern>,
    coding_patterns: Vec<WorkPattern>,
) -> Vec<WorkPattern> {
    let mut merged = activity_patterns.into_iter().chain(coding_patterns).fold(
        Vec::<WorkPattern>::new(),
        |mut acc, pattern| {
            let overlapping = acc.iter_mut().find(|existing| {
                existing.day_of_week == pattern.day_of_week
                    && existing.start_time <= pattern.end_time
                    && existing.end_time >= pattern.start_time
            });

            match overlapping {
                Some(existing) => {
                    existing.start_time = existing.start_time.min(pattern.start_time);
                    existing.end_time = existing.end_time.max(pattern.end_time);
                    existing.frequency += pattern.frequency;
                }
                None => acc.push(pattern),
            }
            acc
        },
    );
    sort_patterns(&mut merged);
    merged
}

fn serialize_hhmm<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&time.format("%H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    use super::*;
    use crate::models::telemetry::{CommitRecord, IssueRecord};

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn activity_at(
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        activity_type: &str,
        project_id: Option<Uuid>,
    ) -> ActivityRecord {
        ActivityRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            activity_type: activity_type.to_string(),
            application_name: None,
            window_title: None,
            start_time: start,
            end_time: end,
            duration_secs: None,
            project_id,
        }
    }

    fn session_at(recorded_at: DateTime<Utc>, project_id: Option<Uuid>) -> CodingSessionRecord {
        CodingSessionRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            project_id,
            language: Some("rust".to_string()),
            editor: None,
            duration_secs: Some(600),
            recorded_at,
        }
    }

    fn pattern(day: u8, start: NaiveTime, end: NaiveTime, frequency: u32) -> WorkPattern {
        WorkPattern {
            day_of_week: day,
            start_time: start,
            end_time: end,
            activity_type: "coding".to_string(),
            project_id: None,
            frequency,
        }
    }

    #[test]
    fn test_normalize_floors_to_quarter_hour() {
        assert_eq!(normalize_time(hm(9, 17)), hm(9, 15));
        assert_eq!(normalize_time(hm(9, 44)), hm(9, 30));
        assert_eq!(normalize_time(hm(9, 45)), hm(9, 45));
        assert_eq!(normalize_time(NaiveTime::from_hms_opt(9, 14, 59).unwrap()), hm(9, 0));
    }

    #[test]
    fn test_normalize_keeps_hour_at_zero_minutes() {
        // On-the-hour times keep their hour.
        assert_eq!(normalize_time(hm(14, 0)), hm(14, 0));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for time in [hm(0, 0), hm(9, 17), hm(23, 59)] {
            let once = normalize_time(time);
            assert_eq!(normalize_time(once), once);
        }
    }

    #[test]
    fn test_records_sharing_key_merge_with_frequency_per_record() {
        // Ten Monday 09:00–10:00 activities spread over four weeks all share
        // one key, so the miner emits exactly one pattern with frequency 10.
        let mut activities = Vec::new();
        for week in 0..4 {
            let repeats = if week == 0 { 4 } else { 2 };
            for _ in 0..repeats {
                let start = Utc
                    .with_ymd_and_hms(2026, 8, 3 + week * 7, 9, 0, 0)
                    .unwrap();
                let end = Utc.with_ymd_and_hms(2026, 8, 3 + week * 7, 10, 0, 0).unwrap();
                activities.push(activity_at(start, Some(end), "coding", None));
            }
        }
        assert_eq!(activities.len(), 10);

        let patterns = mine_activity_patterns(&activities, Tz::UTC);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].day_of_week, 1); // 2026-08-03 is a Monday
        assert_eq!(patterns[0].start_time, hm(9, 0));
        assert_eq!(patterns[0].end_time, hm(10, 0));
        assert_eq!(patterns[0].frequency, 10);
    }

    #[test]
    fn test_distinct_activity_types_do_not_merge() {
        let start = Utc.with_ymd_and_hms(2026, 8, 3, 9, 0, 0).unwrap();
        let activities = vec![
            activity_at(start, None, "coding", None),
            activity_at(start, None, "meetings", None),
        ];
        let patterns = mine_activity_patterns(&activities, Tz::UTC);
        assert_eq!(patterns.len(), 2);
    }

    #[test]
    fn test_activity_span_widens_to_latest_end() {
        let start = Utc.with_ymd_and_hms(2026, 8, 3, 9, 5, 0).unwrap();
        let short_end = Utc.with_ymd_and_hms(2026, 8, 3, 9, 35, 0).unwrap();
        let long_end = Utc.with_ymd_and_hms(2026, 8, 3, 11, 0, 0).unwrap();
        let activities = vec![
            activity_at(start, Some(short_end), "coding", None),
            activity_at(start, Some(long_end), "coding", None),
        ];
        let patterns = mine_activity_patterns(&activities, Tz::UTC);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].start_time, hm(9, 0));
        assert_eq!(patterns[0].end_time, hm(11, 0));
        assert_eq!(patterns[0].frequency, 2);
    }

    #[test]
    fn test_mining_buckets_in_user_timezone() {
        // 03:30 UTC Tuesday is 23:30 Monday in New York.
        let recorded = Utc.with_ymd_and_hms(2026, 8, 4, 3, 30, 0).unwrap();
        let patterns = mine_coding_patterns(
            &[session_at(recorded, None)],
            chrono_tz::America::New_York,
        );
        assert_eq!(patterns[0].day_of_week, 1);
        assert_eq!(patterns[0].start_time, hm(23, 30));
    }

    #[test]
    fn test_coding_sessions_key_by_project() {
        let recorded = Utc.with_ymd_and_hms(2026, 8, 3, 9, 0, 0).unwrap();
        let project_a = Some(Uuid::new_v4());
        let sessions = vec![
            session_at(recorded, project_a),
            session_at(recorded, project_a),
            session_at(recorded, None),
        ];
        let patterns = mine_coding_patterns(&sessions, Tz::UTC);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].frequency, 2);
        assert_eq!(patterns[0].project_id, project_a);
        assert_eq!(patterns[0].activity_type, "coding");
    }

    #[test]
    fn test_artifact_without_timestamp_is_skipped() {
        let commit = EngineeringArtifact::Commit(CommitRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            project_id: None,
            message: "fix flaky retry".to_string(),
            sha: "a".repeat(40),
            committed_at: None,
            external_url: "https://example.com/c/1".to_string(),
        });
        let issue = EngineeringArtifact::Issue(IssueRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            project_id: None,
            title: "Tracker drops samples".to_string(),
            body: None,
            status: "open".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 3, 10, 10, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 8, 3, 10, 10, 0).unwrap(),
            external_url: "https://example.com/i/1".to_string(),
        });

        let patterns = mine_artifact_patterns(&[commit, issue], Tz::UTC);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].activity_type, "coding");
        assert_eq!(patterns[0].start_time, hm(10, 0));
        assert_eq!(patterns[0].frequency, 1);
    }

    #[test]
    fn test_combine_unions_overlapping_same_day_intervals() {
        let activity = vec![pattern(1, hm(9, 0), hm(10, 30), 3)];
        let coding = vec![pattern(1, hm(10, 0), hm(11, 0), 2)];
        let combined = combine_patterns(activity, coding);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].start_time, hm(9, 0));
        assert_eq!(combined[0].end_time, hm(11, 0));
        assert_eq!(combined[0].frequency, 5);
    }

    #[test]
    fn test_combine_keeps_disjoint_intervals_apart() {
        let activity = vec![pattern(1, hm(9, 0), hm(10, 0), 3)];
        let coding = vec![pattern(1, hm(14, 0), hm(15, 0), 2), pattern(2, hm(9, 0), hm(10, 0), 1)];
        let combined = combine_patterns(activity, coding);
        assert_eq!(combined.len(), 3);
    }

    #[test]
    fn test_output_sorted_by_frequency_then_day_and_start() {
        let combined = combine_patterns(
            vec![pattern(3, hm(9, 0), hm(10, 0), 1), pattern(1, hm(9, 0), hm(10, 0), 4)],
            vec![pattern(1, hm(14, 0), hm(15, 0), 1)],
        );
        assert_eq!(combined[0].frequency, 4);
        // Equal frequencies: day 1 before day 3.
        assert_eq!(combined[1].day_of_week, 1);
        assert_eq!(combined[1].start_time, hm(14, 0));
        assert_eq!(combined[2].day_of_week, 3);
    }

    #[test]
    fn test_pattern_serializes_times_as_hh_mm() {
        let json = serde_json::to_value(pattern(1, hm(9, 0), hm(10, 15), 4)).unwrap();
        assert_eq!(json["start_time"], "09:00");
        assert_eq!(json["end_time"], "10:15");
        assert_eq!(json["day_of_week"], 1);
    }
}
