//! VALIDATING stage — pure constraint checks over the refined task list.
//!
//! Violating events are dropped with a logged reason, never auto-corrected.
//! An empty surviving set is a valid outcome.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::models::settings::UserSettingsRow;
use crate::models::telemetry::LockedCalendarEvent;
use crate::synthesis::context::WeekBounds;
use crate::synthesis::pipeline::DetailedTask;

/// Minimum break between any two events for the same user.
pub const MIN_GAP_MINUTES: i64 = 15;
/// Longest allowed single event.
pub const MAX_EVENT_MINUTES: i64 = 180;

#[derive(Debug, PartialEq)]
enum RejectReason {
    NonPositiveDuration,
    TooLong(i64),
    OutsideWeek,
    OutsideWorkingHours,
    PriorityOutOfRange(i32),
    ConflictsWithLocked(String),
    ConflictsWithSuggestion(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NonPositiveDuration => write!(f, "end does not follow start"),
            RejectReason::TooLong(minutes) => {
                write!(f, "duration {minutes}min exceeds {MAX_EVENT_MINUTES}min")
            }
            RejectReason::OutsideWeek => write!(f, "outside the target week"),
            RejectReason::OutsideWorkingHours => write!(f, "outside the working-hour window"),
            RejectReason::PriorityOutOfRange(p) => write!(f, "priority {p} not in 1..=5"),
            RejectReason::ConflictsWithLocked(title) => {
                write!(f, "under {MIN_GAP_MINUTES}min from locked event '{title}'")
            }
            RejectReason::ConflictsWithSuggestion(title) => {
                write!(f, "under {MIN_GAP_MINUTES}min from suggestion '{title}'")
            }
        }
    }
}

/// Applies every per-event constraint, then a chronological greedy pass for
/// the pairwise gap rule: earlier events win, later conflicting ones drop.
pub fn validate_events(
    tasks: Vec<DetailedTask>,
    week: &WeekBounds,
    settings: &UserSettingsRow,
    locked_events: &[LockedCalendarEvent],
) -> Vec<DetailedTask> {
    let tz = settings.tz();

    let mut ordered = tasks;
    ordered.sort_by_key(|task| task.suggested_start_time);

    let mut accepted: Vec<DetailedTask> = Vec::new();
    for task in ordered {
        match check_task(&task, week, settings, tz, locked_events, &accepted) {
            Ok(()) => accepted.push(task),
            Err(reason) => info!(
                "Dropping suggested event '{}' [{} – {}]: {reason}",
                task.title, task.suggested_start_time, task.suggested_end_time
            ),
        }
    }
    accepted
}

fn check_task(
    task: &DetailedTask,
    week: &WeekBounds,
    settings: &UserSettingsRow,
    tz: Tz,
    locked_events: &[LockedCalendarEvent],
    accepted: &[DetailedTask],
) -> Result<(), RejectReason> {
    let duration = task.suggested_end_time - task.suggested_start_time;
    if duration <= Duration::zero() {
        return Err(RejectReason::NonPositiveDuration);
    }
    if duration > Duration::minutes(MAX_EVENT_MINUTES) {
        return Err(RejectReason::TooLong(duration.num_minutes()));
    }

    if task.suggested_start_time < week.start || task.suggested_end_time > week.end {
        return Err(RejectReason::OutsideWeek);
    }

    let local_start = task.suggested_start_time.with_timezone(&tz);
    let local_end = task.suggested_end_time.with_timezone(&tz);
    if local_start.time() < settings.working_hours_start
        || local_end.time() > settings.working_hours_end
        || local_end.time() < local_start.time()
    {
        return Err(RejectReason::OutsideWorkingHours);
    }

    if !(1..=5).contains(&task.priority) {
        return Err(RejectReason::PriorityOutOfRange(task.priority));
    }

    for locked in locked_events {
        if too_close(
            task.suggested_start_time,
            task.suggested_end_time,
            locked.start_time,
            locked.end_time,
        ) {
            return Err(RejectReason::ConflictsWithLocked(locked.title.clone()));
        }
    }

    for other in accepted {
        if too_close(
            task.suggested_start_time,
            task.suggested_end_time,
            other.suggested_start_time,
            other.suggested_end_time,
        ) {
            return Err(RejectReason::ConflictsWithSuggestion(other.title.clone()));
        }
    }

    Ok(())
}

/// True when the two intervals overlap or sit closer than the minimum gap.
fn too_close(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    let gap = Duration::minutes(MIN_GAP_MINUTES);
    a_start < b_end + gap && b_start < a_end + gap
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Weekday};
    use uuid::Uuid;

    use super::*;
    use crate::synthesis::context::next_week_bounds;

    fn fixture() -> (WeekBounds, UserSettingsRow) {
        // Week of Monday 2026-08-10, UTC, 09:00–17:00.
        let now = Utc.with_ymd_and_hms(2026, 8, 4, 12, 0, 0).unwrap();
        let week = next_week_bounds(now, Tz::UTC, Weekday::Mon);
        let settings = UserSettingsRow::defaults(Uuid::new_v4());
        (week, settings)
    }

    fn task(title: &str, start: DateTime<Utc>, end: DateTime<Utc>, priority: i32) -> DetailedTask {
        DetailedTask {
            title: title.to_string(),
            suggested_start_time: start,
            suggested_end_time: end,
            priority,
            description: None,
            steps: None,
            background: None,
            challenges: None,
        }
    }

    fn monday(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 10, hour, minute, 0).unwrap()
    }

    fn locked(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> LockedCalendarEvent {
        LockedCalendarEvent {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            start_time: start,
            end_time: end,
            location: None,
            is_all_day: false,
            recurrence_rule: None,
            external_calendar_id: None,
        }
    }

    #[test]
    fn test_well_formed_event_survives() {
        let (week, settings) = fixture();
        let survivors = validate_events(
            vec![task("ok", monday(9, 0), monday(10, 0), 2)],
            &week,
            &settings,
            &[],
        );
        assert_eq!(survivors.len(), 1);
    }

    #[test]
    fn test_four_hour_event_is_dropped() {
        let (week, settings) = fixture();
        let survivors = validate_events(
            vec![task("marathon", monday(9, 0), monday(13, 0), 2)],
            &week,
            &settings,
            &[],
        );
        assert!(survivors.is_empty());
    }

    #[test]
    fn test_exactly_three_hours_is_allowed() {
        let (week, settings) = fixture();
        let survivors = validate_events(
            vec![task("long block", monday(9, 0), monday(12, 0), 2)],
            &week,
            &settings,
            &[],
        );
        assert_eq!(survivors.len(), 1);
    }

    #[test]
    fn test_event_outside_week_is_dropped() {
        let (week, settings) = fixture();
        // Monday of the *current* week, not the target week.
        let start = Utc.with_ymd_and_hms(2026, 8, 3, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let survivors =
            validate_events(vec![task("stale", start, end, 2)], &week, &settings, &[]);
        assert!(survivors.is_empty());
    }

    #[test]
    fn test_event_outside_working_hours_is_dropped() {
        let (week, settings) = fixture();
        let survivors = validate_events(
            vec![
                task("dawn", monday(6, 0), monday(7, 0), 2),
                task("late", monday(16, 30), monday(17, 30), 2),
            ],
            &week,
            &settings,
            &[],
        );
        assert!(survivors.is_empty());
    }

    #[test]
    fn test_working_hours_use_the_user_timezone() {
        let (week, mut settings) = fixture();
        settings.time_zone = "America/New_York".to_string();
        // 13:00 UTC = 09:00 EDT: inside the window locally, before it in UTC.
        let survivors = validate_events(
            vec![task("east-coast morning", monday(13, 0), monday(14, 0), 2)],
            &week,
            &settings,
            &[],
        );
        assert_eq!(survivors.len(), 1);
    }

    #[test]
    fn test_priority_out_of_range_is_dropped() {
        let (week, settings) = fixture();
        let survivors = validate_events(
            vec![
                task("zero", monday(9, 0), monday(10, 0), 0),
                task("six", monday(11, 0), monday(12, 0), 6),
            ],
            &week,
            &settings,
            &[],
        );
        assert!(survivors.is_empty());
    }

    #[test]
    fn test_inverted_interval_is_dropped() {
        let (week, settings) = fixture();
        let survivors = validate_events(
            vec![task("backwards", monday(11, 0), monday(10, 0), 2)],
            &week,
            &settings,
            &[],
        );
        assert!(survivors.is_empty());
    }

    #[test]
    fn test_locked_event_blocks_overlap_and_near_misses() {
        let (week, settings) = fixture();
        let locked_events = vec![locked("standup", monday(10, 0), monday(11, 0))];

        let survivors = validate_events(
            vec![
                task("overlapping", monday(10, 30), monday(11, 30), 2),
                task("too close after", monday(11, 5), monday(12, 0), 2),
                task("exactly 15min after", monday(11, 15), monday(12, 15), 2),
            ],
            &week,
            &settings,
            &locked_events,
        );

        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].title, "exactly 15min after");
    }

    #[test]
    fn test_suggestions_keep_minimum_gap_between_each_other() {
        let (week, settings) = fixture();
        let survivors = validate_events(
            vec![
                task("first", monday(9, 0), monday(10, 0), 2),
                task("back to back", monday(10, 0), monday(11, 0), 2),
                task("respectful", monday(10, 15), monday(11, 15), 3),
            ],
            &week,
            &settings,
            &[],
        );

        // "back to back" loses to "first"; "respectful" starts 15min after
        // "first" ends but collides with nothing that survived before it.
        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[0].title, "first");
        assert_eq!(survivors[1].title, "respectful");
    }

    #[test]
    fn test_zero_survivors_is_not_an_error() {
        let (week, settings) = fixture();
        let survivors = validate_events(vec![], &week, &settings, &[]);
        assert!(survivors.is_empty());
    }

    #[test]
    fn test_survivors_pairwise_gap_property() {
        let (week, settings) = fixture();
        let tasks: Vec<DetailedTask> = (0..10)
            .map(|i| {
                let start = monday(9, 0) + Duration::minutes(i * 20);
                task(&format!("t{i}"), start, start + Duration::minutes(30), 3)
            })
            .collect();

        let survivors = validate_events(tasks, &week, &settings, &[]);
        for pair in survivors.windows(2) {
            let gap = pair[1].suggested_start_time - pair[0].suggested_end_time;
            assert!(gap >= Duration::minutes(MIN_GAP_MINUTES));
            let duration = pair[0].suggested_end_time - pair[0].suggested_start_time;
            assert!(duration <= Duration::minutes(MAX_EVENT_MINUTES));
        }
    }
}
