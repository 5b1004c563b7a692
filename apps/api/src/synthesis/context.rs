//! Target-week computation and the structured context handed to DRAFTING.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::project::ProjectRow;
use crate::models::settings::UserSettingsRow;
use crate::models::telemetry::LockedCalendarEvent;
use crate::patterns::WorkPattern;
use crate::telemetry::aggregator::TelemetryBundle;
use crate::telemetry::summary::{summarize_activity_types, summarize_languages, SummaryEntry};

/// Mined patterns passed to the prompt, per source family.
pub const MAX_CONTEXT_PATTERNS: usize = 10;
/// Projects passed to the prompt.
pub const MAX_CONTEXT_PROJECTS: usize = 5;

/// The upcoming week in the user's timezone, converted to UTC bounds.
#[derive(Debug, Clone)]
pub struct WeekBounds {
    pub start: DateTime<Utc>,
    /// Exclusive: first instant after the week.
    pub end: DateTime<Utc>,
    pub dates: Vec<NaiveDate>,
}

/// Computes next week's bounds: the week (per the user's week-start day)
/// containing today-plus-seven-days, local midnight to local midnight.
pub fn next_week_bounds(now: DateTime<Utc>, tz: Tz, week_start: Weekday) -> WeekBounds {
    let today = now.with_timezone(&tz).date_naive();
    let first_day = (today + Duration::days(7)).week(week_start).first_day();

    let dates: Vec<NaiveDate> = (0..7).map(|i| first_day + Duration::days(i)).collect();
    WeekBounds {
        start: local_midnight_utc(tz, first_day),
        end: local_midnight_utc(tz, first_day + Duration::days(7)),
        dates,
    }
}

/// Local midnight in UTC. A midnight erased by a DST gap resolves to the
/// earliest valid local instant; a repeated one to its first occurrence.
fn local_midnight_utc(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Serialize)]
pub struct PreferencesContext {
    pub time_zone: String,
    pub working_hours_start: String,
    pub working_hours_end: String,
    /// 0 = Sunday … 6 = Saturday.
    pub week_start_day: i16,
}

#[derive(Debug, Serialize)]
pub struct LockedEventContext {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub is_all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectContext {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Everything DRAFTING sees, serialized verbatim into the prompt.
#[derive(Debug, Serialize)]
pub struct SynthesisContext {
    pub preferences: PreferencesContext,
    /// ISO dates of the target week, in order.
    pub week_dates: Vec<String>,
    /// Already-scheduled events. Presented as immutable constraints.
    pub locked_events: Vec<LockedEventContext>,
    /// Combined activity + coding patterns, highest frequency first.
    pub work_patterns: Vec<WorkPattern>,
    /// Patterns mined from issues/PRs/commits.
    pub artifact_patterns: Vec<WorkPattern>,
    pub projects: Vec<ProjectContext>,
    pub top_activity_types: Vec<SummaryEntry>,
    pub top_languages: Vec<SummaryEntry>,
}

pub fn build_context(
    settings: &UserSettingsRow,
    week: &WeekBounds,
    bundle: &TelemetryBundle,
    mut work_patterns: Vec<WorkPattern>,
    mut artifact_patterns: Vec<WorkPattern>,
    projects: &[ProjectRow],
) -> SynthesisContext {
    work_patterns.truncate(MAX_CONTEXT_PATTERNS);
    artifact_patterns.truncate(MAX_CONTEXT_PATTERNS);

    SynthesisContext {
        preferences: PreferencesContext {
            time_zone: settings.time_zone.clone(),
            working_hours_start: settings.working_hours_start.format("%H:%M").to_string(),
            working_hours_end: settings.working_hours_end.format("%H:%M").to_string(),
            week_start_day: settings.week_start_day,
        },
        week_dates: week.dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
        locked_events: bundle
            .locked_events
            .iter()
            .map(|event| LockedEventContext {
                title: event.title.clone(),
                start_time: event.start_time,
                end_time: event.end_time,
                location: event.location.clone(),
                is_all_day: event.is_all_day,
                recurrence_rule: event.recurrence_rule.clone(),
            })
            .collect(),
        work_patterns,
        artifact_patterns,
        projects: projects
            .iter()
            .take(MAX_CONTEXT_PROJECTS)
            .map(|project| ProjectContext {
                id: project.id.to_string(),
                name: project.name.clone(),
                description: project.description.clone(),
            })
            .collect(),
        top_activity_types: summarize_activity_types(&bundle.activities),
        top_languages: summarize_languages(&bundle.coding_sessions),
    }
}
