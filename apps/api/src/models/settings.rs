use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

/// User scheduling preferences. Read-only input to synthesis; a user without
/// a settings row gets [`UserSettingsRow::defaults`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSettingsRow {
    pub user_id: Uuid,
    /// IANA timezone name, e.g. "Europe/Berlin".
    pub time_zone: String,
    pub working_hours_start: NaiveTime,
    pub working_hours_end: NaiveTime,
    /// 0 = Sunday … 6 = Saturday.
    pub week_start_day: i16,
    pub activity_tracking_enabled: bool,
    pub calendar_sync_enabled: bool,
}

impl UserSettingsRow {
    pub fn defaults(user_id: Uuid) -> Self {
        Self {
            user_id,
            time_zone: "UTC".to_string(),
            working_hours_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            working_hours_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            week_start_day: 1,
            activity_tracking_enabled: true,
            calendar_sync_enabled: true,
        }
    }

    /// Resolved timezone. An unknown zone name degrades to UTC with a warning
    /// instead of failing the run.
    pub fn tz(&self) -> Tz {
        self.time_zone.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "Unknown timezone '{}' for user {}; falling back to UTC",
                self.time_zone, self.user_id
            );
            Tz::UTC
        })
    }

    pub fn week_start(&self) -> Weekday {
        match self.week_start_day {
            0 => Weekday::Sun,
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            _ => Weekday::Sat,
        }
    }
}
