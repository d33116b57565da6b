//! Roster clock — resolves "today" in the configured local timezone.
//!
//! The offset is injected from config rather than read from the host
//! timezone: the roster's day boundary belongs to the school, not to
//! whatever machine happens to run the dispatcher.

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};

#[derive(Debug, Clone)]
pub struct RosterClock {
    utc_offset_minutes: i64,
    fixed_today: Option<NaiveDate>,
}

impl RosterClock {
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self {
            utc_offset_minutes: utc_offset_minutes as i64,
            fixed_today: None,
        }
    }

    /// A clock pinned to one date. Used in tests and for --date overrides.
    pub fn fixed(date: NaiveDate) -> Self {
        Self {
            utc_offset_minutes: 0,
            fixed_today: Some(date),
        }
    }

    pub fn local_now(&self) -> NaiveDateTime {
        (Utc::now() + Duration::minutes(self.utc_offset_minutes)).naive_utc()
    }

    pub fn today(&self) -> NaiveDate {
        match self.fixed_today {
            Some(date) => date,
            None => self.local_now().date(),
        }
    }

    /// English day-of-week name, the key duty plans are stored under.
    pub fn day_name(date: NaiveDate) -> String {
        date.format("%A").to_string()
    }
}
