//! Daily sending window
//!
//! The local-time range during which channel actions may execute. Local
//! time is expressed as a fixed UTC offset; clamping converts to local,
//! pins the time of day, and converts back.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Largest representable offset, fourteen hours either side of UTC.
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Window validation errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WindowError {
    /// Start hour must precede end hour
    #[error("window start hour {start} must precede end hour {end}")]
    EmptyWindow { start: u32, end: u32 },

    /// Hour outside 0..=24
    #[error("hour {0} outside 0..=24")]
    HourOutOfRange(u32),

    /// Offset outside the representable range
    #[error("utc offset {0} minutes outside +/-14h")]
    OffsetOutOfRange(i32),
}

/// Daily local-time range for channel actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendingWindow {
    /// First hour (inclusive) actions may fire, local time
    pub start_hour: u32,
    /// Hour (exclusive) after which actions must wait for the next day
    pub end_hour: u32,
    /// Fixed offset from UTC, in minutes
    pub utc_offset_minutes: i32,
}

impl SendingWindow {
    /// Create a window, validating its bounds.
    pub fn new(start_hour: u32, end_hour: u32, utc_offset_minutes: i32) -> Result<Self, WindowError> {
        let window = Self {
            start_hour,
            end_hour,
            utc_offset_minutes,
        };
        window.validate()?;
        Ok(window)
    }

    /// Check the window invariants.
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.start_hour >= 24 {
            return Err(WindowError::HourOutOfRange(self.start_hour));
        }
        if self.end_hour > 24 {
            return Err(WindowError::HourOutOfRange(self.end_hour));
        }
        if self.start_hour >= self.end_hour {
            return Err(WindowError::EmptyWindow {
                start: self.start_hour,
                end: self.end_hour,
            });
        }
        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(WindowError::OffsetOutOfRange(self.utc_offset_minutes));
        }
        Ok(())
    }

    /// The window start (`start_hour:00:00` local) on `instant`'s local day,
    /// as a UTC instant.
    ///
    /// The day itself is kept; an instant already past the start hour clamps
    /// backwards to the same day's start, making the action immediately due.
    #[must_use]
    pub fn clamp_to_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let offset = self.offset();
        let local = instant + offset;
        let start = local.date_naive().and_time(self.start_time());
        DateTime::from_naive_utc_and_offset(start, Utc) - offset
    }

    /// Whether `instant` falls inside `[start_hour, end_hour)` local time.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let hour = (instant + self.offset()).hour();
        hour >= self.start_hour && hour < self.end_hour
    }

    /// The local calendar date of `instant` under this window's offset.
    #[inline]
    #[must_use]
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        (instant + self.offset()).date_naive()
    }

    fn offset(&self) -> Duration {
        Duration::minutes(i64::from(self.utc_offset_minutes))
    }

    fn start_time(&self) -> NaiveTime {
        // start_hour < 24 holds for every validated window
        NaiveTime::from_hms_opt(self.start_hour, 0, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for SendingWindow {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
            utc_offset_minutes: 0,
        }
    }
}
