//! Business-day offset arithmetic
//!
//! A business day is any calendar day that is not Saturday or Sunday.
//! No holiday calendar is consulted.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

/// Whether the instant falls on a weekday.
#[inline]
#[must_use]
pub fn is_business_day(instant: DateTime<Utc>) -> bool {
    !matches!(instant.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Advance `start` by `n` business days, preserving the time of day.
///
/// Weekend days are skipped while counting, so one business day after a
/// Friday is the following Monday. `n = 0` returns `start` unchanged; a
/// weekend start is NOT snapped forward to the next weekday.
#[must_use]
pub fn add_business_days(start: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    let mut current = start;
    let mut remaining = n;
    while remaining > 0 {
        current += Duration::days(1);
        if is_business_day(current) {
            remaining -= 1;
        }
    }
    current
}

/// Advance `start` by `n` plain calendar days.
///
/// Used by sequences configured to send on weekends.
#[inline]
#[must_use]
pub fn add_calendar_days(start: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    start + Duration::days(i64::from(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 14, 45, 0).unwrap()
    }

    #[test]
    fn zero_offset_is_identity() {
        // 2025-06-07 is a Saturday; n = 0 must not snap forward.
        let saturday = at(2025, 6, 7);
        assert_eq!(add_business_days(saturday, 0), saturday);

        let wednesday = at(2025, 6, 4);
        assert_eq!(add_business_days(wednesday, 0), wednesday);
    }

    #[test]
    fn friday_plus_one_is_monday() {
        let friday = at(2025, 6, 6);
        let result = add_business_days(friday, 1);
        assert_eq!(result.date_naive().to_string(), "2025-06-09");
        assert_eq!(result.weekday(), Weekday::Mon);
    }

    #[test]
    fn friday_plus_five_is_next_friday() {
        let friday = at(2025, 6, 6);
        let result = add_business_days(friday, 5);
        assert_eq!(result.date_naive().to_string(), "2025-06-13");
        assert_eq!(result.weekday(), Weekday::Fri);
    }

    #[test]
    fn time_of_day_is_preserved() {
        let monday = at(2025, 6, 2);
        let result = add_business_days(monday, 3);
        assert_eq!(result.time(), monday.time());
    }

    #[test]
    fn weekend_start_counts_from_next_weekday() {
        // Saturday + 1 business day lands on Monday.
        let saturday = at(2025, 6, 7);
        let result = add_business_days(saturday, 1);
        assert_eq!(result.weekday(), Weekday::Mon);
    }

    #[test]
    fn calendar_days_include_weekends() {
        let friday = at(2025, 6, 6);
        let result = add_calendar_days(friday, 2);
        assert_eq!(result.weekday(), Weekday::Sun);
    }
}
