//! Wall-clock source and calendar arithmetic.
//!
//! All reminder instants are wall-clock times in the user's local calendar
//! (`NaiveDateTime`), at minute precision. "Now" is never read directly from
//! the system inside the engine: every planning call receives it from a
//! [`Clock`], so tests can pin it with [`FixedClock`].
//!
//! The month/year helpers clamp to the last day of the target month
//! (Jan 31 + 1 month = Feb 28/29, Feb 29 + 1 year = Feb 28).

use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, Timelike};
use std::sync::Mutex;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Current local time, truncated to the minute.
    fn now(&self) -> NaiveDateTime;
}

/// [`Clock`] backed by the system's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        truncate_to_minute(Local::now().naive_local())
    }
}

/// A settable clock for tests and previews.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    /// Create a clock pinned at `now`.
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: NaiveDateTime) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    /// Advance the clock by `days` whole days.
    pub fn advance_days(&self, days: u64) {
        let current = self.now();
        if let Some(next) = add_days(current, days) {
            self.set(next);
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// `t + days`, or `None` past the end of the calendar.
pub fn add_days(t: NaiveDateTime, days: u64) -> Option<NaiveDateTime> {
    t.checked_add_days(Days::new(days))
}

/// `t + weeks · 7 days`.
pub fn add_weeks(t: NaiveDateTime, weeks: u64) -> Option<NaiveDateTime> {
    add_days(t, weeks.checked_mul(7)?)
}

/// `t + months`, keeping the time of day and clamping the day of month to
/// the last day of the target month.
pub fn add_months(t: NaiveDateTime, months: u64) -> Option<NaiveDateTime> {
    let total = i64::from(t.year())
        .checked_mul(12)?
        .checked_add(i64::from(t.month0()))?
        .checked_add(i64::try_from(months).ok()?)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    let day = t.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).map(|date| date.and_time(t.time()))
}

/// `t + years`; Feb 29 lands on Feb 28 in non-leap years.
pub fn add_years(t: NaiveDateTime, years: u64) -> Option<NaiveDateTime> {
    add_months(t, years.checked_mul(12)?)
}

/// Number of days in `month` (1-12) of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    (28..=31)
        .rev()
        .find(|day| NaiveDate::from_ymd_opt(year, month, *day).is_some())
        .unwrap_or(28)
}

/// Sunday 00:00 of the calendar week containing `t`.
pub fn start_of_week(t: NaiveDateTime) -> Option<NaiveDateTime> {
    let back = u64::from(t.weekday().num_days_from_sunday());
    t.date()
        .checked_sub_days(Days::new(back))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Weekday index of `t`, 0 = Sunday … 6 = Saturday.
pub fn weekday_index(t: NaiveDateTime) -> u8 {
    // num_days_from_sunday is always 0..=6
    t.weekday().num_days_from_sunday() as u8
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn truncate_drops_seconds() {
        let t = NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_milli_opt(10, 15, 42, 250)
            .unwrap();
        assert_eq!(truncate_to_minute(t), at(2025, 3, 4, 10, 15));
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(add_months(at(2025, 1, 31, 9, 0), 1), Some(at(2025, 2, 28, 9, 0)));
        assert_eq!(add_months(at(2024, 1, 31, 9, 0), 1), Some(at(2024, 2, 29, 9, 0)));
        assert_eq!(add_months(at(2025, 1, 31, 9, 0), 3), Some(at(2025, 4, 30, 9, 0)));
    }

    #[test]
    fn add_months_rolls_year() {
        assert_eq!(add_months(at(2025, 11, 15, 7, 30), 3), Some(at(2026, 2, 15, 7, 30)));
        assert_eq!(add_months(at(2025, 12, 1, 0, 0), 12), Some(at(2026, 12, 1, 0, 0)));
    }

    #[test]
    fn add_years_handles_leap_day() {
        assert_eq!(add_years(at(2024, 2, 29, 8, 0), 1), Some(at(2025, 2, 28, 8, 0)));
        assert_eq!(add_years(at(2024, 2, 29, 8, 0), 4), Some(at(2028, 2, 29, 8, 0)));
    }

    #[test]
    fn start_of_week_is_sunday_midnight() {
        // 2025-01-01 is a Wednesday.
        assert_eq!(start_of_week(at(2025, 1, 1, 13, 45)), Some(at(2024, 12, 29, 0, 0)));
        // A Sunday maps to itself.
        assert_eq!(start_of_week(at(2024, 12, 29, 23, 59)), Some(at(2024, 12, 29, 0, 0)));
    }

    #[test]
    fn weekday_index_starts_at_sunday() {
        assert_eq!(weekday_index(at(2024, 12, 29, 0, 0)), 0);
        assert_eq!(weekday_index(at(2025, 1, 1, 0, 0)), 3);
        assert_eq!(weekday_index(at(2025, 1, 4, 0, 0)), 6);
    }

    #[test]
    fn days_in_month_knows_february() {
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn fixed_clock_can_be_moved() {
        let clock = FixedClock::new(at(2025, 1, 1, 9, 0));
        assert_eq!(clock.now(), at(2025, 1, 1, 9, 0));
        clock.advance_days(2);
        assert_eq!(clock.now(), at(2025, 1, 3, 9, 0));
        clock.set(at(2030, 6, 1, 0, 0));
        assert_eq!(clock.now(), at(2030, 6, 1, 0, 0));
    }
}
