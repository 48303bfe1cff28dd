//! Recurrence expansion: descriptor → concrete future instants.
//!
//! [`expand`] is pure. It never reads the clock and never allocates more
//! than `cap` instants. The output is strictly increasing, contains only
//! instants in `(now, window_end]`, and never back-fills occurrences that
//! are already in the past.

use chrono::NaiveDateTime;

use super::types::{CustomUnit, Recurrence};
use super::weekdays::{WeekdaySet, weekday_to_index};
use crate::clock::{add_days, add_months, add_weeks, add_years, start_of_week};

/// Expand `recurrence` starting at `anchor` into at most `cap` instants in
/// `(now, window_end]`.
pub fn expand(
    anchor: NaiveDateTime,
    recurrence: &Recurrence,
    window_end: NaiveDateTime,
    now: NaiveDateTime,
    cap: usize,
) -> Vec<NaiveDateTime> {
    if cap == 0 {
        return Vec::new();
    }

    let window = Window {
        now,
        end: window_end,
        cap,
    };

    match *recurrence {
        Recurrence::Once => {
            if now < anchor && anchor <= window_end {
                vec![anchor]
            } else {
                Vec::new()
            }
        }
        Recurrence::Daily { every } => fixed_days(anchor, u64::from(every.get()), window),
        Recurrence::Weekly { every, weekdays } if weekdays.is_empty() => {
            fixed_days(anchor, u64::from(every.get()) * 7, window)
        }
        Recurrence::Weekly { every, weekdays } => {
            selected_weekdays(anchor, u64::from(every.get()), weekdays, window)
        }
        Recurrence::Monthly { every } => {
            let every = u64::from(every.get());
            stepped(window, |k| add_months(anchor, k.checked_mul(every)?))
        }
        Recurrence::Yearly { every } => {
            let every = u64::from(every.get());
            stepped(window, |k| add_years(anchor, k.checked_mul(every)?))
        }
        Recurrence::Custom { every, unit } => {
            let every = u64::from(every.get());
            match unit {
                CustomUnit::Days => fixed_days(anchor, every, window),
                CustomUnit::Weeks => fixed_days(anchor, every * 7, window),
                CustomUnit::Months => stepped(window, |k| add_months(anchor, k.checked_mul(every)?)),
                CustomUnit::Years => stepped(window, |k| add_years(anchor, k.checked_mul(every)?)),
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    now: NaiveDateTime,
    end: NaiveDateTime,
    cap: usize,
}

/// Walk `occurrence(0), occurrence(1), …` until past the window end or the cap.
///
/// `occurrence` must be strictly increasing in `k`.
fn stepped<F>(window: Window, occurrence: F) -> Vec<NaiveDateTime>
where
    F: Fn(u64) -> Option<NaiveDateTime>,
{
    stepped_from(0, window, occurrence)
}

fn stepped_from<F>(first: u64, window: Window, occurrence: F) -> Vec<NaiveDateTime>
where
    F: Fn(u64) -> Option<NaiveDateTime>,
{
    let mut out = Vec::new();
    let mut k = first;
    while let Some(t) = occurrence(k) {
        if t > window.end {
            break;
        }
        if t > window.now {
            out.push(t);
            if out.len() >= window.cap {
                break;
            }
        }
        let Some(next) = k.checked_add(1) else {
            break;
        };
        k = next;
    }
    out
}

/// Fixed-length steps of `step_days` days from `anchor`.
///
/// Skips straight to the step just before `now` so a long-past anchor does
/// not walk every elapsed occurrence.
fn fixed_days(anchor: NaiveDateTime, step_days: u64, window: Window) -> Vec<NaiveDateTime> {
    let elapsed_days = (window.now - anchor).num_days();
    let first = u64::try_from(elapsed_days)
        .map(|days| days / step_days)
        .unwrap_or(0);
    stepped_from(first, window, |k| add_days(anchor, k.checked_mul(step_days)?))
}

/// Selected weekdays at the anchor's time of day, every `every_weeks` weeks.
///
/// Walks Sunday-aligned weeks starting with the current calendar week (the
/// week containing `now`). Only the anchor's time of day is used, so selected
/// days before the anchor's date still fire if they are after `now`.
fn selected_weekdays(
    anchor: NaiveDateTime,
    every_weeks: u64,
    weekdays: WeekdaySet,
    window: Window,
) -> Vec<NaiveDateTime> {
    let mut out = Vec::new();
    let time = anchor.time();
    let Some(mut week) = start_of_week(window.now) else {
        return out;
    };

    while week <= window.end {
        for day in weekdays.iter() {
            let Some(date) = add_days(week, u64::from(weekday_to_index(day))) else {
                return out;
            };
            let t = date.date().and_time(time);
            if t > window.now && t <= window.end {
                out.push(t);
                if out.len() >= window.cap {
                    return out;
                }
            }
        }
        match add_weeks(week, every_weeks) {
            Some(next) => week = next,
            None => break,
        }
    }
    out
}
