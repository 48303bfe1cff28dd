//! Planning for schedules and activities.
//!
//! These categories have no hard deadline. With an explicit end window the
//! reminders are expanded up to `now + months`. Open-ended patterns that the
//! OS can repeat on its own (every day, every week on fixed weekdays, every
//! month, every year) are registered natively. Anything else is expanded
//! over the default horizon.

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use super::{PeriodicRegistration, Plan, ScheduledItem, content_for};
use crate::clock::add_months;
use crate::config::ExpansionConfig;
use crate::notify::scheduler::PeriodicPattern;
use crate::recurrence::{EndCondition, Recurrence, ReminderDescriptor, expand};

/// Plan an open-window reminder.
pub fn plan_open(descriptor: &ReminderDescriptor, now: NaiveDateTime, limits: &ExpansionConfig) -> Plan {
    if let Some(patterns) = native_patterns(descriptor) {
        debug!(
            task_id = descriptor.task_id,
            count = patterns.len(),
            recurrence = %descriptor.recurrence,
            "planned native periodic reminder"
        );
        return Plan::NativePeriodic(
            patterns
                .into_iter()
                .enumerate()
                .map(|(occurrence, pattern)| PeriodicRegistration {
                    pattern,
                    content: content_for(descriptor, occurrence),
                })
                .collect(),
        );
    }

    let Some(window_end) = window_end(descriptor.end, now, limits) else {
        warn!(task_id = descriptor.task_id, "reminder window end out of range, nothing planned");
        return Plan::Expand(Vec::new());
    };

    let cap = limits.cap_for(descriptor.recurrence.cadence());
    let instants = expand(descriptor.anchor, &descriptor.recurrence, window_end, now, cap);
    debug!(
        task_id = descriptor.task_id,
        count = instants.len(),
        %window_end,
        recurrence = %descriptor.recurrence,
        "planned open-window reminders"
    );

    Plan::Expand(
        instants
            .into_iter()
            .enumerate()
            .map(|(occurrence, at)| ScheduledItem {
                at,
                content: content_for(descriptor, occurrence),
            })
            .collect(),
    )
}

/// Last instant an expanded open-window reminder may fire.
pub fn window_end(end: EndCondition, now: NaiveDateTime, limits: &ExpansionConfig) -> Option<NaiveDateTime> {
    let months = match end {
        EndCondition::AfterMonths { months } => u32::from(months),
        EndCondition::Never => limits.default_horizon_months,
    };
    add_months(now, u64::from(months))
}

/// OS repeat triggers for `descriptor`, or `None` when it must be expanded.
///
/// Only open-ended patterns with a multiplier of one qualify, since OS
/// repeat triggers cannot skip periods. Time fields come from the anchor.
///
/// A monthly trigger keeps the anchor's day of month as is. Unlike
/// expansion, which clamps to the last day, a day-31 trigger does not fire
/// in shorter months.
pub fn native_patterns(descriptor: &ReminderDescriptor) -> Option<Vec<PeriodicPattern>> {
    if descriptor.end != EndCondition::Never {
        return None;
    }
    if descriptor.recurrence.every().is_none_or(|every| every.get() != 1) {
        return None;
    }

    let anchor = descriptor.anchor;
    let (hour, minute) = (anchor.hour(), anchor.minute());
    let patterns = match descriptor.recurrence {
        Recurrence::Daily { .. } => vec![PeriodicPattern::Daily { hour, minute }],
        Recurrence::Weekly { weekdays, .. } if !weekdays.is_empty() => weekdays
            .iter()
            .map(|weekday| PeriodicPattern::Weekly {
                weekday,
                hour,
                minute,
            })
            .collect(),
        Recurrence::Monthly { .. } => vec![PeriodicPattern::Monthly {
            day: anchor.day(),
            hour,
            minute,
        }],
        Recurrence::Yearly { .. } => vec![PeriodicPattern::Yearly {
            month: anchor.month(),
            day: anchor.day(),
            hour,
            minute,
        }],
        _ => return None,
    };
    Some(patterns)
}
