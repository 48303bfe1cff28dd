//! Deadline-bounded planning for assignments.

use chrono::NaiveDateTime;
use tracing::debug;

use super::{ScheduledItem, content_for};
use crate::config::ExpansionConfig;
use crate::recurrence::{ReminderDescriptor, expand};

/// Expand an assignment's reminders from its anchor up to and including its
/// deadline.
///
/// A non-repeating reminder yields at most one item. An anchor already in
/// the past yields nothing.
pub fn plan_assignment(
    descriptor: &ReminderDescriptor,
    now: NaiveDateTime,
    limits: &ExpansionConfig,
) -> Vec<ScheduledItem> {
    let cap = limits.cap_for(descriptor.recurrence.cadence());
    let instants = expand(
        descriptor.anchor,
        &descriptor.recurrence,
        descriptor.deadline,
        now,
        cap,
    );
    debug!(
        task_id = descriptor.task_id,
        count = instants.len(),
        recurrence = %descriptor.recurrence,
        "planned assignment reminders"
    );

    instants
        .into_iter()
        .enumerate()
        .map(|(occurrence, at)| ScheduledItem {
            at,
            content: content_for(descriptor, occurrence),
        })
        .collect()
}
