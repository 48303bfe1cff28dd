//! Turning a [`ReminderDescriptor`] into something the dispatcher can register.
//!
//! Assignments are bounded by their deadline and always expand into
//! one-shot instants ([`assignment`]). Schedules and activities are bounded
//! by an end window or open-ended; simple open-ended patterns are handed to
//! the OS as repeating triggers instead ([`open`]).

pub mod assignment;
pub mod open;

use chrono::NaiveDateTime;

use crate::config::ExpansionConfig;
use crate::notify::scheduler::{NotificationContent, PeriodicPattern};
use crate::recurrence::{Category, ReminderDescriptor};

pub use assignment::plan_assignment;
pub use open::plan_open;

/// A one-shot notification to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledItem {
    /// Fire time, local wall clock.
    pub at: NaiveDateTime,
    /// What to show.
    pub content: NotificationContent,
}

/// A notification the OS repeats on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicRegistration {
    /// Repeat rule.
    pub pattern: PeriodicPattern,
    /// What to show.
    pub content: NotificationContent,
}

/// Result of planning one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Concrete instants, each registered once.
    Expand(Vec<ScheduledItem>),
    /// OS-repeating registrations forming one logical reminder.
    NativePeriodic(Vec<PeriodicRegistration>),
}

impl Plan {
    /// Number of registrations this plan will attempt.
    pub fn len(&self) -> usize {
        match self {
            Self::Expand(items) => items.len(),
            Self::NativePeriodic(registrations) => registrations.len(),
        }
    }

    /// Whether nothing needs registering.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plan `descriptor` with the strategy for its category.
pub fn plan(descriptor: &ReminderDescriptor, now: NaiveDateTime, limits: &ExpansionConfig) -> Plan {
    match descriptor.category {
        Category::Assignment => Plan::Expand(plan_assignment(descriptor, now, limits)),
        Category::Schedule | Category::Activity => plan_open(descriptor, now, limits),
    }
}

/// Notification content for the `occurrence`-th registration of `descriptor`.
pub(crate) fn content_for(descriptor: &ReminderDescriptor, occurrence: usize) -> NotificationContent {
    NotificationContent::new(descriptor.title.clone(), descriptor.body.clone())
        .with_meta("task_id", descriptor.task_id)
        .with_meta("occurrence", occurrence)
        .with_meta("category", descriptor.category)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::recurrence::{RecurrenceMode, TaskRecord};
    use chrono::NaiveDate;

    fn at(m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn descriptor(category: Category) -> ReminderDescriptor {
        let mut record = TaskRecord::new(11, "Standup", category, at(1, 10, 9));
        record.reminder_enabled = true;
        record.recurrence_mode = RecurrenceMode::Daily;
        ReminderDescriptor::from_record(&record, at(1, 1, 0), "{title}").unwrap()
    }

    #[test]
    fn category_selects_strategy() {
        let limits = ExpansionConfig::default();
        let now = at(1, 1, 0);

        let plan_a = plan(&descriptor(Category::Assignment), now, &limits);
        assert!(matches!(&plan_a, Plan::Expand(items) if items.len() == 1));

        let plan_s = plan(&descriptor(Category::Schedule), now, &limits);
        assert!(matches!(&plan_s, Plan::NativePeriodic(r) if r.len() == 1));
    }

    #[test]
    fn content_carries_task_metadata() {
        let content = content_for(&descriptor(Category::Activity), 3);
        assert_eq!(content.title, "Standup");
        assert_eq!(content.body, "Standup");
        assert_eq!(content.metadata["task_id"], "11");
        assert_eq!(content.metadata["occurrence"], "3");
        assert_eq!(content.metadata["category"], "activity");
    }
}
