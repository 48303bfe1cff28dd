//! Task reminder input row and its typed descriptor.
//!
//! [`TaskRecord`] mirrors the flat row the task store hands over: every
//! recurrence field is present whether or not the chosen mode uses it.
//! [`ReminderDescriptor::from_record`] validates that row once and produces a
//! [`Recurrence`] that only carries the fields its variant needs.

use chrono::{Datelike, Days, Duration, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

use super::weekdays::{WeekdaySet, weekday_to_index};
use crate::clock::truncate_to_minute;

/// Longest explicit end window, in months.
pub const MAX_END_MONTHS: u8 = 6;

/// Body template used when neither the task nor the config supplies one.
pub const DEFAULT_BODY_TEMPLATE: &str = "{category} due {deadline}";

// ─── Input row ────────────────────────────────────────────────────────────────

/// Kind of task, which decides how its reminder window is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Homework-style task bounded by a hard deadline.
    Assignment,
    /// Calendar entry; bounded by an end window or open-ended.
    Schedule,
    /// Recurring activity; bounded by an end window or open-ended.
    Activity,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Assignment => "assignment",
            Self::Schedule => "schedule",
            Self::Activity => "activity",
        };
        f.write_str(s)
    }
}

/// Repeat mode as stored on the task row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceMode {
    /// Single reminder.
    #[default]
    None,
    /// Every N days.
    Daily,
    /// Selected weekdays every N weeks (or every N weeks from the anchor).
    Weekly,
    /// Same day of month every N months.
    Monthly,
    /// Same date every N years.
    Yearly,
    /// Every N custom units (assignments only).
    Custom,
}

/// Step unit for [`RecurrenceMode::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomUnit {
    /// Calendar days.
    Days,
    /// Weeks of seven days.
    Weeks,
    /// Calendar months (day clamped to month end).
    Months,
    /// Calendar years.
    Years,
}

/// End option as stored on the task row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOption {
    /// Repeat without an end.
    #[default]
    Never,
    /// Stop after `endMonths` months.
    AfterMonths,
}

/// Unit of the reminder lead time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetUnit {
    /// Whole days before the deadline.
    Days,
    /// Minutes before the deadline.
    #[default]
    Minutes,
}

/// How long before the deadline the first reminder fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOffset {
    /// Unit of `amount`.
    pub unit: OffsetUnit,
    /// Lead time in `unit`s.
    pub amount: u32,
}

impl ReminderOffset {
    /// Lead time of `amount` days.
    pub fn days(amount: u32) -> Self {
        Self {
            unit: OffsetUnit::Days,
            amount,
        }
    }

    /// Lead time of `amount` minutes.
    pub fn minutes(amount: u32) -> Self {
        Self {
            unit: OffsetUnit::Minutes,
            amount,
        }
    }

    /// `deadline` minus this offset.
    pub fn before(&self, deadline: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.unit {
            OffsetUnit::Days => deadline.checked_sub_days(Days::new(u64::from(self.amount))),
            OffsetUnit::Minutes => {
                deadline.checked_sub_signed(Duration::try_minutes(i64::from(self.amount))?)
            }
        }
    }
}

fn default_interval() -> u32 {
    1
}

/// A task row as supplied by the persistence layer at create/update time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Task store primary key.
    pub id: i64,
    /// Task title, shown as the notification title.
    pub title: String,
    /// Free-form notes, used as the notification body when present.
    #[serde(default)]
    pub notes: Option<String>,
    /// Task category.
    pub category: Category,
    /// Deadline (assignments) or start time (schedules/activities).
    pub deadline: NaiveDateTime,
    /// Whether the user asked for reminders.
    #[serde(default)]
    pub reminder_enabled: bool,
    /// Lead time before `deadline`.
    #[serde(default)]
    pub reminder_offset: ReminderOffset,
    /// Repeat mode.
    #[serde(default)]
    pub recurrence_mode: RecurrenceMode,
    /// Repeat multiplier, at least 1.
    #[serde(default = "default_interval")]
    pub interval_count: u32,
    /// Selected weekdays, 0 = Sunday … 6 = Saturday.
    #[serde(default)]
    pub selected_weekdays: Vec<u8>,
    /// Unit for custom repeats.
    #[serde(default)]
    pub custom_unit: Option<CustomUnit>,
    /// End option for schedules and activities.
    #[serde(default)]
    pub end_option: EndOption,
    /// Months until the end when `end_option` is `after_months`.
    #[serde(default)]
    pub end_months: Option<u8>,
}

impl TaskRecord {
    /// Create a row with reminders off and no repetition.
    pub fn new(
        id: i64,
        title: impl Into<String>,
        category: Category,
        deadline: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            notes: None,
            category,
            deadline,
            reminder_enabled: false,
            reminder_offset: ReminderOffset::default(),
            recurrence_mode: RecurrenceMode::None,
            interval_count: 1,
            selected_weekdays: Vec::new(),
            custom_unit: None,
            end_option: EndOption::Never,
            end_months: None,
        }
    }

    /// Whether any field that feeds reminder scheduling differs from `other`.
    pub fn reminder_fields_differ(&self, other: &TaskRecord) -> bool {
        self.title != other.title
            || self.notes != other.notes
            || self.category != other.category
            || self.deadline != other.deadline
            || self.reminder_enabled != other.reminder_enabled
            || self.reminder_offset != other.reminder_offset
            || self.recurrence_mode != other.recurrence_mode
            || self.interval_count != other.interval_count
            || self.selected_weekdays != other.selected_weekdays
            || self.custom_unit != other.custom_unit
            || self.end_option != other.end_option
            || self.end_months != other.end_months
    }
}

// ─── Typed descriptor ─────────────────────────────────────────────────────────

/// Validation failure when turning a [`TaskRecord`] into a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// The task has reminders switched off.
    #[error("reminders are disabled for this task")]
    RemindersDisabled,

    /// `intervalCount` was zero.
    #[error("repeat interval must be at least 1")]
    ZeroInterval,

    /// A weekday index outside 0..=6.
    #[error("weekday index {0} is out of range (0 = Sunday … 6 = Saturday)")]
    WeekdayOutOfRange(u8),

    /// Custom mode without a unit.
    #[error("custom repeat requires a unit")]
    MissingCustomUnit,

    /// Custom mode on a category that does not support it.
    #[error("custom repeat is only available for assignments, not {0}")]
    CustomRequiresAssignment(Category),

    /// `after_months` without a month count.
    #[error("end after months requires a month count")]
    MissingEndMonths,

    /// Month count outside 1..=6.
    #[error("end window of {0} months is outside 1..=6")]
    EndMonthsOutOfRange(u8),

    /// A selected weekday first occurs after the assignment's deadline.
    #[error("{0} falls after the deadline")]
    WeekdayBeyondDeadline(Weekday),

    /// The reminder offset moves the anchor off the calendar.
    #[error("reminder offset is out of range")]
    OffsetOutOfRange,
}

/// Granularity class of a recurrence, used to pick the expansion cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Day, week or month steps.
    Fine,
    /// Year steps.
    Coarse,
}

/// How a reminder repeats. Each variant carries only its own fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    /// Fire once at the anchor.
    Once,
    /// Every `every` days.
    Daily {
        /// Day multiplier.
        every: NonZeroU32,
    },
    /// Selected weekdays every `every` weeks; empty set means every
    /// `every` weeks from the anchor.
    Weekly {
        /// Week multiplier.
        every: NonZeroU32,
        /// Selected weekdays.
        weekdays: WeekdaySet,
    },
    /// Same day of month every `every` months.
    Monthly {
        /// Month multiplier.
        every: NonZeroU32,
    },
    /// Same date every `every` years.
    Yearly {
        /// Year multiplier.
        every: NonZeroU32,
    },
    /// Every `every` `unit`s.
    Custom {
        /// Unit multiplier.
        every: NonZeroU32,
        /// Step unit.
        unit: CustomUnit,
    },
}

impl Recurrence {
    /// Repeat multiplier, `None` for [`Recurrence::Once`].
    pub fn every(&self) -> Option<NonZeroU32> {
        match self {
            Self::Once => None,
            Self::Daily { every }
            | Self::Weekly { every, .. }
            | Self::Monthly { every }
            | Self::Yearly { every }
            | Self::Custom { every, .. } => Some(*every),
        }
    }

    /// Granularity class for cap selection.
    pub fn cadence(&self) -> Cadence {
        match self {
            Self::Yearly { .. }
            | Self::Custom {
                unit: CustomUnit::Years,
                ..
            } => Cadence::Coarse,
            _ => Cadence::Fine,
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once => f.write_str("once"),
            Self::Daily { every } => write!(f, "every {every} day(s)"),
            Self::Weekly { every, weekdays } if weekdays.is_empty() => {
                write!(f, "every {every} week(s)")
            }
            Self::Weekly { every, weekdays } => write!(f, "every {every} week(s) on {weekdays}"),
            Self::Monthly { every } => write!(f, "every {every} month(s)"),
            Self::Yearly { every } => write!(f, "every {every} year(s)"),
            Self::Custom { every, unit } => write!(f, "every {every} {unit:?}"),
        }
    }
}

/// When an open-window reminder stops repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndCondition {
    /// No explicit end.
    Never,
    /// Stop `months` months after scheduling.
    AfterMonths {
        /// Window length, 1..=6.
        months: u8,
    },
}

impl EndCondition {
    /// Checked constructor for [`EndCondition::AfterMonths`].
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::EndMonthsOutOfRange`] outside 1..=6.
    pub fn after_months(months: u8) -> Result<Self, DescriptorError> {
        if (1..=MAX_END_MONTHS).contains(&months) {
            Ok(Self::AfterMonths { months })
        } else {
            Err(DescriptorError::EndMonthsOutOfRange(months))
        }
    }
}

/// Everything the planners need about one task's reminders.
///
/// Built fresh on every create/update call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDescriptor {
    /// Task store primary key.
    pub task_id: i64,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Task category.
    pub category: Category,
    /// Hard bound for assignments; source of the time of day otherwise.
    pub deadline: NaiveDateTime,
    /// First reminder instant (deadline minus offset).
    pub anchor: NaiveDateTime,
    /// Repeat pattern.
    pub recurrence: Recurrence,
    /// End of the repeat window (ignored for assignments).
    pub end: EndCondition,
}

impl ReminderDescriptor {
    /// Validate `record` and build its descriptor.
    ///
    /// `now` is only used by the assignment weekday guard. `body_template`
    /// fills the body when the task has no notes; it may reference
    /// `{title}`, `{category}` and `{deadline}`.
    ///
    /// # Errors
    ///
    /// Returns a [`DescriptorError`] naming the first invalid field.
    pub fn from_record(
        record: &TaskRecord,
        now: NaiveDateTime,
        body_template: &str,
    ) -> Result<Self, DescriptorError> {
        if !record.reminder_enabled {
            return Err(DescriptorError::RemindersDisabled);
        }

        let recurrence = recurrence_from_record(record)?;

        let end = match (record.category, record.end_option) {
            (Category::Assignment, _) | (_, EndOption::Never) => EndCondition::Never,
            (_, EndOption::AfterMonths) => {
                let months = record.end_months.ok_or(DescriptorError::MissingEndMonths)?;
                EndCondition::after_months(months)?
            }
        };

        if record.category == Category::Assignment
            && let Recurrence::Weekly { weekdays, .. } = recurrence
        {
            check_weekdays_before_deadline(weekdays, now, record.deadline)?;
        }

        let deadline = truncate_to_minute(record.deadline);
        let anchor = record
            .reminder_offset
            .before(deadline)
            .ok_or(DescriptorError::OffsetOutOfRange)?;

        let body = match record.notes.as_deref().map(str::trim) {
            Some(notes) if !notes.is_empty() => notes.to_owned(),
            _ => render_body(body_template, record),
        };

        Ok(Self {
            task_id: record.id,
            title: record.title.clone(),
            body,
            category: record.category,
            deadline,
            anchor,
            recurrence,
            end,
        })
    }
}

fn recurrence_from_record(record: &TaskRecord) -> Result<Recurrence, DescriptorError> {
    let every = || NonZeroU32::new(record.interval_count).ok_or(DescriptorError::ZeroInterval);

    let recurrence = match record.recurrence_mode {
        RecurrenceMode::None => Recurrence::Once,
        RecurrenceMode::Daily => Recurrence::Daily { every: every()? },
        RecurrenceMode::Weekly => Recurrence::Weekly {
            every: every()?,
            weekdays: WeekdaySet::from_indices(record.selected_weekdays.iter().copied())?,
        },
        RecurrenceMode::Monthly => Recurrence::Monthly { every: every()? },
        RecurrenceMode::Yearly => Recurrence::Yearly { every: every()? },
        RecurrenceMode::Custom => {
            if record.category != Category::Assignment {
                return Err(DescriptorError::CustomRequiresAssignment(record.category));
            }
            Recurrence::Custom {
                every: every()?,
                unit: record.custom_unit.ok_or(DescriptorError::MissingCustomUnit)?,
            }
        }
    };
    Ok(recurrence)
}

/// Reject weekdays whose next occurrence (from today) is after the deadline.
fn check_weekdays_before_deadline(
    weekdays: WeekdaySet,
    now: NaiveDateTime,
    deadline: NaiveDateTime,
) -> Result<(), DescriptorError> {
    let today = now.date();
    let today_index = weekday_to_index(today.weekday());
    for day in weekdays.iter() {
        let ahead = (weekday_to_index(day) + 7 - today_index) % 7;
        let next = today.checked_add_days(Days::new(u64::from(ahead)));
        if next.is_none_or(|date| date > deadline.date()) {
            return Err(DescriptorError::WeekdayBeyondDeadline(day));
        }
    }
    Ok(())
}

fn render_body(template: &str, record: &TaskRecord) -> String {
    template
        .replace("{title}", &record.title)
        .replace("{category}", &capitalize(&record.category.to_string()))
        .replace(
            "{deadline}",
            &record.deadline.format("%Y-%m-%d %H:%M").to_string(),
        )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
