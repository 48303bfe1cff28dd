//! Reminder recurrence model and expansion.
//!
//! - [`types`]: the task row handed over by the store, the validated
//!   [`ReminderDescriptor`], and the [`Recurrence`] tagged union.
//! - [`weekdays`]: the [`WeekdaySet`] bitmask (0 = Sunday … 6 = Saturday).
//! - [`expand`](mod@expand): the pure expander turning a recurrence into instants.

pub mod expand;
pub mod types;
pub mod weekdays;

pub use expand::expand;
pub use types::{
    Cadence, Category, CustomUnit, DescriptorError, EndCondition, EndOption, OffsetUnit,
    Recurrence, RecurrenceMode, ReminderDescriptor, ReminderOffset, TaskRecord,
};
pub use weekdays::WeekdaySet;
