//! Nudge: recurrence expansion and notification scheduling for task reminders.
//!
//! A task carries a declarative reminder ("remind me N days or minutes
//! before, then repeat daily/weekly/monthly/yearly/custom, bounded by a
//! deadline, by an end window, or not at all"). This crate turns that into a
//! bounded set of future trigger instants, hands them to the operating
//! system's notification scheduler, persists the opaque handles it gets back,
//! and later cancels exactly those handles when the task changes.
//!
//! # Architecture
//!
//! - **Clock**: wall-clock "now" and calendar arithmetic ([`clock`])
//! - **Recurrence**: typed descriptor and the pure expander ([`recurrence`])
//! - **Planning**: deadline-bounded and open-window strategies ([`plan`])
//! - **Notify**: OS scheduler boundary, dispatch, handle encoding and
//!   cancellation ([`notify`])
//! - **Store**: persistence of the encoded handle field ([`store`])
//! - **Orchestrator**: task lifecycle entry point ([`orchestrator`])

pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod plan;
pub mod recurrence;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use error::{NudgeError, Result};
pub use notify::{HandleEntry, NotificationScheduler, RecordingScheduler, UnavailableScheduler};
pub use orchestrator::{ReminderEvent, ReminderState, ScheduleReport, TaskNotificationOrchestrator};
pub use plan::Plan;
pub use recurrence::{ReminderDescriptor, TaskRecord};
pub use store::{HandleStore, InMemoryHandleStore, JsonFileHandleStore};
