//! Task lifecycle entry point.
//!
//! [`TaskNotificationOrchestrator`] is what the task store calls when a task
//! is created, edited, has its reminder switched off, or is deleted. Every
//! change is handled the same way: cancel whatever was registered before,
//! then plan and register from scratch. There is no diffing of old and new
//! occurrences.
//!
//! Invalid reminder settings are rejected before any handle is touched.
//! Scheduler and store failures are logged and reflected in the returned
//! [`ScheduleReport`] instead of failing the call.

use chrono::NaiveDateTime;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::notify::cancel::NotificationCanceller;
use crate::notify::dispatch::{DispatchReport, NotificationDispatcher};
use crate::notify::registry::{self, HandleEntry};
use crate::notify::scheduler::NotificationScheduler;
use crate::plan::{self, Plan};
use crate::recurrence::{ReminderDescriptor, TaskRecord};
use crate::store::HandleStore;

// ─── State machine ────────────────────────────────────────────────────────────

/// Reminder lifecycle state of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// The task never had reminders.
    NoReminder,
    /// Reminders registered on creation or re-enable.
    Scheduled,
    /// Reminders re-registered after an edit.
    Rescheduled,
    /// Reminders switched off or task deleted.
    Cancelled,
}

/// Task store events that drive [`ReminderState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderEvent {
    /// Task inserted.
    Created,
    /// Task edited.
    Updated,
    /// Reminder toggled off.
    Disabled,
    /// Task removed.
    Deleted,
}

impl ReminderState {
    /// State implied by a stored task row.
    ///
    /// The state is not persisted between calls. It is rebuilt from
    /// `reminder_enabled` alone, so a row only ever maps to
    /// [`Self::Scheduled`] or [`Self::NoReminder`]; `Rescheduled` and
    /// `Cancelled` appear only as the result of a transition.
    pub fn of(record: &TaskRecord) -> Self {
        if record.reminder_enabled {
            Self::Scheduled
        } else {
            Self::NoReminder
        }
    }

    /// Transition on `event`. `has_reminder` is whether the task has
    /// reminders enabled after the event.
    pub fn on(self, event: ReminderEvent, has_reminder: bool) -> Self {
        match (event, has_reminder) {
            (ReminderEvent::Created, true) => Self::Scheduled,
            (ReminderEvent::Created, false) => Self::NoReminder,
            (ReminderEvent::Updated, true) => match self {
                Self::NoReminder | Self::Cancelled => Self::Scheduled,
                Self::Scheduled | Self::Rescheduled => Self::Rescheduled,
            },
            (ReminderEvent::Updated, false) => match self {
                Self::NoReminder => Self::NoReminder,
                _ => Self::Cancelled,
            },
            (ReminderEvent::Disabled | ReminderEvent::Deleted, _) => Self::Cancelled,
        }
    }

    /// Whether reminders are live in this state.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Scheduled | Self::Rescheduled)
    }
}

impl fmt::Display for ReminderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoReminder => "no_reminder",
            Self::Scheduled => "scheduled",
            Self::Rescheduled => "rescheduled",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ─── Report ───────────────────────────────────────────────────────────────────

/// What one lifecycle call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Task the call was about.
    pub task_id: i64,
    /// Lifecycle state after the call.
    pub state: ReminderState,
    /// Handles now registered for the task.
    pub handles: Vec<HandleEntry>,
    /// Encoded form of `handles`, as written to the store.
    pub encoded: String,
    /// Registrations the scheduler refused.
    pub skipped: usize,
    /// Reminders were due but notification permission is not granted.
    pub permission_denied: bool,
    /// Previously issued identifiers cancelled successfully.
    pub cancelled: usize,
    /// Whether the store holds `encoded`.
    pub persisted: bool,
}

impl ScheduleReport {
    fn new(task_id: i64, state: ReminderState) -> Self {
        Self {
            task_id,
            state,
            handles: Vec::new(),
            encoded: String::new(),
            skipped: 0,
            permission_denied: false,
            cancelled: 0,
            persisted: true,
        }
    }
}

// ─── Orchestrator ─────────────────────────────────────────────────────────────

/// Ties planning, dispatch, cancellation and persistence to task events.
pub struct TaskNotificationOrchestrator {
    dispatcher: NotificationDispatcher,
    canceller: NotificationCanceller,
    store: Arc<dyn HandleStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl TaskNotificationOrchestrator {
    /// Build an orchestrator over the given collaborators.
    pub fn new(
        scheduler: Arc<dyn NotificationScheduler>,
        store: Arc<dyn HandleStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            dispatcher: NotificationDispatcher::new(
                Arc::clone(&scheduler),
                config.notifications.request_permission,
            ),
            canceller: NotificationCanceller::new(scheduler),
            store,
            clock,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate `record` and plan its reminders without registering anything.
    ///
    /// # Errors
    ///
    /// Returns [`crate::NudgeError::InvalidReminder`] for invalid settings,
    /// including reminders being disabled.
    pub fn plan_for(&self, record: &TaskRecord) -> Result<Plan> {
        let now = self.clock.now();
        let descriptor = self.descriptor(record, now)?;
        Ok(plan::plan(&descriptor, now, &self.config.expansion))
    }

    /// A task was inserted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::NudgeError::InvalidReminder`] when reminders are
    /// enabled with invalid settings. Nothing is registered in that case.
    pub async fn on_task_created(&self, record: &TaskRecord) -> Result<ScheduleReport> {
        let state = ReminderState::NoReminder.on(ReminderEvent::Created, record.reminder_enabled);
        if !record.reminder_enabled {
            debug!(task_id = record.id, "task created without reminders");
            return Ok(ScheduleReport::new(record.id, state));
        }

        let now = self.clock.now();
        let descriptor = self.descriptor(record, now)?;
        let mut report = ScheduleReport::new(record.id, state);
        self.schedule(&descriptor, now, &mut report).await;
        info!(
            task_id = record.id,
            count = registry::flatten(&report.handles).len(),
            "reminders scheduled"
        );
        Ok(report)
    }

    /// A task was edited.
    ///
    /// Nothing happens unless a reminder-relevant field changed. Otherwise
    /// the stored handles are cancelled first, then the reminders are
    /// planned again from the current time.
    ///
    /// # Errors
    ///
    /// Returns [`crate::NudgeError::InvalidReminder`] when the new settings
    /// are invalid. The previous registrations stay untouched in that case.
    pub async fn on_task_updated(
        &self,
        previous: &TaskRecord,
        current: &TaskRecord,
    ) -> Result<ScheduleReport> {
        let task_id = current.id;
        let prior = ReminderState::of(previous);

        if !previous.reminder_fields_differ(current) {
            debug!(task_id, "no reminder-relevant change");
            return Ok(self.unchanged(task_id, prior).await);
        }

        let state = prior.on(ReminderEvent::Updated, current.reminder_enabled);
        let now = self.clock.now();
        let descriptor = if current.reminder_enabled {
            Some(self.descriptor(current, now)?)
        } else {
            None
        };

        let mut report = ScheduleReport::new(task_id, state);
        report.cancelled = self.cancel_stored(task_id).await;

        match descriptor {
            Some(descriptor) => {
                self.schedule(&descriptor, now, &mut report).await;
                info!(
                    task_id,
                    %state,
                    count = registry::flatten(&report.handles).len(),
                    cancelled = report.cancelled,
                    "reminders rescheduled"
                );
            }
            None => {
                report.persisted = self.persist(task_id, "").await;
                info!(task_id, cancelled = report.cancelled, "reminders turned off");
            }
        }
        Ok(report)
    }

    /// The reminder toggle was switched off.
    pub async fn on_reminders_disabled(&self, task_id: i64) -> ScheduleReport {
        self.clear(task_id, ReminderEvent::Disabled).await
    }

    /// The task was deleted.
    pub async fn on_task_deleted(&self, task_id: i64) -> ScheduleReport {
        self.clear(task_id, ReminderEvent::Deleted).await
    }

    fn descriptor(&self, record: &TaskRecord, now: NaiveDateTime) -> Result<ReminderDescriptor> {
        let descriptor =
            ReminderDescriptor::from_record(record, now, &self.config.notifications.default_body)
                .inspect_err(|e| warn!(task_id = record.id, "rejecting reminder settings: {e}"))?;
        Ok(descriptor)
    }

    async fn clear(&self, task_id: i64, event: ReminderEvent) -> ScheduleReport {
        let mut report = ScheduleReport::new(task_id, ReminderState::Scheduled.on(event, false));
        report.cancelled = self.cancel_stored(task_id).await;
        report.persisted = self.persist(task_id, "").await;
        info!(task_id, ?event, cancelled = report.cancelled, "reminders cleared");
        report
    }

    async fn unchanged(&self, task_id: i64, state: ReminderState) -> ScheduleReport {
        let mut report = ScheduleReport::new(task_id, state);
        match self.store.load(task_id).await {
            Ok(encoded) => {
                report.handles = registry::decode(&encoded);
                report.encoded = encoded;
            }
            Err(e) => {
                warn!(task_id, "cannot load handle field: {e}");
                report.persisted = false;
            }
        }
        report
    }

    /// Plan, dispatch and persist `descriptor`, filling in `report`.
    async fn schedule(
        &self,
        descriptor: &ReminderDescriptor,
        now: NaiveDateTime,
        report: &mut ScheduleReport,
    ) {
        let plan = plan::plan(descriptor, now, &self.config.expansion);
        let dispatched: DispatchReport = match &plan {
            Plan::Expand(items) => self.dispatcher.dispatch(items, now).await,
            Plan::NativePeriodic(registrations) => {
                self.dispatcher.dispatch_periodic(registrations).await
            }
        };

        if plan.is_empty() {
            debug!(task_id = descriptor.task_id, "no future occurrences to register");
        }
        report.permission_denied = !plan.is_empty() && !dispatched.permission.is_granted();
        report.skipped = dispatched.skipped;
        report.encoded = registry::encode(&dispatched.handles);
        report.handles = dispatched.handles;
        report.persisted = self.persist(descriptor.task_id, &report.encoded).await;
    }

    /// Cancel whatever the store holds for `task_id`; returns how many
    /// identifiers were cancelled.
    async fn cancel_stored(&self, task_id: i64) -> usize {
        let encoded = match self.store.load(task_id).await {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(task_id, "cannot load handle field, nothing cancelled: {e}");
                return 0;
            }
        };
        let outcome = self.canceller.cancel(&encoded).await;
        outcome.attempted.saturating_sub(outcome.failed)
    }

    async fn persist(&self, task_id: i64, encoded: &str) -> bool {
        match self.store.save(task_id, encoded).await {
            Ok(()) => true,
            Err(e) => {
                warn!(task_id, "cannot persist handle field: {e}");
                false
            }
        }
    }
}
