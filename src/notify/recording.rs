//! In-memory [`NotificationScheduler`] that records registrations.
//!
//! Used by the integration tests and the `nudge-preview` binary to run the
//! full plan → dispatch → persist → cancel cycle without a platform
//! notification API. Permission answers and individual failures can be
//! scripted.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::scheduler::{
    NotificationContent, NotificationHandle, NotificationScheduler, PeriodicPattern,
    PermissionState, SchedulerError,
};

/// When a recorded registration fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// One-shot at a wall-clock instant.
    At {
        /// Fire time.
        at: NaiveDateTime,
    },
    /// OS-side repetition.
    Periodic {
        /// Repeat rule.
        pattern: PeriodicPattern,
    },
}

/// A live (not yet cancelled) registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    /// Handle returned to the caller.
    pub handle: NotificationHandle,
    /// Trigger rule.
    pub trigger: Trigger,
    /// Notification content.
    pub content: NotificationContent,
}

#[derive(Debug)]
struct RecordingState {
    permission: PermissionState,
    permission_on_request: PermissionState,
    permission_requests: usize,
    register_calls: usize,
    next_id: u64,
    pending: Vec<Registration>,
    cancel_calls: Vec<NotificationHandle>,
    reject_instants: BTreeSet<NaiveDateTime>,
    failing_cancels: BTreeSet<NotificationHandle>,
}

/// An in-memory notification scheduler.
///
/// Handles are `rec-0001`, `rec-0002`, … in registration order.
#[derive(Debug)]
pub struct RecordingScheduler {
    state: Mutex<RecordingState>,
}

impl Default for RecordingScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingScheduler {
    /// A scheduler with permission already granted.
    pub fn new() -> Self {
        Self::with_permission(PermissionState::Granted, PermissionState::Granted)
    }

    /// A scheduler reporting `current` until asked, then `on_request`.
    pub fn with_permission(current: PermissionState, on_request: PermissionState) -> Self {
        Self {
            state: Mutex::new(RecordingState {
                permission: current,
                permission_on_request: on_request,
                permission_requests: 0,
                register_calls: 0,
                next_id: 1,
                pending: Vec::new(),
                cancel_calls: Vec::new(),
                reject_instants: BTreeSet::new(),
                failing_cancels: BTreeSet::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make registrations at `at` fail with [`SchedulerError::Rejected`].
    pub fn reject_registration_at(&self, at: NaiveDateTime) {
        self.lock().reject_instants.insert(at);
    }

    /// Make cancellation of `handle` fail with [`SchedulerError::Backend`].
    pub fn fail_cancel_of(&self, handle: impl Into<NotificationHandle>) {
        self.lock().failing_cancels.insert(handle.into());
    }

    /// Revoke or grant permission from now on.
    pub fn set_permission(&self, state: PermissionState) {
        let mut guard = self.lock();
        guard.permission = state;
        guard.permission_on_request = state;
    }

    /// Live registrations in registration order.
    pub fn pending(&self) -> Vec<Registration> {
        self.lock().pending.clone()
    }

    /// Number of live registrations.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Every handle passed to [`NotificationScheduler::cancel`], in call order.
    pub fn cancel_calls(&self) -> Vec<NotificationHandle> {
        self.lock().cancel_calls.clone()
    }

    /// Number of permission prompts shown.
    pub fn permission_requests(&self) -> usize {
        self.lock().permission_requests
    }

    /// Number of registration attempts, successful or not.
    pub fn register_calls(&self) -> usize {
        self.lock().register_calls
    }

    fn register(
        &self,
        trigger: Trigger,
        content: &NotificationContent,
    ) -> Result<NotificationHandle, SchedulerError> {
        let mut state = self.lock();
        state.register_calls += 1;

        if !state.permission.is_granted() {
            return Err(SchedulerError::PermissionDenied);
        }
        if let Trigger::At { at } = &trigger
            && state.reject_instants.contains(at)
        {
            return Err(SchedulerError::Rejected(format!("instant {at} refused")));
        }

        let handle = NotificationHandle::new(format!("rec-{:04}", state.next_id));
        state.next_id += 1;
        state.pending.push(Registration {
            handle: handle.clone(),
            trigger,
            content: content.clone(),
        });
        Ok(handle)
    }
}

#[async_trait]
impl NotificationScheduler for RecordingScheduler {
    async fn register_at(
        &self,
        at: NaiveDateTime,
        content: &NotificationContent,
    ) -> Result<NotificationHandle, SchedulerError> {
        self.register(Trigger::At { at }, content)
    }

    async fn register_periodic(
        &self,
        pattern: &PeriodicPattern,
        content: &NotificationContent,
    ) -> Result<NotificationHandle, SchedulerError> {
        self.register(Trigger::Periodic { pattern: *pattern }, content)
    }

    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), SchedulerError> {
        let mut state = self.lock();
        state.cancel_calls.push(handle.clone());
        if state.failing_cancels.contains(handle) {
            return Err(SchedulerError::Backend(format!("cannot cancel {handle}")));
        }
        state.pending.retain(|r| &r.handle != handle);
        Ok(())
    }

    async fn permission_status(&self) -> PermissionState {
        self.lock().permission
    }

    async fn request_permission(&self) -> PermissionState {
        let mut state = self.lock();
        state.permission_requests += 1;
        state.permission = state.permission_on_request;
        state.permission
    }
}
