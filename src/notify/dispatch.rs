//! Registration of planned reminders with the OS scheduler.

use chrono::NaiveDateTime;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::registry::HandleEntry;
use super::scheduler::{NotificationScheduler, PermissionState};
use crate::plan::{PeriodicRegistration, ScheduledItem};

/// Outcome of one dispatch batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Issued handles, in input order.
    pub handles: Vec<HandleEntry>,
    /// Registrations the scheduler refused.
    pub skipped: usize,
    /// Permission state observed for this batch.
    pub permission: PermissionState,
}

impl DispatchReport {
    fn nothing(permission: PermissionState) -> Self {
        Self {
            handles: Vec::new(),
            skipped: 0,
            permission,
        }
    }
}

/// Hands planned reminders to a [`NotificationScheduler`].
///
/// Permission is checked once per batch. When it is not granted (and the
/// prompt, if allowed, does not grant it) no registration is attempted.
/// Individual registration failures are logged and skipped so the rest of
/// the batch still goes through.
#[derive(Clone)]
pub struct NotificationDispatcher {
    scheduler: Arc<dyn NotificationScheduler>,
    request_permission: bool,
}

impl NotificationDispatcher {
    /// Dispatcher for `scheduler`. With `request_permission`, an undecided or
    /// denied permission triggers one prompt per batch.
    pub fn new(scheduler: Arc<dyn NotificationScheduler>, request_permission: bool) -> Self {
        Self {
            scheduler,
            request_permission,
        }
    }

    /// Current permission, prompting once if allowed.
    pub async fn ensure_permission(&self) -> PermissionState {
        let status = self.scheduler.permission_status().await;
        if status.is_granted() || !self.request_permission {
            return status;
        }
        debug!(?status, "requesting notification permission");
        self.scheduler.request_permission().await
    }

    /// Register one-shot notifications for `items`.
    ///
    /// Items at or before `now` are dropped before any scheduler call.
    pub async fn dispatch(&self, items: &[ScheduledItem], now: NaiveDateTime) -> DispatchReport {
        let future: Vec<&ScheduledItem> = items
            .iter()
            .filter(|item| {
                let keep = item.at > now;
                if !keep {
                    debug!(at = %item.at, "skipping past instant");
                }
                keep
            })
            .collect();

        if future.is_empty() {
            return DispatchReport::nothing(self.scheduler.permission_status().await);
        }

        let permission = self.ensure_permission().await;
        if !permission.is_granted() {
            info!(count = future.len(), "notification permission not granted, nothing scheduled");
            return DispatchReport::nothing(permission);
        }

        let results = join_all(
            future
                .iter()
                .map(|item| self.scheduler.register_at(item.at, &item.content)),
        )
        .await;

        let mut report = DispatchReport::nothing(permission);
        for (item, result) in future.iter().zip(results) {
            match result {
                Ok(handle) => report.handles.push(HandleEntry::Single(handle)),
                Err(e) => {
                    warn!(at = %item.at, "registration failed, skipping: {e}");
                    report.skipped += 1;
                }
            }
        }
        debug!(
            count = report.handles.len(),
            skipped = report.skipped,
            "dispatched one-shot notifications"
        );
        report
    }

    /// Register OS-repeating notifications as one logical reminder.
    ///
    /// The result holds a single entry: [`HandleEntry::Single`] when one
    /// registration succeeded, [`HandleEntry::Composite`] for several, and
    /// nothing when all failed.
    pub async fn dispatch_periodic(&self, registrations: &[PeriodicRegistration]) -> DispatchReport {
        if registrations.is_empty() {
            return DispatchReport::nothing(self.scheduler.permission_status().await);
        }

        let permission = self.ensure_permission().await;
        if !permission.is_granted() {
            info!(
                count = registrations.len(),
                "notification permission not granted, nothing scheduled"
            );
            return DispatchReport::nothing(permission);
        }

        let results = join_all(
            registrations
                .iter()
                .map(|r| self.scheduler.register_periodic(&r.pattern, &r.content)),
        )
        .await;

        let mut issued = Vec::with_capacity(registrations.len());
        let mut skipped = 0;
        for (registration, result) in registrations.iter().zip(results) {
            match result {
                Ok(handle) => issued.push(handle),
                Err(e) => {
                    warn!(pattern = %registration.pattern, "periodic registration failed, skipping: {e}");
                    skipped += 1;
                }
            }
        }

        let handles = match issued.len() {
            0 => Vec::new(),
            1 => issued.into_iter().map(HandleEntry::Single).collect(),
            _ => vec![HandleEntry::Composite(issued)],
        };
        debug!(entries = handles.len(), skipped, "dispatched periodic notifications");

        DispatchReport {
            handles,
            skipped,
            permission,
        }
    }
}
