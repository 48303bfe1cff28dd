//! Boundary to the operating system's notification scheduler.
//!
//! The engine treats the platform scheduler as a black box behind
//! [`NotificationScheduler`]. The host application registers a real
//! implementation (e.g. a bridge to the mobile/desktop notification API).
//! [`UnavailableScheduler`] stands in when no platform scheduler exists, and
//! [`super::recording::RecordingScheduler`] is the in-process implementation
//! used by tests and the preview binary.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ─── Domain types ─────────────────────────────────────────────────────────────

/// Opaque identifier issued by the scheduler for one registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationHandle(String);

impl NotificationHandle {
    /// Wrap a scheduler-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NotificationHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What the user sees when a notification fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Opaque key/value payload delivered back to the app on tap.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl NotificationContent {
    /// Content with an empty payload.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add a payload entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// A repeat trigger the OS scheduler fires on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeriodicPattern {
    /// Every day at `hour:minute`.
    Daily {
        /// Hour of day (0-23).
        hour: u32,
        /// Minute of hour (0-59).
        minute: u32,
    },
    /// Every `weekday` at `hour:minute`.
    Weekly {
        /// Day of the week.
        weekday: Weekday,
        /// Hour of day (0-23).
        hour: u32,
        /// Minute of hour (0-59).
        minute: u32,
    },
    /// Every month on `day` at `hour:minute`.
    Monthly {
        /// Day of month (1-31).
        day: u32,
        /// Hour of day (0-23).
        hour: u32,
        /// Minute of hour (0-59).
        minute: u32,
    },
    /// Every year on `month`/`day` at `hour:minute`.
    Yearly {
        /// Month (1-12).
        month: u32,
        /// Day of month (1-31).
        day: u32,
        /// Hour of day (0-23).
        hour: u32,
        /// Minute of hour (0-59).
        minute: u32,
    },
}

impl fmt::Display for PeriodicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { hour, minute } => write!(f, "daily at {hour:02}:{minute:02}"),
            Self::Weekly {
                weekday,
                hour,
                minute,
            } => write!(f, "every {weekday} at {hour:02}:{minute:02}"),
            Self::Monthly { day, hour, minute } => {
                write!(f, "monthly on day {day} at {hour:02}:{minute:02}")
            }
            Self::Yearly {
                month,
                day,
                hour,
                minute,
            } => write!(f, "yearly on {month:02}-{day:02} at {hour:02}:{minute:02}"),
        }
    }
}

/// Notification permission as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Notifications may be scheduled.
    Granted,
    /// The user refused notifications.
    Denied,
    /// The user has not been asked yet.
    NotDetermined,
}

impl PermissionState {
    /// Whether scheduling is allowed.
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Error type for scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// Notification permission is not granted.
    #[error("notification permission denied")]
    PermissionDenied,
    /// The scheduler refused this particular registration.
    #[error("registration rejected: {0}")]
    Rejected(String),
    /// Unexpected error from the platform scheduler.
    #[error("scheduler backend error: {0}")]
    Backend(String),
}

// ─── NotificationScheduler trait ──────────────────────────────────────────────

/// Abstraction over the platform notification scheduler.
///
/// Calls may be issued concurrently from one cooperative task.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Register a one-shot notification at `at` (local wall time).
    async fn register_at(
        &self,
        at: NaiveDateTime,
        content: &NotificationContent,
    ) -> Result<NotificationHandle, SchedulerError>;

    /// Register a notification the OS repeats according to `pattern`.
    async fn register_periodic(
        &self,
        pattern: &PeriodicPattern,
        content: &NotificationContent,
    ) -> Result<NotificationHandle, SchedulerError>;

    /// Cancel a registration.
    ///
    /// Implementations must treat unknown or already-cancelled handles as a
    /// successful no-op.
    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), SchedulerError>;

    /// Current permission state, without prompting.
    async fn permission_status(&self) -> PermissionState;

    /// Prompt for permission (if the platform still allows it) and return
    /// the resulting state.
    async fn request_permission(&self) -> PermissionState;
}

// ─── Unavailable scheduler ────────────────────────────────────────────────────

/// A no-op [`NotificationScheduler`] for hosts without a platform scheduler.
///
/// Permission is always denied, so dispatch never attempts a registration.
/// Cancelling is a successful no-op because nothing was ever registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableScheduler;

#[async_trait]
impl NotificationScheduler for UnavailableScheduler {
    async fn register_at(
        &self,
        _at: NaiveDateTime,
        _content: &NotificationContent,
    ) -> Result<NotificationHandle, SchedulerError> {
        Err(SchedulerError::PermissionDenied)
    }

    async fn register_periodic(
        &self,
        _pattern: &PeriodicPattern,
        _content: &NotificationContent,
    ) -> Result<NotificationHandle, SchedulerError> {
        Err(SchedulerError::PermissionDenied)
    }

    async fn cancel(&self, _handle: &NotificationHandle) -> Result<(), SchedulerError> {
        Ok(())
    }

    async fn permission_status(&self) -> PermissionState {
        PermissionState::Denied
    }

    async fn request_permission(&self) -> PermissionState {
        PermissionState::Denied
    }
}
