//! Error types for the nudge engine.

use crate::notify::scheduler::SchedulerError;
use crate::recurrence::DescriptorError;

/// Top-level error type for reminder planning and persistence.
#[derive(Debug, thiserror::Error)]
pub enum NudgeError {
    /// The task's reminder fields describe an impossible schedule.
    #[error("invalid reminder: {0}")]
    InvalidReminder(#[from] DescriptorError),

    /// OS notification scheduler error.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Handle persistence error (task store).
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, NudgeError>;
