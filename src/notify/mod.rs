//! Notification side of the engine: the OS scheduler boundary, dispatch,
//! handle encoding and cancellation.

pub mod cancel;
pub mod dispatch;
pub mod recording;
pub mod registry;
pub mod scheduler;

pub use cancel::{CancelReport, NotificationCanceller};
pub use dispatch::{DispatchReport, NotificationDispatcher};
pub use recording::RecordingScheduler;
pub use registry::{HandleEntry, RegistryError};
pub use scheduler::{
    NotificationContent, NotificationHandle, NotificationScheduler, PeriodicPattern,
    PermissionState, SchedulerError, UnavailableScheduler,
};
