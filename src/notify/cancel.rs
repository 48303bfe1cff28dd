//! Cancellation of previously issued handles.

use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use super::registry;
use super::scheduler::NotificationScheduler;

/// Outcome of one cancellation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelReport {
    /// Identifiers handed to the scheduler.
    pub attempted: usize,
    /// Identifiers the scheduler failed to cancel.
    pub failed: usize,
}

/// Cancels every handle stored in an encoded handle field.
///
/// Failures are logged and skipped. Running it twice on the same field is
/// harmless since schedulers ignore unknown handles.
#[derive(Clone)]
pub struct NotificationCanceller {
    scheduler: Arc<dyn NotificationScheduler>,
}

impl NotificationCanceller {
    /// Canceller backed by `scheduler`.
    pub fn new(scheduler: Arc<dyn NotificationScheduler>) -> Self {
        Self { scheduler }
    }

    /// Decode `encoded`, flatten composites and cancel each identifier.
    pub async fn cancel(&self, encoded: &str) -> CancelReport {
        let handles = registry::flatten(&registry::decode(encoded));
        if handles.is_empty() {
            return CancelReport::default();
        }

        let results = join_all(handles.iter().map(|handle| self.scheduler.cancel(handle))).await;

        let mut failed = 0;
        for (handle, result) in handles.iter().zip(results) {
            if let Err(e) = result {
                warn!(handle = %handle, "cancel failed, skipping: {e}");
                failed += 1;
            }
        }
        debug!(count = handles.len(), failed, "cancelled notification handles");

        CancelReport {
            attempted: handles.len(),
            failed,
        }
    }
}
