//! Cooperative, level-triggered cancellation keyed by context
//!
//! A flag stays set until the engine clears it at a well-defined boundary
//! (invocation start, or after consuming a cancellation outcome). Every
//! poll point observes a set flag.

use super::ContextId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Interval at which waits and timeout races look at the flag
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Owner of the cancellation flag set.
///
/// Clones share one flag set, so any holder of a clone can cancel an
/// execution started through another. Independent instances are isolated
/// from each other.
#[derive(Debug, Clone)]
pub struct CancellationCoordinator {
    flags: Arc<Mutex<HashSet<ContextId>>>,
    poll_interval: Duration,
}

impl Default for CancellationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationCoordinator {
    pub fn new() -> Self {
        Self {
            flags: Arc::new(Mutex::new(HashSet::new())),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Same flag set, different polling cadence
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn flags(&self) -> MutexGuard<'_, HashSet<ContextId>> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the execution running on `context` to stop. Idempotent.
    pub fn request_cancellation(&self, context: ContextId) {
        if self.flags().insert(context) {
            info!("Cancellation requested for context {}", context);
        }
    }

    pub fn is_cancelled(&self, context: ContextId) -> bool {
        self.flags().contains(&context)
    }

    pub fn clear(&self, context: ContextId) {
        if self.flags().remove(&context) {
            debug!("Cancellation flag cleared for context {}", context);
        }
    }

    /// Check the flag and, if set, consume it.
    ///
    /// Returns true when a cancellation was pending.
    pub fn take(&self, context: ContextId) -> bool {
        let taken = self.flags().remove(&context);
        if taken {
            debug!("Consumed cancellation for context {}", context);
        }
        taken
    }

    /// Sleep for up to `duration`, checking the flag every poll interval.
    ///
    /// Returns true as soon as a cancellation is observed, false once the
    /// full duration has elapsed. The flag is left set for the caller to
    /// consume. A duration too long to represent as a deadline sleeps until
    /// cancelled.
    pub async fn sleep_cancellable(&self, context: ContextId, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);

        loop {
            let remaining = deadline.map_or(Duration::MAX, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            });
            if remaining.is_zero() {
                return false;
            }
            if self.is_cancelled(context) {
                debug!("Sleep interrupted by cancellation on context {}", context);
                return true;
            }
            tokio::time::sleep(remaining.min(self.poll_interval)).await;
        }
    }
}
