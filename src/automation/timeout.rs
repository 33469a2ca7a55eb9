//! Per-step timeout and cancellation race
//!
//! A step's handler future is raced against a deadline and a cancellation
//! poll. The first to complete wins; the losing handler future is dropped,
//! which stops it at its next suspension point.

use super::cancellation::DEFAULT_POLL_INTERVAL;
use super::ContextId;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, info};

/// How a raced operation ended
#[derive(Debug, Clone, PartialEq)]
pub enum TimeoutOutcome<T> {
    /// The operation finished first and succeeded
    Completed(T),
    /// The operation finished first with an error (or panicked)
    Failed(String),
    /// The deadline fired before the operation finished
    TimedOut(String),
    /// Cancellation was observed before the operation finished
    Cancelled,
}

/// Races step execution against its deadline and cancellation
#[derive(Debug, Clone)]
pub struct TimeoutManager {
    poll_interval: Duration,
}

impl Default for TimeoutManager {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl TimeoutManager {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// Run `operation` for step `step_order`.
    ///
    /// With `timeout_seconds <= 0` the operation runs to completion with no
    /// racing. Otherwise it races a deadline at exactly `timeout_seconds`
    /// and a poll of `is_cancelled(context)` every poll interval.
    pub async fn run<F, T, C>(
        &self,
        operation: F,
        timeout_seconds: f64,
        context: ContextId,
        step_order: u32,
        is_cancelled: C,
    ) -> TimeoutOutcome<T>
    where
        F: Future<Output = anyhow::Result<T>>,
        C: Fn(ContextId) -> bool,
    {
        let guarded = AssertUnwindSafe(operation).catch_unwind();

        if !timeout_seconds.is_finite() || timeout_seconds <= 0.0 {
            debug!("Step {} has no timeout limit", step_order);
            return settle(guarded.await);
        }

        debug!(
            "Executing step {} with timeout of {}s",
            step_order, timeout_seconds
        );
        let limit = Duration::try_from_secs_f64(timeout_seconds).unwrap_or(Duration::MAX);
        let deadline = tokio::time::sleep(limit);
        let cancellation = self.watch_cancellation(context, &is_cancelled);

        tokio::select! {
            biased;

            result = guarded => settle(result),
            _ = deadline => {
                info!("Step {} timed out after {}s", step_order, timeout_seconds);
                TimeoutOutcome::TimedOut(format!(
                    "Step {step_order} timed out after {timeout_seconds}s"
                ))
            }
            _ = cancellation => {
                info!("Step {} cancelled by user during execution", step_order);
                TimeoutOutcome::Cancelled
            }
        }
    }

    /// Resolves the first time the flag is seen set
    async fn watch_cancellation<C>(&self, context: ContextId, is_cancelled: &C)
    where
        C: Fn(ContextId) -> bool,
    {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            if is_cancelled(context) {
                return;
            }
        }
    }
}

fn settle<T>(result: Result<anyhow::Result<T>, Box<dyn Any + Send>>) -> TimeoutOutcome<T> {
    match result {
        Ok(Ok(value)) => TimeoutOutcome::Completed(value),
        Ok(Err(err)) => TimeoutOutcome::Failed(format!("{err:#}")),
        Err(panic) => TimeoutOutcome::Failed(format!(
            "Action handler panicked: {}",
            panic_message(panic.as_ref())
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn never_cancelled(_: ContextId) -> bool {
        false
    }

    async fn explode(message: &'static str) -> anyhow::Result<()> {
        panic!("{}", message)
    }

    #[tokio::test]
    async fn test_unbounded_runs_to_completion() {
        let manager = TimeoutManager::default();
        let outcome = manager
            .run(
                async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok::<_, anyhow::Error>(7)
                },
                0.0,
                ContextId(1),
                1,
                never_cancelled,
            )
            .await;
        assert_eq!(outcome, TimeoutOutcome::Completed(7));
    }

    #[tokio::test]
    async fn test_operation_error_is_surfaced() {
        let manager = TimeoutManager::default();
        let outcome = manager
            .run(
                async { Err::<(), _>(anyhow!("element not found")) },
                5.0,
                ContextId(1),
                3,
                never_cancelled,
            )
            .await;
        assert_eq!(outcome, TimeoutOutcome::Failed("element not found".to_string()));
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_runs_operation() {
        let manager = TimeoutManager::new(Duration::from_millis(10));
        let outcome = manager
            .run(
                async { Ok::<_, anyhow::Error>("done") },
                1e300,
                ContextId(1),
                3,
                never_cancelled,
            )
            .await;
        assert_eq!(outcome, TimeoutOutcome::Completed("done"));
    }

    #[tokio::test]
    async fn test_deadline_wins_over_hanging_operation() {
        let manager = TimeoutManager::new(Duration::from_millis(10));
        let start = Instant::now();
        let outcome = manager
            .run(
                std::future::pending::<anyhow::Result<()>>(),
                0.2,
                ContextId(1),
                4,
                never_cancelled,
            )
            .await;

        assert_eq!(
            outcome,
            TimeoutOutcome::TimedOut("Step 4 timed out after 0.2s".to_string())
        );
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_hanging_operation() {
        let manager = TimeoutManager::new(Duration::from_millis(10));
        let flag = Arc::new(AtomicBool::new(false));
        let setter = flag.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            setter.store(true, Ordering::SeqCst);
        });

        let start = Instant::now();
        let outcome = manager
            .run(
                std::future::pending::<anyhow::Result<()>>(),
                10.0,
                ContextId(1),
                2,
                |_| flag.load(Ordering::SeqCst),
            )
            .await;

        assert_eq!(outcome, TimeoutOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_failure() {
        let manager = TimeoutManager::default();
        let outcome = manager
            .run(
                explode("boom"),
                0.0,
                ContextId(1),
                1,
                never_cancelled,
            )
            .await;
        assert_eq!(
            outcome,
            TimeoutOutcome::Failed("Action handler panicked: boom".to_string())
        );
    }

    #[tokio::test]
    async fn test_losing_operation_is_dropped() {
        let manager = TimeoutManager::new(Duration::from_millis(10));
        let finished = Arc::new(AtomicBool::new(false));
        let marker = finished.clone();

        let outcome = manager
            .run(
                async move {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    marker.store(true, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(())
                },
                0.05,
                ContextId(1),
                1,
                never_cancelled,
            )
            .await;
        assert!(matches!(outcome, TimeoutOutcome::TimedOut(_)));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
