//! Top-level entry point: single-flight guard plus the retry loop
//!
//! Each invocation registers its context, clears any stale cancellation,
//! loads the retry configuration once and then runs passes until one
//! succeeds, a failure is not retryable, the user cancels, or the attempt
//! budget runs out.

use super::cancellation::CancellationCoordinator;
use super::checkpoint::CheckpointSink;
use super::dispatcher::ActionDispatcher;
use super::executor::StepSequenceExecutor;
use super::progress::ProgressReporter;
use super::registry::ActiveExecutionRegistry;
use super::result::{ExecutionResult, FailureKind};
use super::retry::{RetryConfigSource, RetryConfiguration, RetryPolicy};
use super::step::{sort_by_execution_order, Step};
use super::variables::VariableCollection;
use super::ContextId;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Drives attempts of a step sequence for any number of contexts.
///
/// Clones share the dispatcher, cancellation flags and active-execution
/// registry, so a clone handed to a signal handler can cancel runs started
/// through the original.
#[derive(Clone)]
pub struct SequenceRetryOrchestrator {
    dispatcher: Arc<dyn ActionDispatcher>,
    retry_source: Arc<dyn RetryConfigSource>,
    cancellation: CancellationCoordinator,
    registry: ActiveExecutionRegistry,
    progress: ProgressReporter,
}

impl SequenceRetryOrchestrator {
    pub fn new(
        dispatcher: Arc<dyn ActionDispatcher>,
        retry_source: Arc<dyn RetryConfigSource>,
    ) -> Self {
        Self {
            dispatcher,
            retry_source,
            cancellation: CancellationCoordinator::new(),
            registry: ActiveExecutionRegistry::new(),
            progress: ProgressReporter::disabled(),
        }
    }

    /// Share a cancellation flag set with other holders
    pub fn with_cancellation(mut self, cancellation: CancellationCoordinator) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Share an active-execution registry with other orchestrators
    pub fn with_registry(mut self, registry: ActiveExecutionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.cancellation = self.cancellation.with_poll_interval(poll_interval);
        self
    }

    pub fn cancellation(&self) -> &CancellationCoordinator {
        &self.cancellation
    }

    pub fn registry(&self) -> &ActiveExecutionRegistry {
        &self.registry
    }

    /// Ask the run on `context` to stop at its next poll point
    pub fn request_cancellation(&self, context: ContextId) {
        self.cancellation.request_cancellation(context);
    }

    /// Run `steps` from the first one, retrying per configuration
    pub async fn run_once(
        &self,
        context: ContextId,
        steps: &[Step],
        variables: Option<&VariableCollection>,
    ) -> ExecutionResult {
        self.run_with_resume(context, steps, variables, None, 0).await
    }

    /// Run `steps` starting at `start_offset` in execution order.
    ///
    /// Navigation steps record a checkpoint in `checkpoint` when given.
    /// Retries restart at `start_offset`, never at the failed step.
    pub async fn run_with_resume(
        &self,
        context: ContextId,
        steps: &[Step],
        variables: Option<&VariableCollection>,
        checkpoint: Option<Arc<dyn CheckpointSink>>,
        start_offset: usize,
    ) -> ExecutionResult {
        let run_id = Uuid::new_v4();
        let span = info_span!("automation", context = %context, run_id = %run_id);

        async move {
            let Some(_guard) = self.registry.try_acquire(context) else {
                return ExecutionResult::already_running(context);
            };
            self.cancellation.clear(context);

            let config = match self.load_retry_config().await {
                Ok(config) => config,
                Err(result) => return result,
            };

            self.run_attempts(
                context,
                steps,
                variables,
                checkpoint.as_deref(),
                start_offset,
                &config,
            )
            .await
        }
        .instrument(span)
        .await
    }

    async fn load_retry_config(&self) -> Result<RetryConfiguration, ExecutionResult> {
        let config = self.retry_source.load().await.map_err(|e| {
            error!("Failed to load retry configuration: {:#}", e);
            ExecutionResult::failed(
                FailureKind::Configuration,
                0,
                None,
                format!("Failed to load retry configuration: {e:#}"),
            )
        })?;

        config.validate().map_err(|e| {
            error!("Invalid retry configuration: {}", e);
            ExecutionResult::failed(
                FailureKind::Configuration,
                0,
                None,
                format!("Invalid retry configuration: {e}"),
            )
        })?;

        RetryPolicy::log_config(&config);
        Ok(config)
    }

    async fn run_attempts(
        &self,
        context: ContextId,
        steps: &[Step],
        variables: Option<&VariableCollection>,
        checkpoint: Option<&dyn CheckpointSink>,
        start_offset: usize,
        config: &RetryConfiguration,
    ) -> ExecutionResult {
        let sorted = sort_by_execution_order(steps);
        let executor =
            StepSequenceExecutor::new(self.dispatcher.clone(), self.cancellation.clone())
                .with_progress(self.progress.clone());
        let mut retry_count: u32 = 0;

        while attempts_remain(config, retry_count) {
            if self.cancellation.take(context) {
                info!("Auto-fill cancelled by user before attempt {}", retry_count + 1);
                return ExecutionResult::cancelled(0, None);
            }
            if retry_count > 0 {
                RetryPolicy::log_attempt(retry_count, config);
            }

            let result = executor
                .execute(context, &sorted, start_offset, variables, checkpoint)
                .await;

            if result.success {
                RetryPolicy::log_success(retry_count);
                return result;
            }

            if result.is_cancellation() {
                info!("Auto-fill cancelled by user, not retrying");
                self.cancellation.clear(context);
                return result;
            }

            let disposition = result
                .failed_step
                .and_then(|order| sorted.iter().find(|s| s.execution_order == order))
                .map(|step| step.retry)
                .unwrap_or_default();
            if !RetryPolicy::should_retry_from_beginning(disposition) {
                info!(
                    "Step {} failed and is not marked for retry",
                    result.failed_step.map_or_else(|| "?".to_string(), |s| s.to_string())
                );
                return result;
            }

            retry_count += 1;
            if !attempts_remain(config, retry_count) {
                info!(
                    "Maximum retry attempts ({}) reached, giving up",
                    config.max_retries
                );
                return result.with_retries_exhausted(config.max_retries);
            }

            let wait_seconds = RetryPolicy::calculate_wait_seconds(
                config.min_wait_seconds,
                config.max_wait_seconds,
            );
            RetryPolicy::log_wait(result.failed_step, wait_seconds, retry_count, config);

            let started = Instant::now();
            let cancelled = self
                .cancellation
                .sleep_cancellable(context, RetryPolicy::wait_duration(wait_seconds))
                .await;
            RetryPolicy::log_wait_finished(started.elapsed(), wait_seconds, cancelled);

            if cancelled {
                self.cancellation.clear(context);
                return ExecutionResult::cancelled(0, None);
            }
        }

        ExecutionResult::failed(
            FailureKind::HandlerFailure,
            0,
            None,
            "Maximum retry attempts reached",
        )
    }
}

/// Whether attempt number `retry_count + 1` is allowed
fn attempts_remain(config: &RetryConfiguration, retry_count: u32) -> bool {
    config.is_infinite() || i64::from(retry_count) <= i64::from(config.max_retries)
}
