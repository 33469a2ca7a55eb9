//! One pass over a step sequence
//!
//! A pass walks the sorted steps from an offset to the end or to the first
//! failure. Cancellation is checked before each step, while each step's
//! handler runs, and during each post-step wait.

use super::cancellation::CancellationCoordinator;
use super::checkpoint::{Checkpoint, CheckpointSink};
use super::dispatcher::{ActionDispatcher, ActionOutcome, ActionRequest};
use super::progress::ProgressReporter;
use super::result::{ExecutionResult, FailureKind};
use super::step::{sort_by_execution_order, ActionKind, Step};
use super::timeout::{TimeoutManager, TimeoutOutcome};
use super::variables::VariableCollection;
use super::ContextId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest captured value prefix written to the log
const CAPTURE_LOG_CHARS: usize = 50;

/// Runs a single attempt of a sequence
#[derive(Clone)]
pub struct StepSequenceExecutor {
    dispatcher: Arc<dyn ActionDispatcher>,
    cancellation: CancellationCoordinator,
    timeouts: TimeoutManager,
    progress: ProgressReporter,
}

impl StepSequenceExecutor {
    /// Executor polling `cancellation` at its own poll interval
    pub fn new(
        dispatcher: Arc<dyn ActionDispatcher>,
        cancellation: CancellationCoordinator,
    ) -> Self {
        let timeouts = TimeoutManager::new(cancellation.poll_interval());
        Self {
            dispatcher,
            cancellation,
            timeouts,
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn cancellation(&self) -> &CancellationCoordinator {
        &self.cancellation
    }

    /// Run the steps from `start_offset` onwards.
    ///
    /// `variables` is cloned before the first step; values captured during
    /// the pass are visible to later steps of this pass only.
    pub async fn execute(
        &self,
        context: ContextId,
        steps: &[Step],
        start_offset: usize,
        variables: Option<&VariableCollection>,
        checkpoint: Option<&dyn CheckpointSink>,
    ) -> ExecutionResult {
        let sorted = sort_by_execution_order(steps);
        let to_execute = sorted.get(start_offset..).unwrap_or_default();
        let total = to_execute.len();

        if start_offset > 0 {
            info!(
                "Starting auto-fill with {} steps (resuming from step {})",
                total, start_offset
            );
        } else {
            info!("Starting auto-fill with {} steps", total);
        }

        let mut variables = variables.cloned().unwrap_or_default();
        let mut processed = 0usize;

        for step in to_execute {
            let order = step.execution_order;

            if self.cancellation.take(context) {
                info!("Auto-fill cancelled by user at step {}", order);
                return ExecutionResult::cancelled(processed, Some(order));
            }

            let resolved = step.with_variables(&variables);
            self.progress.report(context, processed, total, step.describe());
            let outcome = match self.run_step(context, &resolved).await {
                Ok(outcome) => outcome,
                Err(result) => return result.with_progress(processed),
            };

            if step.action == ActionKind::GetValue {
                if let Some(value) = outcome.captured_value.filter(|v| !v.is_empty()) {
                    let name = outcome
                        .captured_name
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| step.value.clone());
                    info!(
                        "Variable '{}' added with value: {}",
                        name,
                        truncate_for_log(&value, CAPTURE_LOG_CHARS)
                    );
                    variables.set(name, value);
                }
            }

            processed += 1;

            if step.action == ActionKind::ChangeUrl {
                if let Some(sink) = checkpoint {
                    let saved = Checkpoint::new(
                        context,
                        start_offset + processed,
                        sorted.len(),
                        resolved.value.as_str(),
                    );
                    if let Err(e) = sink.save(&saved).await {
                        warn!(
                            "Failed to save checkpoint at index {} (continuing): {:#}",
                            saved.checkpoint_index, e
                        );
                    }
                }
            }

            self.progress.report(context, processed, total, "");

            if step.after_wait_seconds > 0.0 {
                debug!("Waiting {}s after step {}", step.after_wait_seconds, order);
                let wait = Duration::try_from_secs_f64(step.after_wait_seconds)
                    .unwrap_or(Duration::MAX);
                if self.cancellation.sleep_cancellable(context, wait).await {
                    info!("Auto-fill cancelled by user during wait after step {}", order);
                    self.cancellation.clear(context);
                    return ExecutionResult::cancelled(processed, Some(order));
                }
            }
        }

        info!("Auto-fill completed successfully. Processed {} steps.", processed);
        ExecutionResult::succeeded(processed)
    }

    /// Dispatch one substituted step through the timeout race.
    ///
    /// The error side carries a failure result whose processed count the
    /// caller fills in.
    async fn run_step(
        &self,
        context: ContextId,
        step: &Step,
    ) -> Result<ActionOutcome, ExecutionResult> {
        let order = step.execution_order;
        let request = ActionRequest::for_step(context, step);

        let cancellation = &self.cancellation;
        let outcome = self
            .timeouts
            .run(
                self.dispatcher.dispatch(request),
                step.timeout_seconds,
                context,
                order,
                |ctx| cancellation.is_cancelled(ctx),
            )
            .await;

        match outcome {
            TimeoutOutcome::Completed(outcome) if outcome.success => Ok(outcome),
            TimeoutOutcome::Completed(outcome) => Err(handler_failure(order, outcome.message)),
            TimeoutOutcome::Failed(message) => Err(handler_failure(order, Some(message))),
            TimeoutOutcome::TimedOut(message) => Err(ExecutionResult::failed(
                FailureKind::Timeout,
                0,
                Some(order),
                message,
            )),
            TimeoutOutcome::Cancelled => {
                self.cancellation.clear(context);
                Err(ExecutionResult::cancelled(0, Some(order)))
            }
        }
    }
}

fn handler_failure(order: u32, message: Option<String>) -> ExecutionResult {
    let message = message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Failed to execute step {order}"));
    ExecutionResult::failed(FailureKind::HandlerFailure, 0, Some(order), message)
}

fn truncate_for_log(value: &str, max_chars: usize) -> String {
    let mut preview: String = value.chars().take(max_chars).collect();
    if value.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}
