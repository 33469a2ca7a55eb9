//! Uniform outcome returned by every layer of the engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message carried by every user-cancellation failure
pub const CANCELLED_MESSAGE: &str = "Auto-fill cancelled by user";

/// Marker the orchestrator looks for in handler-reported failures
const CANCELLED_MARKER: &str = "cancelled by user";

/// Why an execution did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Another execution is already active for the context
    ConcurrencyConflict,
    /// A step's action reported failure
    HandlerFailure,
    /// A step exceeded its declared timeout
    Timeout,
    /// Cancellation was observed at a poll point
    Cancelled,
    /// Retry configuration could not be loaded
    Configuration,
}

/// Result of a pass or of a whole invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Steps fully completed, not counting a step that was aborted
    pub processed_steps: usize,
    /// Execution order of the step that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ExecutionResult {
    pub fn succeeded(processed_steps: usize) -> Self {
        Self {
            success: true,
            processed_steps,
            failed_step: None,
            error: None,
            failure: None,
        }
    }

    pub fn failed(
        kind: FailureKind,
        processed_steps: usize,
        failed_step: Option<u32>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            processed_steps,
            failed_step,
            error: Some(error.into()),
            failure: Some(kind),
        }
    }

    pub fn cancelled(processed_steps: usize, failed_step: Option<u32>) -> Self {
        Self::failed(
            FailureKind::Cancelled,
            processed_steps,
            failed_step,
            CANCELLED_MESSAGE,
        )
    }

    pub fn already_running(context: impl fmt::Display) -> Self {
        Self::failed(
            FailureKind::ConcurrencyConflict,
            0,
            None,
            format!("Auto-fill already in progress for context {context}"),
        )
    }

    /// Whether this failure came from the user asking to stop.
    ///
    /// Handlers that watch for cancellation themselves report it as a
    /// plain failure, so the message is checked as well as the kind.
    pub fn is_cancellation(&self) -> bool {
        self.failure == Some(FailureKind::Cancelled)
            || self
                .error
                .as_deref()
                .is_some_and(|msg| msg.contains(CANCELLED_MARKER))
    }

    /// Same outcome, reporting `processed_steps` completed steps
    pub fn with_progress(mut self, processed_steps: usize) -> Self {
        self.processed_steps = processed_steps;
        self
    }

    /// Append retry-exhaustion context to the error, keeping everything else
    pub fn with_retries_exhausted(mut self, max_retries: i32) -> Self {
        let base = self.error.take().unwrap_or_default();
        self.error = Some(format!(
            "{base} (Failed after {max_retries} retry attempts)"
        ));
        self
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            return write!(f, "completed {} steps", self.processed_steps);
        }
        write!(f, "completed {} steps", self.processed_steps)?;
        if let Some(step) = self.failed_step {
            write!(f, ", step {step} failed")?;
        }
        if let Some(error) = &self.error {
            write!(f, ": {error}")?;
        }
        Ok(())
    }
}
