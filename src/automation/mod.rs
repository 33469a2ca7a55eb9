//! Automation step execution engine
//!
//! Runs ordered steps against a target context with per-step timeouts,
//! cooperative cancellation, sequence-level retries and resumable
//! checkpoints.

pub mod cancellation;
pub mod checkpoint;
pub mod dispatcher;
pub mod executor;
pub mod orchestrator;
pub mod progress;
pub mod registry;
pub mod result;
pub mod retry;
pub mod step;
pub mod timeout;
pub mod variables;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use cancellation::CancellationCoordinator;
pub use checkpoint::{Checkpoint, CheckpointSink, FileCheckpointStore, MemoryCheckpointStore};
pub use dispatcher::{
    ActionDispatcher, ActionHandler, ActionOutcome, ActionRequest, DryRunHandler, HandlerRegistry,
};
pub use executor::StepSequenceExecutor;
pub use orchestrator::SequenceRetryOrchestrator;
pub use progress::{ChannelProgressSink, ProgressReporter, ProgressSink, ProgressUpdate};
pub use registry::{ActiveExecutionRegistry, ExecutionGuard};
pub use result::{ExecutionResult, FailureKind, CANCELLED_MESSAGE};
pub use retry::{RetryConfigSource, RetryConfiguration, RetryPolicy, INFINITE_RETRIES};
pub use step::{ActionKind, LocatorVariant, Locators, RetryDisposition, Step};
pub use timeout::{TimeoutManager, TimeoutOutcome};
pub use variables::VariableCollection;

/// Identifier of the target an execution runs against, e.g. a browser tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ContextId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
