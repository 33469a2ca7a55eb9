//! Testing utilities and fixtures
//!
//! This module provides mocks and a ready-wired engine for exercising the
//! orchestrator without a real document.

pub mod fixtures;
pub mod mocks;

use crate::automation::{
    CancellationCoordinator, RetryConfiguration, SequenceRetryOrchestrator,
};
use mocks::{MockRetrySource, ScriptedDispatcher};
use std::sync::Arc;
use std::time::Duration;

/// Poll interval used by test engines, short enough to keep tests fast
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Orchestrator wired to a scripted dispatcher and a counting retry source
pub struct TestEngine {
    pub orchestrator: SequenceRetryOrchestrator,
    pub dispatcher: ScriptedDispatcher,
    pub retry_source: MockRetrySource,
}

impl TestEngine {
    /// Engine with no scripted behaviors and the given retry settings
    pub fn new(config: RetryConfiguration) -> Self {
        Self::with_dispatcher(ScriptedDispatcher::new(), config)
    }

    /// Engine around `dispatcher`. The dispatcher is given the engine's
    /// cancellation coordinator so it can cancel from inside a step.
    pub fn with_dispatcher(dispatcher: ScriptedDispatcher, config: RetryConfiguration) -> Self {
        Self::with_source(dispatcher, MockRetrySource::new(config))
    }

    pub fn with_source(dispatcher: ScriptedDispatcher, retry_source: MockRetrySource) -> Self {
        let cancellation = CancellationCoordinator::new().with_poll_interval(TEST_POLL_INTERVAL);
        let dispatcher = dispatcher.with_cancellation(cancellation.clone());
        let orchestrator = SequenceRetryOrchestrator::new(
            Arc::new(dispatcher.clone()),
            Arc::new(retry_source.clone()),
        )
        .with_cancellation(cancellation);

        Self {
            orchestrator,
            dispatcher,
            retry_source,
        }
    }

    pub fn cancellation(&self) -> &CancellationCoordinator {
        self.orchestrator.cancellation()
    }
}

/// Retry settings with no wait between attempts
pub fn instant_retries(max_retries: i32) -> RetryConfiguration {
    RetryConfiguration::new(0.0, 0.0, max_retries)
}
