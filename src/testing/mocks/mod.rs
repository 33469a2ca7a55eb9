//! Mock implementations for testing
//!
//! Scripted and recording stand-ins for every collaborator the engine
//! talks to.

pub mod dispatcher;
pub mod sinks;

pub use dispatcher::{ScriptedDispatcher, StepBehavior};
pub use sinks::{FailingCheckpointSink, MockRetrySource, RecordingProgressSink};
