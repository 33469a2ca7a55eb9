//! # Autofill
//!
//! Resilient execution of recorded multi-step form automation.
//!
//! ## Usage
//!
//! ```bash
//! autofill run steps.yaml [--context N] [--var name=value] [--checkpoint-dir DIR]
//! autofill resume steps.yaml --checkpoint-dir DIR
//! ```
//!
//! ## Modules
//!
//! - `automation` - Step execution engine: retries, timeouts, cancellation, checkpoints
//! - `cli` - Command-line interface with a dry-run action dispatcher
//! - `config` - Engine settings from TOML and the environment
//! - `error` - Error type for settings, step files and checkpoint storage
//! - `steps_file` - Loading steps and variables from JSON or YAML
//! - `testing` - Scripted mocks and fixtures for exercising the engine
pub mod automation;
pub mod cli;
pub mod config;
pub mod error;
pub mod steps_file;

pub mod testing;

pub use automation::{
    ContextId, ExecutionResult, SequenceRetryOrchestrator, Step, VariableCollection,
};
pub use error::{AutofillError, Result};
