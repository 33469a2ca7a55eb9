//! Command-line interface
//!
//! Runs steps files through the engine with a dry-run dispatcher that logs
//! each action instead of touching a document.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{CheckpointArgs, CheckpointCommands, Cli, Commands, RunArgs};
