//! Command handlers

pub mod checkpoints;
pub mod run;

pub use checkpoints::run_checkpoint_command;
pub use run::{resume, run};
