//! CLI argument structures

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Run recorded form-automation sequences with retry, timeout and resume
#[derive(Parser)]
#[command(name = "autofill")]
#[command(about = "autofill - Run multi-step form automation sequences", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a steps file from the beginning
    Run(RunArgs),

    /// Continue a steps file from its saved checkpoint
    Resume(RunArgs),

    /// Inspect or remove saved checkpoints
    Checkpoint {
        #[command(subcommand)]
        command: CheckpointCommands,
    },
}

/// Options shared by `run` and `resume`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Steps file (.json, .yaml or .yml)
    pub steps_file: PathBuf,

    /// Context to run against
    #[arg(long, default_value = "1")]
    pub context: u64,

    /// Set a variable (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    /// File of variables (.json, .yaml or .yml)
    #[arg(long, value_name = "FILE")]
    pub vars_file: Option<PathBuf>,

    /// Directory for checkpoint files
    #[arg(long, value_name = "DIR")]
    pub checkpoint_dir: Option<PathBuf>,

    /// Settings file (defaults to the global settings.toml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the configured retry count (-1 for infinite)
    #[arg(long, allow_negative_numbers = true)]
    pub retry_count: Option<i32>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,
}

#[derive(Subcommand)]
pub enum CheckpointCommands {
    /// Show the saved checkpoint for a context
    Show(CheckpointArgs),
    /// Delete the saved checkpoint for a context
    Clear(CheckpointArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CheckpointArgs {
    /// Directory for checkpoint files
    #[arg(long, value_name = "DIR")]
    pub checkpoint_dir: Option<PathBuf>,

    #[arg(long, default_value = "1")]
    pub context: u64,

    /// Settings file (defaults to the global settings.toml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
