use autofill::cli::commands::{resume, run, run_checkpoint_command};
use autofill::cli::{Cli, Commands};
use clap::Parser;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,tokio=debug", // -vvv shows everything including dependencies
    };

    let filter =
        EnvFilter::try_from_env("AUTOFILL_LOG").unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(cli.verbose >= 3) // Show thread IDs for -vvv
        .with_line_number(cli.verbose >= 3) // Show line numbers for -vvv
        .init();

    debug!("autofill started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Resume(args) => resume(args).await,
        Commands::Checkpoint { command } => run_checkpoint_command(command).await.map(|_| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
