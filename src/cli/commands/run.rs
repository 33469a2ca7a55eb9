//! `run` and `resume` command implementation

use crate::automation::variables::parse_assignment;
use crate::automation::{
    CheckpointSink, ContextId, ExecutionResult, FileCheckpointStore, HandlerRegistry,
    ProgressReporter, SequenceRetryOrchestrator, VariableCollection,
};
use crate::cli::args::RunArgs;
use crate::cli::progress::ProgressBarSink;
use crate::config::{default_checkpoint_dir, EngineSettings, SettingsFileSource, SettingsLoader};
use crate::steps_file::{load_steps, load_variables};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Resolve the settings loader from an explicit path or the global default
pub(crate) fn settings_loader(config: Option<PathBuf>) -> Result<SettingsLoader> {
    match config {
        Some(path) => Ok(SettingsLoader::new(path)),
        None => SettingsLoader::from_default_location().context("Failed to locate settings"),
    }
}

/// Checkpoint directory from the flag, the settings file, or the default
pub(crate) fn checkpoint_dir(
    flag: Option<PathBuf>,
    settings: &EngineSettings,
) -> Result<PathBuf> {
    match flag.or_else(|| settings.checkpoint_dir.clone()) {
        Some(dir) => Ok(dir),
        None => default_checkpoint_dir().context("Failed to locate checkpoint directory"),
    }
}

/// Build the variable table: file variables, then `--vars-file`, then `--var`
fn collect_variables(
    args: &RunArgs,
    from_steps: VariableCollection,
) -> Result<VariableCollection> {
    let mut variables = from_steps;

    if let Some(path) = &args.vars_file {
        let extra = load_variables(path)
            .with_context(|| format!("Failed to load variables from {}", path.display()))?;
        for (name, value) in extra.iter() {
            variables.set(name, value);
        }
    }

    for raw in &args.vars {
        let (name, value) = parse_assignment(raw)
            .ok_or_else(|| anyhow!("Invalid --var '{}', expected NAME=VALUE", raw))?;
        variables.set(name, value);
    }

    Ok(variables)
}

/// Run the steps file from the start. Returns whether the run succeeded.
pub async fn run(args: RunArgs) -> Result<bool> {
    execute(args, false).await
}

/// Continue the steps file from the context's saved checkpoint
pub async fn resume(args: RunArgs) -> Result<bool> {
    execute(args, true).await
}

async fn execute(args: RunArgs, from_checkpoint: bool) -> Result<bool> {
    let context = ContextId(args.context);
    let loader = settings_loader(args.config.clone())?;
    let settings = loader.load().await.context("Failed to load settings")?;

    let document = load_steps(&args.steps_file)
        .with_context(|| format!("Failed to load steps from {}", args.steps_file.display()))?;
    let variables = collect_variables(&args, document.variables.clone())?;
    let total = document.steps.len();

    let wants_checkpoints = from_checkpoint || args.checkpoint_dir.is_some();
    let store = if wants_checkpoints {
        Some(FileCheckpointStore::new(checkpoint_dir(
            args.checkpoint_dir.clone(),
            &settings,
        )?))
    } else {
        None
    };

    let start_offset = match (&store, from_checkpoint) {
        (Some(store), true) => {
            let checkpoint = store
                .load(context)
                .await?
                .ok_or_else(|| anyhow!("No checkpoint found for context {}", context))?;
            if checkpoint.is_complete() {
                println!(
                    "Checkpoint for context {} is already complete ({} of {} steps)",
                    context, checkpoint.checkpoint_index, checkpoint.total_steps
                );
                return Ok(true);
            }
            info!(
                "Resuming context {} at step index {} ({:.0}% complete, last URL {})",
                context,
                checkpoint.checkpoint_index,
                checkpoint.progress_percentage(),
                checkpoint.last_url
            );
            checkpoint.checkpoint_index
        }
        _ => 0,
    };

    let retry_source = SettingsFileSource::new(loader).with_retry_override(args.retry_count);
    let mut orchestrator = SequenceRetryOrchestrator::new(
        Arc::new(HandlerRegistry::dry_run()),
        Arc::new(retry_source),
    )
    .with_poll_interval(settings.poll_interval);

    let progress_bar = args.progress.then(ProgressBarSink::new);
    if let Some(bar) = &progress_bar {
        orchestrator = orchestrator.with_progress(ProgressReporter::new(Arc::new(bar.clone())));
    }

    let canceller = orchestrator.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling context {}", context);
            canceller.request_cancellation(context);
        }
    });

    let sink = store
        .clone()
        .map(|store| Arc::new(store) as Arc<dyn CheckpointSink>);
    let result = orchestrator
        .run_with_resume(context, &document.steps, Some(&variables), sink, start_offset)
        .await;
    interrupt.abort();

    if let Some(bar) = &progress_bar {
        if result.success {
            bar.finish("done");
        } else {
            bar.abandon("failed");
        }
    }

    if result.success {
        if let Some(store) = &store {
            store.delete(context).await?;
        }
    }

    print_result(&result, start_offset, total);
    Ok(result.success)
}

fn print_result(result: &ExecutionResult, start_offset: usize, total: usize) {
    let completed = start_offset + result.processed_steps;
    if result.success {
        println!("✅ Completed {} of {} steps", completed, total);
        return;
    }

    println!("❌ Completed {} of {} steps", completed, total);
    match (result.failed_step, result.error.as_deref()) {
        (Some(step), Some(error)) => println!("   Step {} failed: {}", step, error),
        (None, Some(error)) => println!("   {}", error),
        (Some(step), None) => println!("   Step {} failed", step),
        (None, None) => {}
    }
}
