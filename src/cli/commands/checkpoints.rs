//! Checkpoint command implementation

use super::run::{checkpoint_dir, settings_loader};
use crate::automation::{ContextId, FileCheckpointStore};
use crate::cli::args::{CheckpointArgs, CheckpointCommands};
use anyhow::{Context, Result};

pub async fn run_checkpoint_command(command: CheckpointCommands) -> Result<()> {
    match command {
        CheckpointCommands::Show(args) => show(args).await,
        CheckpointCommands::Clear(args) => clear(args).await,
    }
}

async fn open_store(args: &CheckpointArgs) -> Result<FileCheckpointStore> {
    let settings = settings_loader(args.config.clone())?
        .load()
        .await
        .context("Failed to load settings")?;
    Ok(FileCheckpointStore::new(checkpoint_dir(
        args.checkpoint_dir.clone(),
        &settings,
    )?))
}

async fn show(args: CheckpointArgs) -> Result<()> {
    let context = ContextId(args.context);
    let store = open_store(&args).await?;

    match store.load(context).await? {
        Some(checkpoint) => {
            println!("Checkpoint for context {}:", context);
            println!(
                "  Progress: {}/{} steps ({:.1}%)",
                checkpoint.checkpoint_index,
                checkpoint.total_steps,
                checkpoint.progress_percentage()
            );
            println!("  Last URL: {}", checkpoint.last_url);
            println!(
                "  Saved at: {}",
                checkpoint.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        None => println!("No checkpoint found for context {}", context),
    }
    Ok(())
}

async fn clear(args: CheckpointArgs) -> Result<()> {
    let context = ContextId(args.context);
    let store = open_store(&args).await?;

    if store.delete(context).await? {
        println!("Cleared checkpoint for context {}", context);
    } else {
        println!("No checkpoint found for context {}", context);
    }
    Ok(())
}
