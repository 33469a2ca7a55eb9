//! Resumable progress checkpoints
//!
//! A checkpoint is written after every navigation step so an interrupted
//! run can later continue from the recorded index.

use super::ContextId;
use crate::error::{AutofillError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tracing::{debug, info};

/// Version for checkpoint format compatibility
pub const CHECKPOINT_VERSION: u32 = 1;

/// Where an interrupted run can pick up again
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub context: ContextId,
    /// Index into the sorted step list of the next step to run
    pub checkpoint_index: usize,
    pub total_steps: usize,
    /// URL navigated to by the step that produced this checkpoint
    pub last_url: String,
    pub saved_at: DateTime<Utc>,
    #[serde(default = "current_version")]
    pub version: u32,
}

fn current_version() -> u32 {
    CHECKPOINT_VERSION
}

impl Checkpoint {
    pub fn new(
        context: ContextId,
        checkpoint_index: usize,
        total_steps: usize,
        last_url: impl Into<String>,
    ) -> Self {
        Self {
            context,
            checkpoint_index,
            total_steps,
            last_url: last_url.into(),
            saved_at: Utc::now(),
            version: CHECKPOINT_VERSION,
        }
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        (self.checkpoint_index as f64 / self.total_steps as f64) * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.checkpoint_index >= self.total_steps
    }
}

/// Best-effort persistence of checkpoints
#[async_trait]
pub trait CheckpointSink: Send + Sync {
    async fn save(&self, checkpoint: &Checkpoint) -> anyhow::Result<()>;
}

/// One JSON file per context, written atomically
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, context: ContextId) -> PathBuf {
        self.dir.join(format!("context-{}.json", context))
    }

    pub async fn write(&self, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.path_for(checkpoint.context);
        let temp_path = path.with_extension("tmp");

        fs::create_dir_all(&self.dir).await.map_err(|e| {
            AutofillError::storage("Failed to create checkpoint directory")
                .with_path(&self.dir)
                .with_source(e)
        })?;

        let json = serde_json::to_string_pretty(checkpoint).map_err(|e| {
            AutofillError::storage("Failed to serialize checkpoint").with_source(e)
        })?;
        fs::write(&temp_path, json).await.map_err(|e| {
            AutofillError::storage("Failed to write checkpoint to temp file")
                .with_path(&temp_path)
                .with_source(e)
        })?;
        fs::rename(&temp_path, &path).await.map_err(|e| {
            AutofillError::storage("Failed to move checkpoint to final location")
                .with_path(&path)
                .with_source(e)
        })?;

        debug!(
            "Wrote checkpoint for context {} at index {}",
            checkpoint.context, checkpoint.checkpoint_index
        );
        Ok(())
    }

    /// Load the checkpoint for `context`, if one was saved
    pub async fn load(&self, context: ContextId) -> Result<Option<Checkpoint>> {
        let path = self.path_for(context);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AutofillError::storage("Failed to read checkpoint")
                    .with_path(&path)
                    .with_source(e))
            }
        };

        let checkpoint: Checkpoint =
            serde_json::from_str(&content).map_err(|e| AutofillError::Parse {
                format: "JSON",
                path: path.clone(),
                message: e.to_string(),
            })?;

        if checkpoint.version > CHECKPOINT_VERSION {
            return Err(AutofillError::storage(format!(
                "Checkpoint version {} is newer than supported version {}",
                checkpoint.version, CHECKPOINT_VERSION
            ))
            .with_path(&path));
        }
        Ok(Some(checkpoint))
    }

    /// Remove the checkpoint for `context`. Returns whether one existed.
    pub async fn delete(&self, context: ContextId) -> Result<bool> {
        let path = self.path_for(context);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted checkpoint for context {}", context);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AutofillError::storage("Failed to delete checkpoint")
                .with_path(&path)
                .with_source(e)),
        }
    }
}

#[async_trait]
impl CheckpointSink for FileCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        self.write(checkpoint).await?;
        Ok(())
    }
}

/// In-memory checkpoints, latest per context
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    saved: Arc<Mutex<HashMap<ContextId, Vec<Checkpoint>>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, context: ContextId) -> Option<Checkpoint> {
        self.history(context).pop()
    }

    /// Every checkpoint saved for `context`, oldest first
    pub fn history(&self, context: ContextId) -> Vec<Checkpoint> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&context)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CheckpointSink for MemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(checkpoint.context)
            .or_default()
            .push(checkpoint.clone());
        Ok(())
    }
}
