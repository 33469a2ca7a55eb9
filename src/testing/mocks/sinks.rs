//! Recording and failing collaborators for testing

use crate::automation::{
    Checkpoint, CheckpointSink, ProgressSink, ProgressUpdate, RetryConfigSource,
    RetryConfiguration,
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Progress sink that keeps every update it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingProgressSink {
    updates: Arc<Mutex<Vec<ProgressUpdate>>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgressSink {
    async fn report(&self, update: ProgressUpdate) -> Result<()> {
        self.updates.lock().unwrap().push(update);
        Ok(())
    }
}

/// Checkpoint sink whose every save fails
#[derive(Debug, Clone, Default)]
pub struct FailingCheckpointSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingCheckpointSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointSink for FailingCheckpointSink {
    async fn save(&self, _checkpoint: &Checkpoint) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("checkpoint storage unavailable")
    }
}

/// Retry source that counts loads, optionally failing them
#[derive(Debug, Clone)]
pub struct MockRetrySource {
    config: RetryConfiguration,
    fail_with: Option<String>,
    loads: Arc<AtomicUsize>,
}

impl MockRetrySource {
    pub fn new(config: RetryConfiguration) -> Self {
        Self {
            config,
            fail_with: None,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(RetryConfiguration::default())
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RetryConfigSource for MockRetrySource {
    async fn load(&self) -> Result<RetryConfiguration> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(self.config.clone()),
        }
    }
}
