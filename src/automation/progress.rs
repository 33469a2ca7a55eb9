//! Fire-and-forget "step N of M" notifications

use super::ContextId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub context: ContextId,
    pub current: usize,
    pub total: usize,
    /// What is about to run; empty once the step has completed
    pub description: String,
}

/// Observer of execution progress
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, update: ProgressUpdate) -> anyhow::Result<()>;
}

/// Sends progress to an optional sink without ever blocking the engine.
///
/// Each report runs on a detached task; a failing or slow sink is logged
/// and otherwise ignored.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    sink: Option<Arc<dyn ProgressSink>>,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Reporter that drops every update
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn report(
        &self,
        context: ContextId,
        current: usize,
        total: usize,
        description: impl Into<String>,
    ) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let update = ProgressUpdate {
            context,
            current,
            total,
            description: description.into(),
        };

        tokio::spawn(async move {
            if let Err(e) = sink.report(update).await {
                debug!("Progress report failed (ignored): {:#}", e);
            }
        });
    }
}

/// Forwards progress updates into a channel
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelProgressSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProgressSink for ChannelProgressSink {
    async fn report(&self, update: ProgressUpdate) -> anyhow::Result<()> {
        self.tx
            .send(update)
            .map_err(|_| anyhow::anyhow!("progress receiver dropped"))
    }
}
