//! Terminal progress bar fed by the engine's progress updates

use crate::automation::{ProgressSink, ProgressUpdate};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress sink that drives an indicatif bar
#[derive(Clone)]
pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

impl Default for ProgressBarSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressSink for ProgressBarSink {
    async fn report(&self, update: ProgressUpdate) -> anyhow::Result<()> {
        self.bar.set_length(update.total as u64);
        self.bar.set_position(update.current as u64);
        if !update.description.is_empty() {
            self.bar.set_message(update.description);
        }
        Ok(())
    }
}
