//! Common test utilities and helpers

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Settings with instant retries and a fast poll, so CLI runs finish quickly
pub const FAST_SETTINGS: &str = r#"
poll_interval = "10ms"

[retry]
min_wait_seconds = 0.0
max_wait_seconds = 0.0
max_retries = 0
"#;

/// Temporary workspace holding a steps file, settings and checkpoints
pub struct CliWorkspace {
    temp_dir: TempDir,
}

impl CliWorkspace {
    pub fn new() -> Result<Self> {
        let workspace = Self {
            temp_dir: TempDir::new()?,
        };
        workspace.write("settings.toml", FAST_SETTINGS)?;
        fs::create_dir_all(workspace.checkpoint_dir())?;
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn settings_path(&self) -> PathBuf {
        self.path().join("settings.toml")
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.path().join("checkpoints")
    }

    pub fn checkpoint_path(&self, context: u64) -> PathBuf {
        self.checkpoint_dir().join(format!("context-{context}.json"))
    }

    /// Write `content` to `name` under the workspace and return its path
    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write a checkpoint file the way the engine would
    pub fn write_checkpoint(
        &self,
        context: u64,
        checkpoint_index: usize,
        total_steps: usize,
        last_url: &str,
    ) -> Result<PathBuf> {
        let json = serde_json::json!({
            "context": context,
            "checkpoint_index": checkpoint_index,
            "total_steps": total_steps,
            "last_url": last_url,
            "saved_at": "2026-01-01T00:00:00Z",
            "version": 1,
        });
        let path = self.checkpoint_path(context);
        fs::write(&path, serde_json::to_string_pretty(&json)?)?;
        Ok(path)
    }
}

/// A three-step signup flow: navigate, type the user, submit
pub const SIGNUP_STEPS_YAML: &str = r#"
variables:
  user: alice
steps:
  - execution_order: 1
    action: change_url
    value: https://example.com/signup
  - execution_order: 2
    action: type
    value: "{{user}}"
    locators:
      smart: "//input[@name='user']"
  - execution_order: 3
    action: click
    locators:
      smart: "//button[@type='submit']"
"#;
