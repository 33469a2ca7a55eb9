use super::{default_settings_path, EngineSettings};
use crate::automation::{RetryConfigSource, RetryConfiguration};
use crate::error::{AutofillError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Reads [`EngineSettings`] from a TOML file and the environment
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    path: PathBuf,
    use_env: bool,
}

impl SettingsLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            use_env: true,
        }
    }

    /// Loader for the settings file in the global autofill directory
    pub fn from_default_location() -> Result<Self> {
        Ok(Self::new(default_settings_path()?))
    }

    /// Skip the environment overlay
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate settings.
    ///
    /// A missing file yields the defaults; a present but malformed file is
    /// an error.
    pub async fn load(&self) -> Result<EngineSettings> {
        let mut settings = if fs::try_exists(&self.path).await.unwrap_or(false) {
            let content = fs::read_to_string(&self.path).await.map_err(|e| {
                AutofillError::config("Failed to read settings file")
                    .with_path(&self.path)
                    .with_source(e)
            })?;
            toml::from_str::<EngineSettings>(&content).map_err(|e| AutofillError::Parse {
                format: "TOML",
                path: self.path.clone(),
                message: e.to_string(),
            })?
        } else {
            debug!(
                "No settings file at {}, using defaults",
                self.path.display()
            );
            EngineSettings::default()
        };

        if self.use_env {
            settings.merge_env_vars()?;
        }

        settings.validate()?;
        Ok(settings)
    }
}

/// Retry configuration re-read from the settings file on every load, so
/// edits apply to the next invocation
#[derive(Debug, Clone)]
pub struct SettingsFileSource {
    loader: SettingsLoader,
    retry_override: Option<i32>,
}

impl SettingsFileSource {
    pub fn new(loader: SettingsLoader) -> Self {
        Self {
            loader,
            retry_override: None,
        }
    }

    /// Replace `max_retries` from the file with `max_retries`
    pub fn with_retry_override(mut self, max_retries: Option<i32>) -> Self {
        self.retry_override = max_retries;
        self
    }
}

#[async_trait]
impl RetryConfigSource for SettingsFileSource {
    async fn load(&self) -> anyhow::Result<RetryConfiguration> {
        let mut retry = self.loader.load().await?.retry;
        if let Some(max_retries) = self.retry_override {
            retry.max_retries = max_retries;
        }
        Ok(retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SettingsLoader::new(temp_dir.path().join("settings.toml")).without_env();

        let settings = loader.load().await.unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[tokio::test]
    async fn test_file_values_are_loaded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "poll_interval = \"20ms\"\n[retry]\nmin_wait_seconds = 1.0\nmax_wait_seconds = 2.0\nmax_retries = -1\n",
        )
        .unwrap();

        let settings = SettingsLoader::new(&path).without_env().load().await.unwrap();
        assert_eq!(settings.poll_interval, Duration::from_millis(20));
        assert_eq!(settings.retry, RetryConfiguration::new(1.0, 2.0, -1));
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        std::fs::write(&path, "[retry\nmax_retries = ").unwrap();

        let err = SettingsLoader::new(&path).without_env().load().await.unwrap_err();
        assert!(matches!(err, AutofillError::Parse { format: "TOML", .. }));
    }

    #[tokio::test]
    async fn test_invalid_values_fail_validation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        std::fs::write(&path, "[retry]\nmin_wait_seconds = 9.0\nmax_wait_seconds = 3.0\n").unwrap();

        let err = SettingsLoader::new(&path).without_env().load().await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_file_source_sees_edits() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        std::fs::write(&path, "[retry]\nmax_retries = 1\n").unwrap();
        let source = SettingsFileSource::new(SettingsLoader::new(&path).without_env());

        assert_eq!(source.load().await.unwrap().max_retries, 1);

        std::fs::write(&path, "[retry]\nmax_retries = 7\n").unwrap();
        assert_eq!(source.load().await.unwrap().max_retries, 7);

        let overridden = source.with_retry_override(Some(0));
        assert_eq!(overridden.load().await.unwrap().max_retries, 0);
    }
}
