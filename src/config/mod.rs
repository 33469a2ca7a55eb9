use crate::automation::cancellation::DEFAULT_POLL_INTERVAL;
use crate::automation::RetryConfiguration;
use crate::error::{AutofillError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod loader;

pub use loader::{SettingsFileSource, SettingsLoader};

pub const ENV_RETRY_COUNT: &str = "AUTOFILL_RETRY_COUNT";
pub const ENV_RETRY_WAIT_MIN: &str = "AUTOFILL_RETRY_WAIT_MIN";
pub const ENV_RETRY_WAIT_MAX: &str = "AUTOFILL_RETRY_WAIT_MAX";
pub const ENV_POLL_INTERVAL: &str = "AUTOFILL_POLL_INTERVAL";

/// Get the global autofill directory for settings and checkpoints
pub fn get_global_autofill_dir() -> Result<PathBuf> {
    ProjectDirs::from("dev", "autofill", "autofill")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| AutofillError::config("Could not determine home directory"))
}

/// Default location of the settings file
pub fn default_settings_path() -> Result<PathBuf> {
    Ok(get_global_autofill_dir()?.join("settings.toml"))
}

/// Default directory for checkpoint files
pub fn default_checkpoint_dir() -> Result<PathBuf> {
    Ok(get_global_autofill_dir()?.join("checkpoints"))
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub retry: RetryConfiguration,
    /// How often waits and timeout races look at the cancellation flag
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retry: RetryConfiguration::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            checkpoint_dir: None,
        }
    }
}

impl EngineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `AUTOFILL_*` environment variables
    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay variables produced by `lookup`; unset variables keep the
    /// current value, malformed ones are an error
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(count) = lookup(ENV_RETRY_COUNT) {
            self.retry.max_retries = parse_env(ENV_RETRY_COUNT, &count)?;
        }

        if let Some(min) = lookup(ENV_RETRY_WAIT_MIN) {
            self.retry.min_wait_seconds = parse_env(ENV_RETRY_WAIT_MIN, &min)?;
        }

        if let Some(max) = lookup(ENV_RETRY_WAIT_MAX) {
            self.retry.max_wait_seconds = parse_env(ENV_RETRY_WAIT_MAX, &max)?;
        }

        if let Some(interval) = lookup(ENV_POLL_INTERVAL) {
            self.poll_interval = humantime_serde::re::humantime::parse_duration(interval.trim())
                .map_err(|e| {
                    AutofillError::config(format!("Invalid {ENV_POLL_INTERVAL}: {interval}"))
                        .with_source(e)
                })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;
        if self.poll_interval.is_zero() {
            return Err(AutofillError::validation(
                "poll_interval",
                "poll_interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim().parse::<T>().map_err(|e| {
        AutofillError::config(format!("Invalid {key}: {raw}")).with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::new();
        assert_eq!(settings.retry, RetryConfiguration::new(30.0, 60.0, 3));
        assert_eq!(settings.poll_interval, Duration::from_millis(100));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_merge_env_overrides() {
        let mut settings = EngineSettings::new();
        settings
            .merge_env_with(env(&[
                (ENV_RETRY_COUNT, "-1"),
                (ENV_RETRY_WAIT_MIN, "1.5"),
                (ENV_RETRY_WAIT_MAX, " 2 "),
                (ENV_POLL_INTERVAL, "250ms"),
            ]))
            .unwrap();

        assert!(settings.retry.is_infinite());
        assert_eq!(settings.retry.min_wait_seconds, 1.5);
        assert_eq!(settings.retry.max_wait_seconds, 2.0);
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_merge_env_rejects_garbage() {
        let mut settings = EngineSettings::new();
        let err = settings
            .merge_env_with(env(&[(ENV_RETRY_COUNT, "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_RETRY_COUNT));

        let err = settings
            .merge_env_with(env(&[(ENV_POLL_INTERVAL, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_POLL_INTERVAL));
    }

    #[test]
    fn test_partial_toml() {
        let settings: EngineSettings = toml::from_str(
            r#"
poll_interval = "50ms"

[retry]
max_retries = 5
"#,
        )
        .unwrap();
        assert_eq!(settings.poll_interval, Duration::from_millis(50));
        assert_eq!(settings.retry.max_retries, 5);
        assert_eq!(settings.retry.min_wait_seconds, 30.0);
        assert!(settings.checkpoint_dir.is_none());
    }

    #[test]
    fn test_zero_poll_interval_invalid() {
        let settings = EngineSettings {
            poll_interval: Duration::ZERO,
            ..EngineSettings::default()
        };
        assert!(settings.validate().unwrap_err().is_validation());
    }
}
