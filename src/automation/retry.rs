//! Sequence-level retry policy
//!
//! Decides whether a failed pass restarts the sequence from its first step
//! and how long to wait before doing so. The wait is a uniform random draw
//! between the configured bounds.

use super::step::RetryDisposition;
use crate::error::{AutofillError, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// `max_retries` value meaning "retry forever"
pub const INFINITE_RETRIES: i32 = -1;

/// Retry settings for one top-level invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfiguration {
    #[serde(default = "default_min_wait")]
    pub min_wait_seconds: f64,
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: f64,
    /// Additional attempts after the first; `-1` for unlimited
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
}

impl Default for RetryConfiguration {
    fn default() -> Self {
        Self {
            min_wait_seconds: default_min_wait(),
            max_wait_seconds: default_max_wait(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_min_wait() -> f64 {
    30.0
}

fn default_max_wait() -> f64 {
    60.0
}

fn default_max_retries() -> i32 {
    3
}

impl RetryConfiguration {
    pub fn new(min_wait_seconds: f64, max_wait_seconds: f64, max_retries: i32) -> Self {
        Self {
            min_wait_seconds,
            max_wait_seconds,
            max_retries,
        }
    }

    pub fn is_infinite(&self) -> bool {
        RetryPolicy::is_infinite(self.max_retries)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("retry.min_wait_seconds", self.min_wait_seconds),
            ("retry.max_wait_seconds", self.max_wait_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AutofillError::validation(
                    field,
                    format!("{field} must be a non-negative number of seconds, got {value}"),
                ));
            }
        }
        if self.min_wait_seconds > self.max_wait_seconds {
            return Err(AutofillError::validation(
                "retry.min_wait_seconds",
                format!(
                    "retry wait min ({}) must not exceed max ({})",
                    self.min_wait_seconds, self.max_wait_seconds
                ),
            ));
        }
        if self.max_retries < INFINITE_RETRIES {
            return Err(AutofillError::validation(
                "retry.max_retries",
                format!(
                    "retry count must be -1 (infinite) or non-negative, got {}",
                    self.max_retries
                ),
            ));
        }
        Ok(())
    }

    /// Human-readable attempt limit for logs
    pub fn describe_limit(&self) -> String {
        if self.is_infinite() {
            "infinite".to_string()
        } else {
            self.max_retries.to_string()
        }
    }
}

/// Where the orchestrator reads its retry settings from, once per invocation
#[async_trait]
pub trait RetryConfigSource: Send + Sync {
    async fn load(&self) -> anyhow::Result<RetryConfiguration>;
}

#[async_trait]
impl RetryConfigSource for RetryConfiguration {
    async fn load(&self) -> anyhow::Result<RetryConfiguration> {
        Ok(self.clone())
    }
}

/// Pure retry decisions plus the log lines that accompany them
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy;

impl RetryPolicy {
    /// Only `RestartSequence` restarts the pass from the beginning
    pub fn should_retry_from_beginning(disposition: RetryDisposition) -> bool {
        matches!(disposition, RetryDisposition::RestartSequence)
    }

    /// Uniform random wait in `[min, max]` seconds
    pub fn calculate_wait_seconds(min: f64, max: f64) -> f64 {
        if max <= min {
            return min.max(0.0);
        }
        rand::rng().random_range(min..=max)
    }

    pub fn is_infinite(max_retries: i32) -> bool {
        max_retries == INFINITE_RETRIES
    }

    /// Wait rounded to two decimals, for display only
    pub fn round_for_display(seconds: f64) -> f64 {
        (seconds * 100.0).round() / 100.0
    }

    /// The unrounded wait as a sleep duration
    pub fn wait_duration(seconds: f64) -> Duration {
        Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn log_config(config: &RetryConfiguration) {
        info!(
            "Retry configuration - Max attempts: {}, Wait time: {}-{} seconds (random)",
            config.describe_limit(),
            config.min_wait_seconds,
            config.max_wait_seconds
        );
    }

    pub fn log_attempt(retry_count: u32, config: &RetryConfiguration) {
        if config.is_infinite() {
            info!("Retry attempt {} (infinite mode)", retry_count);
        } else {
            info!("Retry attempt {}/{}", retry_count, config.max_retries);
        }
    }

    pub fn log_wait(
        failed_step: Option<u32>,
        wait_seconds: f64,
        retry_count: u32,
        config: &RetryConfiguration,
    ) {
        let step = failed_step.map_or_else(|| "?".to_string(), |s| s.to_string());
        info!("Step {} failed and is marked to restart the sequence.", step);
        info!(
            "Waiting {} seconds ({}ms) before retry...",
            Self::round_for_display(wait_seconds),
            wait_seconds * 1000.0
        );
        if config.is_infinite() {
            info!("Retry attempt {} will start", retry_count);
        } else {
            info!(
                "Retry attempt {}/{} will start",
                retry_count, config.max_retries
            );
        }
    }

    pub fn log_wait_finished(actual: Duration, expected_seconds: f64, cancelled: bool) {
        let expected = Self::round_for_display(expected_seconds);
        if cancelled {
            info!(
                "Wait interrupted by cancellation after {:.2}s (expected: {}s)",
                actual.as_secs_f64(),
                expected
            );
        } else {
            info!(
                "Wait completed (actual: {:.2}s, expected: {}s).",
                actual.as_secs_f64(),
                expected
            );
        }
    }

    pub fn log_success(retry_count: u32) {
        match retry_count {
            0 => info!("Auto-fill completed successfully on first attempt"),
            1 => info!("Auto-fill completed successfully after 1 retry attempt"),
            n => info!("Auto-fill completed successfully after {} retry attempts", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_restart_disposition_retries() {
        assert!(RetryPolicy::should_retry_from_beginning(
            RetryDisposition::RestartSequence
        ));
        assert!(!RetryPolicy::should_retry_from_beginning(
            RetryDisposition::NoRetry
        ));
    }

    #[test]
    fn test_infinite_sentinel() {
        assert!(RetryPolicy::is_infinite(-1));
        assert!(!RetryPolicy::is_infinite(0));
        assert!(!RetryPolicy::is_infinite(5));
        assert!(RetryConfiguration::new(1.0, 2.0, -1).is_infinite());
    }

    #[test]
    fn test_wait_stays_within_bounds() {
        for _ in 0..200 {
            let wait = RetryPolicy::calculate_wait_seconds(1.5, 2.5);
            assert!((1.5..=2.5).contains(&wait), "wait {wait} out of range");
        }
        assert_eq!(RetryPolicy::calculate_wait_seconds(3.0, 3.0), 3.0);
        assert_eq!(RetryPolicy::calculate_wait_seconds(4.0, 1.0), 4.0);
    }

    #[test]
    fn test_rounding_is_display_only() {
        let wait = 1.23456;
        assert_eq!(RetryPolicy::round_for_display(wait), 1.23);
        assert_eq!(
            RetryPolicy::wait_duration(wait),
            Duration::from_secs_f64(1.23456)
        );
    }

    #[test]
    fn test_validation() {
        assert!(RetryConfiguration::default().validate().is_ok());
        assert!(RetryConfiguration::new(0.0, 0.0, -1).validate().is_ok());

        let inverted = RetryConfiguration::new(5.0, 1.0, 3).validate().unwrap_err();
        assert!(inverted.to_string().contains("must not exceed"));

        let negative = RetryConfiguration::new(-1.0, 1.0, 3).validate();
        assert!(negative.is_err());

        let bad_count = RetryConfiguration::new(1.0, 2.0, -2).validate().unwrap_err();
        assert!(bad_count.is_validation());
    }

    #[test]
    fn test_defaults_and_partial_deserialize() {
        let config: RetryConfiguration = toml::from_str("max_retries = -1").unwrap();
        assert_eq!(config.min_wait_seconds, 30.0);
        assert_eq!(config.max_wait_seconds, 60.0);
        assert!(config.is_infinite());
        assert_eq!(config.describe_limit(), "infinite");
    }

    #[tokio::test]
    async fn test_fixed_configuration_is_a_source() {
        let fixed = RetryConfiguration::new(0.1, 0.2, 2);
        let loaded = fixed.load().await.unwrap();
        assert_eq!(loaded, fixed);
    }
}
