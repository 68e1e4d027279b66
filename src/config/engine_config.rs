// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use serde::Deserialize;

use crate::config::consts::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_BACKOFF_RESET_MS, DEFAULT_BOUNCE_DELAY_MS,
    DEFAULT_ERROR_DELAY_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_SHUTDOWN_TIMEOUT_MS,
};
use crate::errors::ValidationError;

/// Tuning parameters for the dependency engine.
///
/// Every field has a default, so a config file only needs to name the values
/// it wants to change. Durations are expressed in milliseconds.
///
/// # Fields
/// * `error_delay_ms` - Base delay before retrying a failed manifold
/// * `bounce_delay_ms` - Delay before restarting a worker that returned `Bounce`
/// * `backoff_factor` - Multiplier applied per consecutive failure
/// * `max_delay_ms` - Cap on any retry delay
/// * `backoff_reset_ms` - Uptime after which a failure no longer counts as consecutive
/// * `shutdown_timeout_ms` - How long `kill` may take before the engine reports a timeout
/// * `max_concurrent_starts` - Optional limit on in-flight start functions (unbounded if absent)
///
/// # Example
/// ```yaml
/// error_delay_ms: 500
/// backoff_factor: 2.0
/// max_delay_ms: 30000
/// max_concurrent_starts: 4
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub error_delay_ms: u64,
    pub bounce_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub backoff_reset_ms: u64,
    pub shutdown_timeout_ms: u64,
    pub max_concurrent_starts: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            error_delay_ms: DEFAULT_ERROR_DELAY_MS,
            bounce_delay_ms: DEFAULT_BOUNCE_DELAY_MS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            backoff_reset_ms: DEFAULT_BACKOFF_RESET_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            max_concurrent_starts: None,
        }
    }
}

impl EngineConfig {
    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms)
    }

    pub fn bounce_delay(&self) -> Duration {
        Duration::from_millis(self.bounce_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn backoff_reset(&self) -> Duration {
        Duration::from_millis(self.backoff_reset_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Checks that the settings describe a usable engine.
    ///
    /// All problems are collected rather than stopping at the first one.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.error_delay_ms > self.max_delay_ms {
            errors.push(ValidationError::InvalidSetting {
                setting: "error_delay_ms",
                reason: format!(
                    "base delay {}ms exceeds max_delay_ms {}ms",
                    self.error_delay_ms, self.max_delay_ms
                ),
            });
        }

        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            errors.push(ValidationError::InvalidSetting {
                setting: "backoff_factor",
                reason: format!("must be a finite number >= 1.0, got {}", self.backoff_factor),
            });
        }

        if self.shutdown_timeout_ms == 0 {
            errors.push(ValidationError::InvalidSetting {
                setting: "shutdown_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.max_concurrent_starts == Some(0) {
            errors.push(ValidationError::InvalidSetting {
                setting: "max_concurrent_starts",
                reason: "must be at least 1 when set".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.error_delay(), Duration::from_secs(3));
        assert_eq!(config.max_delay(), Duration::from_secs(120));
        assert_eq!(config.max_concurrent_starts, None);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
error_delay_ms: 250
max_concurrent_starts: 2
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.error_delay_ms, 250);
        assert_eq!(config.max_concurrent_starts, Some(2));
        assert_eq!(config.bounce_delay_ms, DEFAULT_BOUNCE_DELAY_MS);
        assert_eq!(config.backoff_factor, DEFAULT_BACKOFF_FACTOR);
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let config = EngineConfig {
            error_delay_ms: 10_000,
            max_delay_ms: 1_000,
            backoff_factor: 0.5,
            shutdown_timeout_ms: 0,
            max_concurrent_starts: Some(0),
            ..EngineConfig::default()
        };

        let errors = config.validate().unwrap_err();
        let settings: Vec<&str> = errors
            .iter()
            .map(|e| match e {
                ValidationError::InvalidSetting { setting, .. } => *setting,
                other => panic!("unexpected error: {}", other),
            })
            .collect();
        assert_eq!(
            settings,
            vec![
                "error_delay_ms",
                "backoff_factor",
                "shutdown_timeout_ms",
                "max_concurrent_starts"
            ]
        );
    }

    #[test]
    fn test_nan_backoff_factor_rejected() {
        let config = EngineConfig {
            backoff_factor: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
