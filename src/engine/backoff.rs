// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use crate::config::EngineConfig;

/// Bounded exponential restart policy, applied per node.
///
/// The n-th consecutive failure waits `base * factor^(n-1)`, capped at `max`.
/// A worker that stayed up for at least `reset_after` starts counting from
/// one again, however it stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    base: Duration,
    factor: f64,
    max: Duration,
    reset_after: Duration,
}

impl Backoff {
    pub fn new(base: Duration, factor: f64, max: Duration, reset_after: Duration) -> Self {
        Self {
            base,
            factor,
            max,
            reset_after,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.error_delay(),
            config.backoff_factor,
            config.max_delay(),
            config.backoff_reset(),
        )
    }

    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.base.as_nanos() as f64 * self.factor.powi(exponent);
        if !nanos.is_finite() || nanos >= self.max.as_nanos() as f64 {
            self.max
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }

    pub fn should_reset(&self, ran_for: Duration) -> bool {
        ran_for >= self.reset_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff::new(
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(1_000),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let backoff = backoff();
        let delays: Vec<u64> = (1..=6).map(|n| backoff.delay(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
    }

    #[test]
    fn test_delay_is_monotonic_for_long_failure_runs() {
        let backoff = backoff();
        let mut previous = Duration::ZERO;
        for failures in [1, 2, 5, 64, 1_024, u32::MAX] {
            let delay = backoff.delay(failures);
            assert!(delay >= previous);
            assert!(delay <= Duration::from_millis(1_000));
            previous = delay;
        }
    }

    #[test]
    fn test_zero_failures_uses_base_delay() {
        assert_eq!(backoff().delay(0), Duration::from_millis(100));
    }

    #[test]
    fn test_factor_of_one_is_constant() {
        let backoff = Backoff::new(
            Duration::from_millis(250),
            1.0,
            Duration::from_secs(10),
            Duration::from_secs(1),
        );
        assert_eq!(backoff.delay(1), backoff.delay(20));
    }

    #[test]
    fn test_reset_threshold() {
        let backoff = backoff();
        assert!(!backoff.should_reset(Duration::from_secs(59)));
        assert!(backoff.should_reset(Duration::from_secs(60)));
    }

    #[test]
    fn test_from_config() {
        let config = EngineConfig {
            error_delay_ms: 10,
            backoff_factor: 3.0,
            max_delay_ms: 50,
            ..EngineConfig::default()
        };
        let backoff = Backoff::from_config(&config);
        assert_eq!(backoff.delay(2), Duration::from_millis(30));
        assert_eq!(backoff.delay(3), Duration::from_millis(50));
    }
}
