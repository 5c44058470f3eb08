//! Dispatch configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit-breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Consecutive failures before the circuit opens.
    /// Default: 3
    pub failure_threshold: u32,

    /// Cooldown window before a half-open trial is allowed (in seconds).
    /// Default: 30
    pub cooldown_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 30,
        }
    }
}

impl HealthConfig {
    /// Cooldown window as a Duration.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Configuration for the fan-out dispatcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Circuit-breaker thresholds.
    #[serde(default)]
    pub health: HealthConfig,

    /// Default dispatch deadline in seconds; `None` means no deadline unless
    /// the request supplies one.
    #[serde(default)]
    pub default_deadline_secs: Option<u64>,
}

impl DispatchConfig {
    /// Default deadline as a Duration.
    pub fn default_deadline(&self) -> Option<Duration> {
        self.default_deadline_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.health.failure_threshold, 3);
        assert_eq!(config.health.cooldown_secs, 30);
        assert!(config.default_deadline().is_none());
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = DispatchConfig {
            health: HealthConfig {
                failure_threshold: 5,
                cooldown_secs: 10,
            },
            default_deadline_secs: Some(120),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: DispatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.health.failure_threshold, 5);
        assert_eq!(back.default_deadline(), Some(Duration::from_secs(120)));
    }
}
