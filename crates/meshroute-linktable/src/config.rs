//! Link-state table configuration

use std::time::Duration;

use meshroute_core::config::duration_secs;
use meshroute_core::{ConfigError, from_toml_str};
use serde::{Deserialize, Serialize};

/// Configuration for a [`LinkTable`](crate::LinkTable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTableConfig {
    /// Links older than this are ignored on update and removed by
    /// `clear_stale`
    /// Default: 120 seconds
    #[serde(with = "duration_secs")]
    pub stale_timeout: Duration,

    /// Routes whose total metric reaches this value are invalid
    /// Default: 777777
    pub max_route_metric: u32,

    /// Advised cadence for the external timer that runs `clear_stale`
    /// followed by both Dijkstra passes
    /// Default: 5 seconds
    #[serde(with = "duration_secs")]
    pub refresh_interval: Duration,
}

impl Default for LinkTableConfig {
    fn default() -> Self {
        Self {
            stale_timeout: Duration::from_secs(120),
            max_route_metric: 777_777,
            refresh_interval: Duration::from_secs(5),
        }
    }
}

impl LinkTableConfig {
    /// Parse and validate a config from TOML
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: Self = from_toml_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stale_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "stale_timeout",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.max_route_metric == 0 {
            return Err(ConfigError::Invalid {
                field: "max_route_metric",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "refresh_interval",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
