//! Resolution cache configuration

use std::time::Duration;

use meshroute_core::config::{duration_millis, duration_secs};
use meshroute_core::{ConfigError, from_toml_str};

use crate::error::ArpResult;
use serde::{Deserialize, Serialize};

/// Configuration for an [`ArpCache`](crate::ArpCache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpConfig {
    /// Most packets held across all entries, 0 for no limit
    /// Default: 2048
    pub packet_capacity: usize,

    /// Most entries kept before the oldest are evicted, 0 for no limit
    /// Default: 0
    pub entry_capacity: usize,

    /// Entries not refreshed for this long expire, 0 for never
    /// Default: 300 seconds
    #[serde(with = "duration_secs")]
    pub timeout: Duration,

    /// Minimum spacing between poll signals for one entry
    /// Default: 100 milliseconds
    #[serde(with = "duration_millis")]
    pub poll_rate_limit: Duration,

    /// Hard ceiling on allocated entries; creating one more fails
    /// Default: none
    pub allocation_limit: Option<usize>,
}

impl Default for ArpConfig {
    fn default() -> Self {
        Self {
            packet_capacity: 2048,
            entry_capacity: 0,
            timeout: Duration::from_secs(300),
            poll_rate_limit: Duration::from_millis(100),
            allocation_limit: None,
        }
    }
}

impl ArpConfig {
    /// Parse and validate a config from TOML
    pub fn from_toml(input: &str) -> ArpResult<Self> {
        let config: Self = from_toml_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> ArpResult<()> {
        if self.allocation_limit == Some(0) {
            return Err(ConfigError::Invalid {
                field: "allocation_limit",
                reason: "must allow at least one entry".to_string(),
            }
            .into());
        }
        match self.allocation_limit {
            Some(limit) if self.entry_capacity > limit => {
                return Err(ConfigError::Invalid {
                    field: "entry_capacity",
                    reason: format!("exceeds allocation_limit of {limit}"),
                }
                .into());
            }
            _ => {}
        }
        Ok(())
    }

    /// Advised cadence for the external timer that calls `slim`, if
    /// entries expire at all
    pub fn slim_interval(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout + Duration::from_secs(1))
        }
    }
}
