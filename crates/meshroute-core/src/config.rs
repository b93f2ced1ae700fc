//! Shared configuration helpers
//!
//! Component configs live next to the component they configure; this
//! module holds what they share: TOML loading and the serde adapters that
//! let durations be written as plain integers.

use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// Deserialize a config from a TOML document
///
/// Missing keys fall back to the type's `#[serde(default)]` values.
pub fn from_toml_str<T: DeserializeOwned>(input: &str) -> Result<T, ConfigError> {
    toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Serialize a [`std::time::Duration`] as whole seconds
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Serialize a [`std::time::Duration`] as whole milliseconds
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
