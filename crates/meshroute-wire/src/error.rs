//! Wire encoding error types

use thiserror::Error;

pub use meshroute_core::{ConfigError, ProtocolError};

/// Errors from encoding, decoding or checking packets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<WireError> for meshroute_core::MeshError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Protocol(e) => e.into(),
            WireError::Config(e) => e.into(),
        }
    }
}

/// Result type for wire operations
pub type WireResult<T> = Result<T, WireError>;
