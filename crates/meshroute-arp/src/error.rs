//! Address resolution error types
//!
//! Re-exports core resolution errors and adds the rejected-packet wrapper
//! used when a queued packet is handed back to the caller.

use std::fmt;

use thiserror::Error;

pub use meshroute_core::{ConfigError, ResolutionError};

/// Errors from the address resolution cache
#[derive(Debug, Error)]
pub enum ArpError {
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ArpError> for meshroute_core::MeshError {
    fn from(err: ArpError) -> Self {
        match err {
            ArpError::Resolution(e) => e.into(),
            ArpError::Config(e) => e.into(),
        }
    }
}

/// A packet that could not be queued, returned with the reason
pub struct Rejected<P> {
    pub packet: P,
    pub reason: ResolutionError,
}

impl<P> Rejected<P> {
    /// Take the packet back
    pub fn into_packet(self) -> P {
        self.packet
    }
}

impl<P> fmt::Debug for Rejected<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl<P> fmt::Display for Rejected<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet rejected: {}", self.reason)
    }
}

impl<P> std::error::Error for Rejected<P> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

impl<P> From<Rejected<P>> for ArpError {
    fn from(rejected: Rejected<P>) -> Self {
        ArpError::Resolution(rejected.reason)
    }
}

/// Result type for resolution cache operations
pub type ArpResult<T> = Result<T, ArpError>;
