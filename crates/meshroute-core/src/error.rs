//! Error types for meshroute

use thiserror::Error;

/// Top-level error type for meshroute
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors parsing or validating addresses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid ethernet address: {0}")]
    InvalidEther(String),

    #[error("Invalid node address: {0}")]
    InvalidNode(String),
}

/// Errors loading or validating configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors from the address resolution cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The destination already has a fresh unicast mapping; send directly (EAGAIN)
    #[error("Destination already resolved, send directly")]
    AlreadyResolved,

    /// No entry could be allocated (ENOMEM)
    #[error("Entry allocation failed")]
    OutOfMemory,

    /// State can only be taken over by an empty table
    #[error("Cannot take over state into a non-empty table")]
    LateTakeState,

    /// No entry exists for the requested node
    #[error("No entry for node")]
    NotFound,
}

/// Errors decoding or validating route-carrying packets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Packet truncated: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("Version mismatch: expected {expected:#04x}, got {actual:#04x}")]
    VersionMismatch { expected: u8, actual: u8 },

    #[error("Checksum verification failed")]
    BadChecksum,

    #[error("Next hop index {next} out of range for {links} links")]
    BadNextHop { next: u8, links: u8 },

    #[error("Too many links for a single packet: {0}")]
    TooManyLinks(usize),

    #[error("Payload too long: {0} bytes")]
    DataTooLong(usize),

    #[error("Path too short to encode: {0} airports")]
    PathTooShort(usize),

    #[error("Hop {0} does not start at the node the previous hop ended on")]
    DisjointHops(usize),

    #[error("Interface word {value:#010x} in hop {hop} does not fit 16 bits")]
    BadInterface { hop: usize, value: u32 },

    #[error("Unexpected packet type: {0:#04x}")]
    UnexpectedType(u8),
}

/// Result type alias for meshroute operations
pub type MeshResult<T> = Result<T, MeshError>;
