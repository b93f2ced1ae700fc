//! # Meshroute Core
//!
//! Core types, traits, and errors for the meshroute multi-radio
//! source-routing stack.
//!
//! Every node in the mesh owns several radio interfaces. An interface is
//! named by a small numeric id that is independent of the node's IP
//! address, so the unit of addressing is a [`NodeAddress`] (IP plus
//! interface) and a source route is a sequence of [`NodeAirport`]s: the
//! interface a packet arrives on at each node and the interface it leaves on.
//!
//! ## Key Types
//!
//! - [`NodeAddress`]: An (IP, interface) endpoint
//! - [`NodeAirport`]: One hop's radio usage along a path
//! - [`NodePair`]: A directed link between two endpoints
//! - [`EtherAddress`]: A link-layer (MAC) address
//! - [`Path`]: A multi-radio source route
//!
//! ## Key Traits
//!
//! - [`Clock`]: Time abstraction for testability
//! - [`LinkMetrics`]: Read access to per-link metrics, used when stamping routes into packets

pub mod address;
pub mod config;
pub mod error;
pub mod path;
pub mod traits;

// Re-export main types
pub use address::*;
pub use config::from_toml_str;
pub use error::*;
pub use path::*;
pub use traits::*;
