//! # Meshroute ARP
//!
//! Address resolution for multi-radio nodes: maps an (IP, interface)
//! endpoint to the link-layer address of that radio, and parks outbound
//! packets while the mapping is unknown.
//!
//! ## Core Components
//!
//! - [`ArpCache`]: The concurrent cache, generic over the queued packet type
//! - [`ArpConfig`]: Capacities, expiry and poll rate limit
//! - [`Rejected`]: A packet handed back when it cannot be queued
//!
//! ## Behavior
//!
//! Entries age from their last insert. Lookups never refresh that age, so
//! the oldest-inserted entry is always the first evicted. Queued packets
//! are released in arrival order by [`ArpCache::insert_and_drain`];
//! packets lost to eviction, capacity limits or [`ArpCache::clear`] are
//! counted by [`ArpCache::drops`].
//!
//! The cache runs no timers. Embedders call [`ArpCache::slim`] every
//! [`ArpConfig::slim_interval`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use meshroute_arp::{ArpCache, QueryOutcome};
//!
//! let cache: ArpCache<Vec<u8>> = ArpCache::new();
//! match cache.append_query(next_hop, packet) {
//!     Ok(QueryOutcome::Queued { poll: true }) => send_arp_request(next_hop),
//!     Ok(QueryOutcome::Queued { poll: false }) => {}
//!     Err(rejected) => transmit(cache.lookup(next_hop), rejected.into_packet()),
//! }
//! ```

pub mod cache;
pub mod config;
mod entry;
pub mod error;

// Re-export main types
pub use cache::{ArpCache, EntrySnapshot, QueryOutcome, Resolved};
pub use config::ArpConfig;
pub use error::{ArpError, ArpResult, Rejected};
