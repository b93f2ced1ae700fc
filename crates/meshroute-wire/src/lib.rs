//! # Meshroute Wire
//!
//! Binary format for source-routed packets that carry their multi-radio
//! route with them.
//!
//! A packet is a 20-byte fixed header followed by one 28-byte record per
//! hop and an optional data region. Each hop record names the departure
//! endpoint, the arrival interface, both link metrics, and the sequence
//! number and age of the forward link. Consecutive records share the IP
//! word of the node between them, which is why a route of N hops costs
//! `28 * N + 4` bytes.
//!
//! ## Core Components
//!
//! - [`RoutePacket`]: Decoded packet with builder-style construction
//! - [`HopRecord`]: One hop, buildable from a path and a [`LinkMetrics`](meshroute_core::LinkMetrics) source
//! - [`HeaderChecker`]: Inbound validation with drop and bad-version bookkeeping
//! - [`set_checksum`] / [`verify_checksum`]: Internet checksum over the header region
//! - [`strip_header`]: Payload view past the route

pub mod check;
pub mod checksum;
pub mod error;
pub mod header;
pub mod packet;

// Re-export main types
pub use check::{CheckHeaderConfig, HeaderChecker};
pub use checksum::{internet_checksum, set_checksum, verify_checksum};
pub use error::{WireError, WireResult};
pub use header::{HeaderFields, VERSION, carries_data, flags, len_with_data, len_wo_data, packet_type, strip_header};
pub use packet::{HopRecord, RoutePacket};
