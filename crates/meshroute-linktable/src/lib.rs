//! # Meshroute Link Table
//!
//! Link-state database and route computation for multi-radio mesh nodes.
//!
//! Links are directed and keyed by full endpoints (IP plus interface), so
//! two nodes with several radios in common have one record per interface
//! pair. Shortest paths are computed per direction with a Dijkstra pass
//! whose edge cost rewards channel diversity, and routes come back as
//! sequences of [`NodeAirport`](meshroute_core::NodeAirport)s naming the
//! radio used on both ends of every hop.
//!
//! ## Core Components
//!
//! - [`LinkTable`]: The table and every query on it
//! - [`LinkInfo`]: One directed link record
//! - [`HostInfo`]: One node's interfaces and per-direction Dijkstra state
//! - [`LinkTableConfig`]: Stale timeout, route metric ceiling, refresh cadence
//!
//! ## Maintenance
//!
//! The table never runs timers itself. The embedding node is expected to
//! call [`LinkTable::clear_stale`] and then [`LinkTable::dijkstra`] in both
//! directions every [`LinkTableConfig::refresh_interval`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use meshroute_core::NodeAddress;
//! use meshroute_linktable::{Direction, LinkTable};
//!
//! let mut table = LinkTable::new(me);
//! table.update_link(NodeAddress::new(me, 1), NodeAddress::new(peer, 1), seq, 0, 100);
//! table.dijkstra(Direction::FromMe);
//!
//! let route = table.best_route(peer, Direction::FromMe);
//! if table.valid_route(&route) {
//!     // stamp the route into a packet
//! }
//! ```

pub mod config;
pub mod dijkstra;
pub mod dump;
pub mod host;
pub mod link;
pub mod route;
pub mod table;

// Re-export main types
pub use config::LinkTableConfig;
pub use dijkstra::wcett_cost;
pub use host::{DijkstraState, Direction, HostInfo};
pub use link::LinkInfo;
pub use table::LinkTable;
