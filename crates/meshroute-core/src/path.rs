//! Multi-radio source routes

use std::net::Ipv4Addr;

use crate::address::NodeAirport;

/// A source route: the airports a packet visits, in order
///
/// The first airport has no arrival interface and the last has no
/// departure interface.
pub type Path = Vec<NodeAirport>;

/// Reverse a path, swapping each airport's arrival and departure
pub fn reverse_path(path: &[NodeAirport]) -> Path {
    path.iter()
        .rev()
        .map(|a| NodeAirport::new(a.ip, a.dep_iface, a.arr_iface))
        .collect()
}

/// Position of `ip` within a path, if present
pub fn index_of(path: &[NodeAirport], ip: Ipv4Addr) -> Option<usize> {
    path.iter().position(|a| a.ip == ip)
}

/// Render a path as space-separated `ip,arr,dep` triples
pub fn path_to_string(path: &[NodeAirport]) -> String {
    path.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
