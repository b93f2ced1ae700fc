//! Per-host records and Dijkstra state

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use meshroute_core::{NodeAddress, is_default_iface};

/// Which way a shortest-path computation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Routes from the local node to every other host
    FromMe,
    /// Routes from every other host to the local node
    ToMe,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::FromMe, Direction::ToMe];
}

/// Result of one Dijkstra pass for a single host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DijkstraState {
    /// Best adjusted metric, 0 when unreached (and for the root)
    pub metric: u32,
    /// Endpoint on the previous hop
    pub prev: NodeAddress,
    /// This host's interface used by the best route
    pub iface: u16,
    /// Accumulated link metric per radio channel along the best route
    pub channels: BTreeMap<u16, u32>,
    /// Whether the host has been settled
    pub marked: bool,
}

impl DijkstraState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Everything known about one node
#[derive(Debug, Clone)]
pub struct HostInfo {
    ip: Ipv4Addr,
    interfaces: Vec<u16>,
    if_def: u16,
    from_me: DijkstraState,
    to_me: DijkstraState,
}

impl HostInfo {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            interfaces: Vec::new(),
            if_def: 0,
            from_me: DijkstraState::default(),
            to_me: DijkstraState::default(),
        }
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    /// Known interfaces, in the order they were first seen
    pub fn interfaces(&self) -> &[u16] {
        &self.interfaces
    }

    /// Default interface, 0 if none has been seen
    pub fn if_def(&self) -> u16 {
        self.if_def
    }

    pub fn state(&self, dir: Direction) -> &DijkstraState {
        match dir {
            Direction::FromMe => &self.from_me,
            Direction::ToMe => &self.to_me,
        }
    }

    pub(crate) fn state_mut(&mut self, dir: Direction) -> &mut DijkstraState {
        match dir {
            Direction::FromMe => &mut self.from_me,
            Direction::ToMe => &mut self.to_me,
        }
    }

    /// Record an interface; 0 and duplicates are ignored
    pub(crate) fn new_interface(&mut self, iface: u16) {
        if iface == 0 || self.interfaces.contains(&iface) {
            return;
        }
        if is_default_iface(iface) {
            self.if_def = iface;
        }
        self.interfaces.push(iface);
    }

    /// Replace `old` by `new` in the interface set
    pub(crate) fn update_interface(&mut self, old: u16, new: u16) {
        let before = self.interfaces.len();
        self.interfaces.retain(|&i| i != old);
        if self.interfaces.len() != before {
            if self.if_def == old {
                self.if_def = 0;
            }
            self.new_interface(new);
        }
    }

    pub fn address(&self, iface: u16) -> NodeAddress {
        NodeAddress::new(self.ip, iface)
    }
}
