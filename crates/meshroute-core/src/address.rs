//! Endpoint and hop addressing for multi-radio nodes
//!
//! A node is identified on the wire by its IPv4 address, but each of its
//! radios has its own interface id. Interface ids in
//! [`DEFAULT_IFACE_MIN`]..=[`DEFAULT_IFACE_MAX`] mark a node's "default"
//! interface, the one used when any representative address will do.
//! The radio channel of an interface is its id modulo 256.

use std::fmt::{self, Display};
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// Lowest interface id in the default-interface range
pub const DEFAULT_IFACE_MIN: u16 = 256;
/// Highest interface id in the default-interface range
pub const DEFAULT_IFACE_MAX: u16 = 511;

/// Check whether an interface id lies in the default-interface range
pub fn is_default_iface(iface: u16) -> bool {
    (DEFAULT_IFACE_MIN..=DEFAULT_IFACE_MAX).contains(&iface)
}

/// Radio channel used by an interface
pub fn channel_of(iface: u16) -> u16 {
    iface % 256
}

/// An (IP address, interface id) endpoint
///
/// The null address has IP `0.0.0.0`; it stands for "no node" and is
/// rejected by every table operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    pub ip: Ipv4Addr,
    pub iface: u16,
}

impl NodeAddress {
    /// Create a new node address
    pub const fn new(ip: Ipv4Addr, iface: u16) -> Self {
        Self { ip, iface }
    }

    /// The null address (`0.0.0.0`, interface 0)
    pub const fn null() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            iface: 0,
        }
    }

    /// True if the IP is `0.0.0.0`, regardless of interface
    pub fn is_null(&self) -> bool {
        self.ip.is_unspecified()
    }

    /// Radio channel of this endpoint's interface
    pub fn channel(&self) -> u16 {
        channel_of(self.iface)
    }

    /// Same node, different interface
    pub fn with_iface(&self, iface: u16) -> Self {
        Self { ip: self.ip, iface }
    }
}

impl Default for NodeAddress {
    fn default() -> Self {
        Self::null()
    }
}

impl Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.ip, self.iface)
    }
}

impl FromStr for NodeAddress {
    type Err = AddressError;

    /// Parse `"ip,iface"` or a bare `"ip"` (interface 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (ip, iface) = match s.split_once(',') {
            Some((ip, iface)) => {
                let iface = iface
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| AddressError::InvalidNode(s.to_string()))?;
                (ip.trim(), iface)
            }
            None => (s, 0),
        };
        let ip = ip
            .parse::<Ipv4Addr>()
            .map_err(|_| AddressError::InvalidNode(s.to_string()))?;
        Ok(Self::new(ip, iface))
    }
}

/// One hop's radio usage along a path
///
/// A packet enters the node through `arr_iface` and, unless this is the
/// final hop, leaves through `dep_iface`. An interface of 0 means "none":
/// the first airport of a path has no arrival, the last has no departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAirport {
    pub ip: Ipv4Addr,
    pub arr_iface: u16,
    pub dep_iface: u16,
}

impl NodeAirport {
    /// Create a new airport
    pub const fn new(ip: Ipv4Addr, arr_iface: u16, dep_iface: u16) -> Self {
        Self {
            ip,
            arr_iface,
            dep_iface,
        }
    }

    /// Airport entered through `node`'s interface, with no departure
    pub fn arriving_at(node: NodeAddress) -> Self {
        Self::new(node.ip, node.iface, 0)
    }

    /// Airport left through `node`'s interface, with no arrival
    pub fn departing_from(node: NodeAddress) -> Self {
        Self::new(node.ip, 0, node.iface)
    }

    /// The endpoint a packet arrives on
    pub fn arrival(&self) -> NodeAddress {
        NodeAddress::new(self.ip, self.arr_iface)
    }

    /// The endpoint a packet departs from
    pub fn departure(&self) -> NodeAddress {
        NodeAddress::new(self.ip, self.dep_iface)
    }
}

impl Default for NodeAirport {
    fn default() -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED, 0, 0)
    }
}

impl Display for NodeAirport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.ip, self.arr_iface, self.dep_iface)
    }
}

/// A directed link between two endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodePair {
    pub from: NodeAddress,
    pub to: NodeAddress,
}

impl NodePair {
    /// Create a new directed pair
    pub const fn new(from: NodeAddress, to: NodeAddress) -> Self {
        Self { from, to }
    }

    /// True if either endpoint equals `node`
    pub fn contains(&self, node: &NodeAddress) -> bool {
        self.from == *node || self.to == *node
    }

    /// The same link in the opposite direction
    pub fn reversed(&self) -> Self {
        Self::new(self.to, self.from)
    }
}

/// A 48-bit link-layer address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EtherAddress(pub [u8; 6]);

impl EtherAddress {
    /// The broadcast address `ff:ff:ff:ff:ff:ff`
    pub const BROADCAST: Self = Self([0xff; 6]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// The broadcast address
    pub const fn broadcast() -> Self {
        Self::BROADCAST
    }

    /// True for `ff:ff:ff:ff:ff:ff`
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }

    /// True for any group (multicast or broadcast) address
    pub fn is_group(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// The raw bytes
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl Default for EtherAddress {
    fn default() -> Self {
        Self::BROADCAST
    }
}

impl Display for EtherAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for EtherAddress {
    type Err = AddressError;

    /// Parse colon- or dash-separated hex octets
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut count = 0;
        for part in s.trim().split([':', '-']) {
            if count == 6 || part.is_empty() || part.len() > 2 {
                return Err(AddressError::InvalidEther(s.to_string()));
            }
            bytes[count] = u8::from_str_radix(part, 16)
                .map_err(|_| AddressError::InvalidEther(s.to_string()))?;
            count += 1;
        }
        if count != 6 {
            return Err(AddressError::InvalidEther(s.to_string()));
        }
        Ok(Self(bytes))
    }
}
