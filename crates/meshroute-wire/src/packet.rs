//! Route-carrying packets and their link records

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use meshroute_core::{LinkMetrics, NodeAddress, NodeAirport, Path, ProtocolError};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::checksum::set_checksum;
use crate::error::WireResult;
use crate::header::{FIXED_LEN, HEADER_LEN, HeaderFields, MAX_LINKS, VERSION, len_with_data, len_wo_data};

/// One hop of a source route as stamped into a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HopRecord {
    /// Departure endpoint
    pub from: NodeAddress,
    /// Arrival endpoint
    pub to: NodeAddress,
    /// Metric of `from -> to`
    pub fwd: u32,
    /// Metric of the reverse hop
    pub rev: u32,
    pub seq: u32,
    pub age: u32,
}

impl HopRecord {
    /// A hop with no metrics attached
    pub fn new(from: NodeAddress, to: NodeAddress) -> Self {
        Self {
            from,
            to,
            fwd: 0,
            rev: 0,
            seq: 0,
            age: 0,
        }
    }

    /// One record per hop of `path`, with metrics from `metrics`
    ///
    /// The reverse metric is looked up between the next airport's
    /// departure and this airport's arrival.
    pub fn from_path<M: LinkMetrics + ?Sized>(
        path: &[NodeAirport],
        metrics: &M,
    ) -> WireResult<Vec<HopRecord>> {
        if path.len() < 2 {
            return Err(ProtocolError::PathTooShort(path.len()).into());
        }
        let hops = path.len() - 1;
        if hops > MAX_LINKS {
            return Err(ProtocolError::TooManyLinks(hops).into());
        }
        Ok(path
            .windows(2)
            .map(|w| {
                let (a, b) = (w[0].departure(), w[1].arrival());
                HopRecord {
                    from: a,
                    to: b,
                    fwd: metrics.link_metric(a, b),
                    rev: metrics.link_metric(w[1].departure(), w[0].arrival()),
                    seq: metrics.link_seq(a, b),
                    age: metrics.link_age(a, b),
                }
            })
            .collect())
    }
}

/// A decoded source-routed packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePacket {
    pub packet_type: u8,
    /// Index of the hop currently being traversed
    pub next: u8,
    pub ttl: u16,
    pub flags: u16,
    /// Query destination
    pub qdst: Ipv4Addr,
    pub seq: u32,
    pub hops: Vec<HopRecord>,
    pub payload: Bytes,
}

impl RoutePacket {
    /// Create an empty packet of the given type
    pub fn new(packet_type: u8) -> Self {
        Self {
            packet_type,
            next: 0,
            ttl: 0,
            flags: 0,
            qdst: Ipv4Addr::UNSPECIFIED,
            seq: 0,
            hops: Vec::new(),
            payload: Bytes::new(),
        }
    }

    pub fn with_hops(mut self, hops: Vec<HopRecord>) -> Self {
        self.hops = hops;
        self
    }

    pub fn with_next(mut self, next: u8) -> Self {
        self.next = next;
        self
    }

    pub fn with_ttl(mut self, ttl: u16) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_flag(mut self, flag: u16) -> Self {
        self.set_flag(flag);
        self
    }

    pub fn with_qdst(mut self, qdst: Ipv4Addr) -> Self {
        self.qdst = qdst;
        self
    }

    pub fn with_seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u16) {
        self.flags |= flag;
    }

    pub fn unset_flag(&mut self, flag: u16) {
        self.flags &= !flag;
    }

    /// Bytes before the payload
    pub fn header_len(&self) -> usize {
        len_wo_data(self.hops.len())
    }

    /// Encoded length
    pub fn len(&self) -> usize {
        len_with_data(self.hops.len(), self.payload.len())
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty() && self.payload.is_empty()
    }

    /// The hop being traversed, if `next` is in range
    pub fn next_hop(&self) -> Option<&HopRecord> {
        self.hops.get(self.next as usize)
    }

    /// True when the current hop ends at the final destination
    pub fn is_last_hop(&self) -> bool {
        self.next as usize + 1 == self.hops.len()
    }

    /// Move on to the following hop
    pub fn advance(&mut self) {
        self.next = self.next.saturating_add(1);
    }

    /// Rebuild the airport sequence from the hop records
    ///
    /// The first airport has no arrival interface and the last no
    /// departure interface.
    pub fn path(&self) -> Path {
        let (Some(first), Some(last)) = (self.hops.first(), self.hops.last()) else {
            return Vec::new();
        };
        let mut path = Vec::with_capacity(self.hops.len() + 1);
        path.push(NodeAirport::new(first.from.ip, 0, first.from.iface));
        for w in self.hops.windows(2) {
            path.push(NodeAirport::new(w[1].from.ip, w[0].to.iface, w[1].from.iface));
        }
        path.push(NodeAirport::new(last.to.ip, last.to.iface, 0));
        path
    }

    /// Serialize with version and checksum stamped
    pub fn encode(&self) -> WireResult<Bytes> {
        let nlinks = self.hops.len();
        if nlinks > MAX_LINKS {
            return Err(ProtocolError::TooManyLinks(nlinks).into());
        }
        let dlen = u16::try_from(self.payload.len())
            .map_err(|_| ProtocolError::DataTooLong(self.payload.len()))?;
        if self.next as usize > nlinks {
            return Err(ProtocolError::BadNextHop {
                next: self.next,
                links: nlinks as u8,
            }
            .into());
        }
        // consecutive hops share the IP word between them
        for (i, w) in self.hops.windows(2).enumerate() {
            if w[0].to.ip != w[1].from.ip {
                return Err(ProtocolError::DisjointHops(i + 1).into());
            }
        }

        let mut buf = BytesMut::with_capacity(self.len());
        buf.put_u8(VERSION);
        buf.put_u8(self.packet_type);
        buf.put_u8(nlinks as u8);
        buf.put_u8(self.next);
        buf.put_u16(self.ttl);
        buf.put_u16(0);
        buf.put_u16(self.flags);
        buf.put_u16(dlen);
        buf.put_u32(self.qdst.into());
        buf.put_u32(self.seq);

        match self.hops.last() {
            None => buf.put_bytes(0, 8),
            Some(last) => {
                for hop in &self.hops {
                    buf.put_u32(hop.from.ip.into());
                    buf.put_u32(hop.from.iface.into());
                    buf.put_u32(hop.fwd);
                    buf.put_u32(hop.rev);
                    buf.put_u32(hop.seq);
                    buf.put_u32(hop.age);
                    buf.put_u32(hop.to.iface.into());
                }
                buf.put_u32(last.to.ip.into());
            }
        }
        buf.put_slice(&self.payload);

        set_checksum(&mut buf)?;
        trace!(
            packet_type = self.packet_type,
            links = nlinks,
            len = buf.len(),
            "Encoded route packet"
        );
        Ok(buf.freeze())
    }

    /// Parse a packet
    ///
    /// The version must match and the buffer must hold every link record
    /// plus `dlen` bytes of data. The checksum is not verified here.
    pub fn decode(buf: &[u8]) -> WireResult<Self> {
        let header = HeaderFields::parse(buf)?;
        if header.version != VERSION {
            return Err(ProtocolError::VersionMismatch {
                expected: VERSION,
                actual: header.version,
            }
            .into());
        }
        let total = header.total_len();
        if buf.len() < total {
            return Err(ProtocolError::Truncated {
                needed: total,
                actual: buf.len(),
            }
            .into());
        }
        if header.next > header.nlinks {
            return Err(ProtocolError::BadNextHop {
                next: header.next,
                links: header.nlinks,
            }
            .into());
        }

        let hlen = header.header_len();
        let mut cur = &buf[HEADER_LEN..hlen];
        let qdst = Ipv4Addr::from(cur.get_u32());
        let seq = cur.get_u32();

        let nlinks = header.nlinks as usize;
        let mut hops = Vec::with_capacity(nlinks);
        if nlinks > 0 {
            debug_assert_eq!(cur.remaining(), hlen - FIXED_LEN);
            let mut from_ip = Ipv4Addr::from(cur.get_u32());
            for hop in 0..nlinks {
                let from_iface = iface_word(&mut cur, hop)?;
                let fwd = cur.get_u32();
                let rev = cur.get_u32();
                let seq = cur.get_u32();
                let age = cur.get_u32();
                let to_iface = iface_word(&mut cur, hop)?;
                let to_ip = Ipv4Addr::from(cur.get_u32());
                hops.push(HopRecord {
                    from: NodeAddress::new(from_ip, from_iface),
                    to: NodeAddress::new(to_ip, to_iface),
                    fwd,
                    rev,
                    seq,
                    age,
                });
                from_ip = to_ip;
            }
        }

        Ok(Self {
            packet_type: header.packet_type,
            next: header.next,
            ttl: header.ttl,
            flags: header.flags,
            qdst,
            seq,
            hops,
            payload: Bytes::copy_from_slice(&buf[hlen..total]),
        })
    }
}

/// Read a 32-bit interface word, rejecting values outside `u16`
fn iface_word(cur: &mut &[u8], hop: usize) -> WireResult<u16> {
    let value = cur.get_u32();
    u16::try_from(value).map_err(|_| ProtocolError::BadInterface { hop, value }.into())
}
