//! Fixed header layout and constants
//!
//! ```text
//!  0        1        2        3
//! +--------+--------+--------+--------+
//! | version|  type  | nlinks |  next  |
//! +--------+--------+--------+--------+
//! |       ttl       |    checksum     |
//! +-----------------+-----------------+
//! |      flags      |   data length   |
//! +-----------------+-----------------+
//! |         query destination         |
//! +-----------------------------------+
//! |             sequence              |
//! +-----------------------------------+
//! |     link records (28 bytes each)  |
//! ```
//!
//! All fields are big-endian.

use bytes::Buf;
use meshroute_core::ProtocolError;

use crate::error::WireResult;

/// Protocol version carried in the first byte
pub const VERSION: u8 = 0x1c;

/// Length of the fixed header up to and including the data length field
pub const HEADER_LEN: usize = 12;

/// Header plus query destination and sequence
pub const FIXED_LEN: usize = 20;

/// Stride between consecutive link records
pub const LINK_LEN: usize = 28;

/// Most links one packet can carry
pub const MAX_LINKS: usize = u8::MAX as usize;

/// Byte offset of the checksum field
pub const CHECKSUM_OFFSET: usize = 6;

/// Packet type codes
pub mod packet_type {
    pub const QUERY: u8 = 0x01;
    pub const REPLY: u8 = 0x02;
    pub const DATA: u8 = 0x04;
    pub const GATEWAY: u8 = 0x08;
    pub const PROBE: u8 = 0x16;
    pub const CHANNEL_BEACON: u8 = 0x32;
    pub const CHANNEL_SCAN_INFO: u8 = 0x33;
    pub const CHANNEL_ASSIGN: u8 = 0x34;
    pub const CHANNEL_WARN: u8 = 0x35;
}

/// Header flag bits
pub mod flags {
    pub const ERROR: u16 = 1 << 0;
    pub const UPDATE: u16 = 1 << 1;
}

/// Whether a type's data region counts toward length and checksum
///
/// Matched bitwise against every data-carrying code, so codes sharing bits
/// with them (queries included) also qualify.
pub fn carries_data(ty: u8) -> bool {
    use packet_type::*;
    ty & (DATA | CHANNEL_SCAN_INFO | CHANNEL_ASSIGN | CHANNEL_WARN) != 0
}

/// Bytes before the data region for a packet with `nlinks` links
pub const fn len_wo_data(nlinks: usize) -> usize {
    if nlinks == 0 {
        FIXED_LEN + 8
    } else {
        FIXED_LEN + 4 + nlinks * LINK_LEN
    }
}

/// Total packet length including `dlen` bytes of data
pub const fn len_with_data(nlinks: usize, dlen: usize) -> usize {
    len_wo_data(nlinks) + dlen
}

/// The twelve fixed header bytes, decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFields {
    pub version: u8,
    pub packet_type: u8,
    pub nlinks: u8,
    pub next: u8,
    pub ttl: u16,
    pub checksum: u16,
    pub flags: u16,
    pub dlen: u16,
}

impl HeaderFields {
    /// Read the fixed header; only the length is checked
    pub fn parse(buf: &[u8]) -> WireResult<Self> {
        if buf.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                needed: HEADER_LEN,
                actual: buf.len(),
            }
            .into());
        }
        let mut cur = &buf[..HEADER_LEN];
        Ok(Self {
            version: cur.get_u8(),
            packet_type: cur.get_u8(),
            nlinks: cur.get_u8(),
            next: cur.get_u8(),
            ttl: cur.get_u16(),
            checksum: cur.get_u16(),
            flags: cur.get_u16(),
            dlen: cur.get_u16(),
        })
    }

    /// Bytes before the data region
    pub fn header_len(&self) -> usize {
        len_wo_data(self.nlinks as usize)
    }

    /// Header plus data region
    pub fn total_len(&self) -> usize {
        len_with_data(self.nlinks as usize, self.dlen as usize)
    }

    /// Bytes covered by the checksum and the size check
    pub fn checked_len(&self) -> usize {
        if carries_data(self.packet_type) {
            self.total_len()
        } else {
            self.header_len()
        }
    }
}

/// The bytes following the header and link records
pub fn strip_header(buf: &[u8]) -> WireResult<&[u8]> {
    let header = HeaderFields::parse(buf)?;
    let hlen = header.header_len();
    buf.get(hlen..).ok_or_else(|| {
        ProtocolError::Truncated {
            needed: hlen,
            actual: buf.len(),
        }
        .into()
    })
}
