//! Internet checksum over the header, link records and (for data-carrying
//! types) the data region

use meshroute_core::ProtocolError;

use crate::error::WireResult;
use crate::header::{CHECKSUM_OFFSET, HeaderFields, VERSION};

/// 16-bit one's complement of the one's complement sum
///
/// An odd trailing byte is padded with zero.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;

    for chunk in data.chunks_exact(2) {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }
    if let Some(&last) = data.chunks_exact(2).remainder().first() {
        sum += (last as u32) << 8;
    }

    while (sum >> 16) > 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !sum as u16
}

fn checked_region(buf: &[u8]) -> WireResult<usize> {
    let header = HeaderFields::parse(buf)?;
    let tlen = header.checked_len();
    if tlen > buf.len() {
        return Err(ProtocolError::Truncated {
            needed: tlen,
            actual: buf.len(),
        }
        .into());
    }
    Ok(tlen)
}

/// Restamp the version and recompute the checksum in place
pub fn set_checksum(buf: &mut [u8]) -> WireResult<()> {
    let tlen = checked_region(buf)?;
    buf[0] = VERSION;
    buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].fill(0);
    let sum = internet_checksum(&buf[..tlen]);
    buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&sum.to_be_bytes());
    Ok(())
}

/// Check the stored checksum; the region must sum to zero
pub fn verify_checksum(buf: &[u8]) -> WireResult<()> {
    let tlen = checked_region(buf)?;
    if internet_checksum(&buf[..tlen]) != 0 {
        return Err(ProtocolError::BadChecksum.into());
    }
    Ok(())
}
