//! Inbound header validation

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use meshroute_core::{ConfigError, EtherAddress, ProtocolError, from_toml_str};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::checksum::verify_checksum;
use crate::error::{WireError, WireResult};
use crate::header::{HEADER_LEN, HeaderFields, VERSION};

/// Configuration for a [`HeaderChecker`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckHeaderConfig {
    /// Verify the checksum of every packet
    /// Default: false
    pub checksum: bool,
}

impl CheckHeaderConfig {
    /// Parse a config from TOML
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        from_toml_str(input)
    }
}

/// Validates received packets before they reach routing logic
///
/// Every rejection bumps the drop counter. Senders speaking another
/// protocol version are remembered by link-layer source address.
#[derive(Debug, Default)]
pub struct HeaderChecker {
    config: CheckHeaderConfig,
    drops: AtomicU64,
    bad_versions: DashMap<EtherAddress, u8>,
}

impl HeaderChecker {
    pub fn new(config: CheckHeaderConfig) -> Self {
        Self {
            config,
            drops: AtomicU64::new(0),
            bad_versions: DashMap::new(),
        }
    }

    pub fn config(&self) -> &CheckHeaderConfig {
        &self.config
    }

    /// Packets rejected so far
    pub fn drops(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }

    /// Accept or reject a packet received from `src`
    ///
    /// Checks run in order: minimum length, checksum (if enabled),
    /// version, declared length, next-hop index.
    pub fn check(&self, src: EtherAddress, buf: &[u8]) -> WireResult<()> {
        self.validate(src, buf).inspect_err(|err| self.record_drop(src, err))
    }

    fn validate(&self, src: EtherAddress, buf: &[u8]) -> WireResult<()> {
        if buf.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                needed: HEADER_LEN,
                actual: buf.len(),
            }
            .into());
        }
        if self.config.checksum {
            verify_checksum(buf)?;
        }
        let header = HeaderFields::parse(buf)?;
        if header.version != VERSION {
            self.bad_versions.insert(src, header.version);
            warn!(src = %src, version = header.version, "Unknown protocol version");
            return Err(ProtocolError::VersionMismatch {
                expected: VERSION,
                actual: header.version,
            }
            .into());
        }
        let tlen = header.checked_len();
        if tlen > buf.len() {
            return Err(ProtocolError::Truncated {
                needed: tlen,
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
        Ok(())
    }

    fn record_drop(&self, src: EtherAddress, err: &WireError) {
        if self.drops.fetch_add(1, Ordering::Relaxed) == 0 {
            info!(src = %src, "First packet dropped by header check");
        }
        debug!(src = %src, error = %err, "Dropped packet");
    }

    /// Senders seen with a foreign version, sorted by address
    pub fn bad_versions(&self) -> Vec<(EtherAddress, u8)> {
        let mut bad: Vec<_> = self
            .bad_versions
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect();
        bad.sort();
        bad
    }

    /// One `eth <addr> version <n>` line per foreign sender
    pub fn dump_bad_versions(&self) -> String {
        self.bad_versions()
            .into_iter()
            .map(|(eth, version)| format!("eth {eth} version {version}\n"))
            .collect()
    }
}
