//! Core trait definitions
//!
//! - [`Clock`]: Time abstraction for testability
//! - [`LinkMetrics`]: Read access to directed link records

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::address::NodeAddress;

/// Abstraction over time for testability
///
/// Everything that ages (link records, resolution entries, poll
/// rate limits) reads time through this trait.
pub trait Clock: Send + Sync {
    /// Get the current instant (monotonic time)
    fn now(&self) -> Instant;
}

/// Real clock implementation using system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to
///
/// Clones share the same underlying time, so a test can hand one clone to
/// a table and advance another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Read access to directed link records
///
/// Every method returns 0 for an unknown or unusable link.
pub trait LinkMetrics {
    /// Metric of the link `from -> to`
    fn link_metric(&self, from: NodeAddress, to: NodeAddress) -> u32;

    /// Sequence number of the link `from -> to`
    fn link_seq(&self, from: NodeAddress, to: NodeAddress) -> u32;

    /// Age in seconds of the link `from -> to`
    fn link_age(&self, from: NodeAddress, to: NodeAddress) -> u32;
}
