//! Directed link records

use std::time::Instant;

use meshroute_core::NodeAddress;

/// State of one directed link between two endpoints
///
/// A metric of 0 marks the link unusable. Updates carrying a sequence
/// number at or below the stored one are ignored.
#[derive(Debug, Clone)]
pub struct LinkInfo {
    from: NodeAddress,
    to: NodeAddress,
    metric: u32,
    seq: u32,
    age: u32,
    last_updated: Instant,
    rate: u32,
    probe: u32,
    retries: u32,
}

impl LinkInfo {
    /// Create a link record refreshed at `now`
    pub fn new(
        from: NodeAddress,
        to: NodeAddress,
        seq: u32,
        age: u32,
        metric: u32,
        now: Instant,
    ) -> Self {
        Self {
            from,
            to,
            metric,
            seq,
            age,
            last_updated: now,
            rate: 0,
            probe: 0,
            retries: 0,
        }
    }

    /// Apply a newer observation
    ///
    /// Returns false and leaves the record untouched if `seq` is not newer.
    pub fn update(&mut self, seq: u32, age: u32, metric: u32, now: Instant) -> bool {
        if seq <= self.seq {
            return false;
        }
        self.metric = metric;
        self.seq = seq;
        self.age = age;
        self.last_updated = now;
        true
    }

    /// Reported age plus whole seconds elapsed since the last refresh
    pub fn age(&self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.last_updated).as_secs();
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.age.saturating_add(elapsed)
    }

    pub fn from(&self) -> NodeAddress {
        self.from
    }

    pub fn to(&self) -> NodeAddress {
        self.to
    }

    pub fn metric(&self) -> u32 {
        self.metric
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn probe(&self) -> u32 {
        self.probe
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub(crate) fn set_rate(&mut self, rate: u32) {
        self.rate = rate;
    }

    pub(crate) fn set_probe(&mut self, probe: u32) {
        self.probe = probe;
    }

    pub(crate) fn set_retries(&mut self, retries: u32) {
        self.retries = retries;
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use super::*;

    fn node(last: u8, iface: u16) -> NodeAddress {
        NodeAddress::new(Ipv4Addr::new(10, 0, 0, last), iface)
    }

    #[test]
    fn test_update_requires_newer_seq() {
        let now = Instant::now();
        let mut link = LinkInfo::new(node(1, 1), node(2, 1), 5, 0, 100, now);

        assert!(!link.update(5, 0, 50, now));
        assert!(!link.update(4, 0, 50, now));
        assert_eq!(link.metric(), 100);
        assert_eq!(link.seq(), 5);

        assert!(link.update(6, 3, 50, now));
        assert_eq!(link.metric(), 50);
        assert_eq!(link.seq(), 6);
    }

    #[test]
    fn test_age_advances_with_time() {
        let now = Instant::now();
        let link = LinkInfo::new(node(1, 1), node(2, 1), 1, 10, 100, now);
        assert_eq!(link.age(now), 10);
        assert_eq!(link.age(now + Duration::from_millis(2500)), 12);
        assert_eq!(link.age(now + Duration::from_secs(30)), 40);
    }

    #[test]
    fn test_update_resets_age_baseline() {
        let start = Instant::now();
        let mut link = LinkInfo::new(node(1, 1), node(2, 1), 1, 0, 100, start);
        let later = start + Duration::from_secs(20);
        assert_eq!(link.age(later), 20);

        link.update(2, 1, 100, later);
        assert_eq!(link.age(later), 1);
    }
}
