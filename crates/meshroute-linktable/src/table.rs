//! The link-state table
//!
//! [`LinkTable`] stores one [`HostInfo`] per known node and one
//! [`LinkInfo`] per directed (endpoint, endpoint) pair. Records are created
//! lazily by [`LinkTable::update_link`] and removed only by staleness,
//! interface changes or a full clear.
//!
//! Every lookup rejects null endpoints and endpoints on a blacklisted IP by
//! reporting 0; setters silently ignore them.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::mem;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use meshroute_core::{Clock, LinkMetrics, NodeAddress, NodePair, SystemClock};
use rand::seq::IteratorRandom;
use tracing::{debug, trace};

use crate::config::LinkTableConfig;
use crate::host::{Direction, HostInfo};
use crate::link::LinkInfo;

/// Multi-radio link-state database for a single node
pub struct LinkTable {
    /// IP of the local node, the root of every Dijkstra pass
    pub(crate) ip: Ipv4Addr,
    pub(crate) config: LinkTableConfig,
    pub(crate) clock: Arc<dyn Clock>,
    /// Hosts keyed by IP, ordered so passes and dumps are deterministic
    pub(crate) hosts: BTreeMap<Ipv4Addr, HostInfo>,
    pub(crate) links: HashMap<NodePair, LinkInfo>,
    pub(crate) blacklist: HashSet<Ipv4Addr>,
    pub(crate) dijkstra_time: Duration,
}

impl LinkTable {
    /// Create an empty table for the node at `ip`
    pub fn new(ip: Ipv4Addr) -> Self {
        Self::with_config(ip, LinkTableConfig::default(), Arc::new(SystemClock))
    }

    /// Create an empty table with explicit configuration and clock
    pub fn with_config(ip: Ipv4Addr, config: LinkTableConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            ip,
            config,
            clock,
            hosts: BTreeMap::new(),
            links: HashMap::new(),
            blacklist: HashSet::new(),
            dijkstra_time: Duration::ZERO,
        }
    }

    /// IP of the local node
    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn config(&self) -> &LinkTableConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Record an observation of the link `from -> to`
    ///
    /// Returns false if either endpoint is null or the metric is 0. An
    /// observation older than the stale timeout is accepted (true) but
    /// not stored.
    pub fn update_link(
        &mut self,
        from: NodeAddress,
        to: NodeAddress,
        seq: u32,
        age: u32,
        metric: u32,
    ) -> bool {
        if from.is_null() || to.is_null() || metric == 0 {
            return false;
        }
        if u64::from(age) > self.config.stale_timeout.as_secs() {
            trace!(from = %from, to = %to, age, "Ignoring stale link observation");
            return true;
        }

        self.hosts
            .entry(from.ip)
            .or_insert_with(|| HostInfo::new(from.ip))
            .new_interface(from.iface);
        self.hosts
            .entry(to.ip)
            .or_insert_with(|| HostInfo::new(to.ip))
            .new_interface(to.iface);

        let now = self.now();
        let pair = NodePair::new(from, to);
        match self.links.get_mut(&pair) {
            Some(link) => {
                if !link.update(seq, age, metric, now) {
                    trace!(from = %from, to = %to, seq, current = link.seq(), "Ignoring old sequence");
                }
            }
            None => {
                trace!(from = %from, to = %to, seq, metric, "New link");
                self.links
                    .insert(pair, LinkInfo::new(from, to, seq, age, metric, now));
            }
        }
        true
    }

    /// Record `a -> b` and, only if that was accepted, `b -> a`
    pub fn update_both_links(
        &mut self,
        a: NodeAddress,
        b: NodeAddress,
        seq: u32,
        age: u32,
        metric: u32,
    ) -> bool {
        if !self.update_link(a, b, seq, age, metric) {
            return false;
        }
        self.update_link(b, a, seq, age, metric)
    }

    fn blacklisted(&self, from: NodeAddress, to: NodeAddress) -> bool {
        self.blacklist.contains(&from.ip) || self.blacklist.contains(&to.ip)
    }

    fn link(&self, from: NodeAddress, to: NodeAddress) -> Option<&LinkInfo> {
        if from.is_null() || to.is_null() || self.blacklisted(from, to) {
            return None;
        }
        self.links.get(&NodePair::new(from, to))
    }

    fn link_mut(&mut self, from: NodeAddress, to: NodeAddress) -> Option<&mut LinkInfo> {
        if from.is_null() || to.is_null() || self.blacklisted(from, to) {
            return None;
        }
        self.links.get_mut(&NodePair::new(from, to))
    }

    pub fn get_link_metric(&self, from: NodeAddress, to: NodeAddress) -> u32 {
        self.link(from, to).map_or(0, LinkInfo::metric)
    }

    pub fn get_link_seq(&self, from: NodeAddress, to: NodeAddress) -> u32 {
        self.link(from, to).map_or(0, LinkInfo::seq)
    }

    pub fn get_link_age(&self, from: NodeAddress, to: NodeAddress) -> u32 {
        let now = self.now();
        self.link(from, to).map_or(0, |l| l.age(now))
    }

    pub fn get_link_rate(&self, from: NodeAddress, to: NodeAddress) -> u32 {
        self.link(from, to).map_or(0, LinkInfo::rate)
    }

    pub fn get_link_probe(&self, from: NodeAddress, to: NodeAddress) -> u32 {
        self.link(from, to).map_or(0, LinkInfo::probe)
    }

    pub fn get_link_retries(&self, from: NodeAddress, to: NodeAddress) -> u32 {
        self.link(from, to).map_or(0, LinkInfo::retries)
    }

    /// Record the observed PHY rate of a link; 0 is ignored
    pub fn set_link_rate(&mut self, from: NodeAddress, to: NodeAddress, rate: u32) {
        if rate == 0 {
            return;
        }
        if let Some(link) = self.link_mut(from, to) {
            link.set_rate(rate);
        }
    }

    /// Record the probe size used on a link; 0 is ignored
    pub fn set_link_probe(&mut self, from: NodeAddress, to: NodeAddress, probe: u32) {
        if probe == 0 {
            return;
        }
        if let Some(link) = self.link_mut(from, to) {
            link.set_probe(probe);
        }
    }

    /// Record the retry count seen on a link; 0 is ignored
    pub fn set_link_retries(&mut self, from: NodeAddress, to: NodeAddress, retries: u32) {
        if retries == 0 {
            return;
        }
        if let Some(link) = self.link_mut(from, to) {
            link.set_retries(retries);
        }
    }

    /// Default interface of a host, 0 if unknown, unset or blacklisted
    pub fn get_if_def(&self, ip: Ipv4Addr) -> u16 {
        if ip.is_unspecified() || self.blacklist.contains(&ip) {
            return 0;
        }
        self.hosts.get(&ip).map_or(0, HostInfo::if_def)
    }

    pub fn get_host_metric_from_me(&self, ip: Ipv4Addr) -> u32 {
        self.host_metric(ip, Direction::FromMe)
    }

    pub fn get_host_metric_to_me(&self, ip: Ipv4Addr) -> u32 {
        self.host_metric(ip, Direction::ToMe)
    }

    fn host_metric(&self, ip: Ipv4Addr, dir: Direction) -> u32 {
        if ip.is_unspecified() {
            return 0;
        }
        self.hosts.get(&ip).map_or(0, |h| h.state(dir).metric)
    }

    /// All known host IPs, ascending
    pub fn get_hosts(&self) -> Vec<Ipv4Addr> {
        self.hosts.keys().copied().collect()
    }

    pub fn host(&self, ip: Ipv4Addr) -> Option<&HostInfo> {
        self.hosts.get(&ip)
    }

    /// Interfaces recorded for a host, empty if unknown
    pub fn host_interfaces(&self, ip: Ipv4Addr) -> Vec<u16> {
        self.hosts
            .get(&ip)
            .map(|h| h.interfaces().to_vec())
            .unwrap_or_default()
    }

    /// Hosts reachable from `ip` over a direct link on any interface pair
    pub fn get_neighbors(&self, ip: Ipv4Addr) -> Vec<Ipv4Addr> {
        let neighbors: BTreeSet<Ipv4Addr> = self
            .links
            .keys()
            .filter(|pair| pair.from.ip == ip && pair.to.ip != ip)
            .map(|pair| pair.to.ip)
            .collect();
        neighbors.into_iter().collect()
    }

    /// Endpoints linked from the local interface `iface`, with each
    /// neighbor's from-me metric
    pub fn get_neighbors_if(&self, iface: u16) -> BTreeMap<NodeAddress, u32> {
        let local = NodeAddress::new(self.ip, iface);
        self.links
            .keys()
            .filter(|pair| pair.from == local && pair.to.ip != self.ip)
            .map(|pair| {
                let metric = self
                    .hosts
                    .get(&pair.to.ip)
                    .map_or(0, |h| h.state(Direction::FromMe).metric);
                (pair.to, metric)
            })
            .collect()
    }

    /// A uniformly chosen link, if any exist
    pub fn random_link(&self) -> Option<&LinkInfo> {
        self.links.values().choose(&mut rand::rng())
    }

    /// All link records
    pub fn links(&self) -> impl Iterator<Item = &LinkInfo> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Drop every host and link record
    pub fn clear(&mut self) {
        self.hosts.clear();
        self.links.clear();
    }

    /// Remove links whose age exceeds the stale timeout
    pub fn clear_stale(&mut self) {
        let now = self.now();
        let limit = self.config.stale_timeout.as_secs();
        let before = self.links.len();
        self.links.retain(|_, link| u64::from(link.age(now)) <= limit);
        let removed = before - self.links.len();
        if removed > 0 {
            debug!(removed, remaining = self.links.len(), "Cleared stale links");
        }
    }

    /// Move hosts and links out of a previous instance, then recompute
    /// routes in both directions
    pub fn take_state(&mut self, other: &mut LinkTable) {
        self.hosts = mem::take(&mut other.hosts);
        self.links = mem::take(&mut other.links);
        debug!(
            hosts = self.hosts.len(),
            links = self.links.len(),
            "Took over link state"
        );
        self.dijkstra(Direction::FromMe);
        self.dijkstra(Direction::ToMe);
    }

    /// React to `node` switching its radio to `new_iface`
    ///
    /// Every link touching `node` is removed. Hosts whose best route (in
    /// either direction) used `node` fall back to default interfaces,
    /// and `node`'s host records the new interface. The result is
    /// provisional until the next Dijkstra pass.
    pub fn change_if(&mut self, node: NodeAddress, new_iface: u16) {
        if node.is_null() {
            return;
        }

        let before = self.links.len();
        self.links.retain(|pair, _| !pair.contains(&node));
        debug!(
            node = %node,
            new_iface,
            removed = before - self.links.len(),
            "Interface changed"
        );

        let defaults: HashMap<Ipv4Addr, u16> = self
            .hosts
            .keys()
            .map(|&ip| (ip, self.get_if_def(ip)))
            .collect();

        for host in self.hosts.values_mut() {
            let ip = host.ip();
            let if_def = host.if_def();
            for dir in Direction::BOTH {
                let state = host.state_mut(dir);
                if (ip == node.ip && state.iface == node.iface) || state.prev == node {
                    state.iface = if_def;
                    state.prev.iface = defaults.get(&state.prev.ip).copied().unwrap_or(0);
                }
            }
        }

        if let Some(host) = self.hosts.get_mut(&node.ip) {
            host.update_interface(node.iface, new_iface);
        }
    }

    pub fn blacklist_add(&mut self, ip: Ipv4Addr) {
        self.blacklist.insert(ip);
    }

    pub fn blacklist_remove(&mut self, ip: Ipv4Addr) {
        self.blacklist.remove(&ip);
    }

    pub fn blacklist_clear(&mut self) {
        self.blacklist.clear();
    }

    /// Blacklisted IPs, ascending
    pub fn blacklist(&self) -> Vec<Ipv4Addr> {
        let mut ips: Vec<_> = self.blacklist.iter().copied().collect();
        ips.sort();
        ips
    }

    pub fn is_blacklisted(&self, ip: Ipv4Addr) -> bool {
        self.blacklist.contains(&ip)
    }

    /// How long the most recent Dijkstra pass took
    pub fn dijkstra_time(&self) -> Duration {
        self.dijkstra_time
    }
}

impl LinkMetrics for LinkTable {
    fn link_metric(&self, from: NodeAddress, to: NodeAddress) -> u32 {
        self.get_link_metric(from, to)
    }

    fn link_seq(&self, from: NodeAddress, to: NodeAddress) -> u32 {
        self.get_link_seq(from, to)
    }

    fn link_age(&self, from: NodeAddress, to: NodeAddress) -> u32 {
        self.get_link_age(from, to)
    }
}

#[cfg(test)]
mod tests {
    use meshroute_core::ManualClock;

    use super::*;

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn node(last: u8, iface: u16) -> NodeAddress {
        NodeAddress::new(ip(last), iface)
    }

    fn make_table() -> (LinkTable, ManualClock) {
        let clock = ManualClock::new();
        let table = LinkTable::with_config(
            ip(1),
            LinkTableConfig::default(),
            Arc::new(clock.clone()),
        );
        (table, clock)
    }

    #[test]
    fn test_update_link_rejects_null_and_zero() {
        let (mut table, _) = make_table();
        assert!(!table.update_link(NodeAddress::null(), node(2, 1), 1, 0, 100));
        assert!(!table.update_link(node(1, 1), NodeAddress::null(), 1, 0, 100));
        assert!(!table.update_link(node(1, 1), node(2, 1), 1, 0, 0));
        assert_eq!(table.link_count(), 0);
        assert_eq!(table.host_count(), 0);
    }

    #[test]
    fn test_update_link_ignores_stale_age() {
        let (mut table, _) = make_table();
        assert!(table.update_link(node(1, 1), node(2, 1), 1, 121, 100));
        assert_eq!(table.link_count(), 0);

        assert!(table.update_link(node(1, 1), node(2, 1), 1, 120, 100));
        assert_eq!(table.link_count(), 1);
    }

    #[test]
    fn test_update_link_creates_hosts_and_interfaces() {
        let (mut table, _) = make_table();
        assert!(table.update_link(node(1, 1), node(2, 257), 1, 0, 100));
        assert!(table.update_link(node(1, 6), node(2, 6), 1, 0, 100));

        assert_eq!(table.get_hosts(), vec![ip(1), ip(2)]);
        assert_eq!(table.host_interfaces(ip(1)), vec![1, 6]);
        assert_eq!(table.host_interfaces(ip(2)), vec![257, 6]);
        assert_eq!(table.get_if_def(ip(2)), 257);
        assert_eq!(table.get_if_def(ip(1)), 0);
        assert!(table.host_interfaces(ip(9)).is_empty());
    }

    #[test]
    fn test_sequence_monotonicity() {
        let (mut table, _) = make_table();
        let (a, b) = (node(1, 1), node(2, 1));
        table.update_link(a, b, 10, 0, 100);
        table.update_link(a, b, 9, 0, 50);
        table.update_link(a, b, 10, 0, 60);
        assert_eq!(table.get_link_metric(a, b), 100);
        assert_eq!(table.get_link_seq(a, b), 10);

        table.update_link(a, b, 11, 2, 70);
        assert_eq!(table.get_link_metric(a, b), 70);
        assert_eq!(table.get_link_seq(a, b), 11);
        assert_eq!(table.get_link_age(a, b), 2);
    }

    #[test]
    fn test_update_both_links() {
        let (mut table, _) = make_table();
        assert!(table.update_both_links(node(1, 1), node(2, 1), 1, 0, 100));
        assert_eq!(table.get_link_metric(node(1, 1), node(2, 1)), 100);
        assert_eq!(table.get_link_metric(node(2, 1), node(1, 1)), 100);

        assert!(!table.update_both_links(node(1, 1), node(3, 1), 1, 0, 0));
        assert_eq!(table.link_count(), 2);
    }

    #[test]
    fn test_link_age_follows_clock() {
        let (mut table, clock) = make_table();
        let (a, b) = (node(1, 1), node(2, 1));
        table.update_link(a, b, 1, 5, 100);
        clock.advance(Duration::from_secs(10));
        assert_eq!(table.get_link_age(a, b), 15);
    }

    #[test]
    fn test_clear_stale() {
        let (mut table, clock) = make_table();
        table.update_link(node(1, 1), node(2, 1), 1, 100, 100);
        table.update_link(node(1, 1), node(3, 1), 1, 0, 100);

        clock.advance(Duration::from_secs(20));
        table.clear_stale();
        assert_eq!(table.get_link_metric(node(1, 1), node(2, 1)), 100);

        clock.advance(Duration::from_secs(1));
        table.clear_stale();
        assert_eq!(table.get_link_metric(node(1, 1), node(2, 1)), 0);
        assert_eq!(table.get_link_metric(node(1, 1), node(3, 1)), 100);
        // hosts survive their links
        assert_eq!(table.host_count(), 3);
    }

    #[test]
    fn test_aux_setters_ignore_zero() {
        let (mut table, _) = make_table();
        let (a, b) = (node(1, 1), node(2, 1));
        table.update_link(a, b, 1, 0, 100);

        table.set_link_rate(a, b, 54);
        table.set_link_probe(a, b, 1500);
        table.set_link_retries(a, b, 3);
        table.set_link_rate(a, b, 0);
        table.set_link_probe(a, b, 0);
        table.set_link_retries(a, b, 0);

        assert_eq!(table.get_link_rate(a, b), 54);
        assert_eq!(table.get_link_probe(a, b), 1500);
        assert_eq!(table.get_link_retries(a, b), 3);

        // unknown link
        table.set_link_rate(b, a, 11);
        assert_eq!(table.get_link_rate(b, a), 0);
    }

    #[test]
    fn test_blacklist_hides_links() {
        let (mut table, _) = make_table();
        let (a, b) = (node(1, 1), node(2, 257));
        table.update_link(a, b, 1, 0, 100);

        table.blacklist_add(ip(2));
        assert_eq!(table.get_link_metric(a, b), 0);
        assert_eq!(table.get_link_seq(a, b), 0);
        assert_eq!(table.get_if_def(ip(2)), 0);

        table.set_link_rate(a, b, 54);
        table.blacklist_remove(ip(2));
        assert_eq!(table.get_link_metric(a, b), 100);
        assert_eq!(table.get_link_rate(a, b), 0);
        assert_eq!(table.get_if_def(ip(2)), 257);

        table.blacklist_add(ip(3));
        table.blacklist_add(ip(2));
        assert_eq!(table.blacklist(), vec![ip(2), ip(3)]);
        table.blacklist_clear();
        assert!(table.blacklist().is_empty());
    }

    #[test]
    fn test_get_neighbors() {
        let (mut table, _) = make_table();
        table.update_link(node(1, 1), node(2, 1), 1, 0, 100);
        table.update_link(node(1, 6), node(3, 6), 1, 0, 100);
        table.update_link(node(4, 1), node(1, 1), 1, 0, 100);

        assert_eq!(table.get_neighbors(ip(1)), vec![ip(2), ip(3)]);
        assert!(table.get_neighbors(ip(2)).is_empty());
        assert!(table.get_neighbors(ip(9)).is_empty());
    }

    #[test]
    fn test_get_neighbors_if() {
        let (mut table, _) = make_table();
        table.update_both_links(node(1, 1), node(2, 1), 1, 0, 100);
        table.update_both_links(node(1, 6), node(3, 6), 1, 0, 100);
        table.dijkstra(Direction::FromMe);

        let on_one = table.get_neighbors_if(1);
        assert_eq!(on_one.len(), 1);
        assert_eq!(on_one.get(&node(2, 1)), Some(&200));

        let on_six = table.get_neighbors_if(6);
        assert_eq!(on_six.keys().copied().collect::<Vec<_>>(), vec![node(3, 6)]);
        assert!(table.get_neighbors_if(2).is_empty());
    }

    #[test]
    fn test_random_link() {
        let (mut table, _) = make_table();
        assert!(table.random_link().is_none());

        table.update_link(node(1, 1), node(2, 1), 1, 0, 100);
        table.update_link(node(2, 1), node(3, 1), 1, 0, 100);
        for _ in 0..20 {
            let link = table.random_link().unwrap();
            assert_eq!(table.get_link_metric(link.from(), link.to()), 100);
        }
    }

    #[test]
    fn test_clear() {
        let (mut table, _) = make_table();
        table.update_link(node(1, 1), node(2, 1), 1, 0, 100);
        table.clear();
        assert_eq!(table.link_count(), 0);
        assert_eq!(table.host_count(), 0);
    }

    #[test]
    fn test_take_state() {
        let (mut old, _) = make_table();
        old.update_both_links(node(1, 1), node(2, 1), 1, 0, 100);

        let (mut fresh, _) = make_table();
        fresh.take_state(&mut old);

        assert_eq!(old.link_count(), 0);
        assert_eq!(fresh.link_count(), 2);
        assert_eq!(fresh.get_host_metric_from_me(ip(2)), 200);
        assert_eq!(fresh.get_host_metric_to_me(ip(2)), 200);
    }

    #[test]
    fn test_change_if_removes_links_and_resets_routes() {
        let (mut table, _) = make_table();
        table.update_both_links(node(1, 257), node(2, 1), 1, 0, 100);
        table.update_both_links(node(2, 1), node(3, 258), 1, 0, 100);
        table.update_both_links(node(2, 300), node(3, 258), 1, 0, 500);
        table.dijkstra(Direction::FromMe);

        let host3 = table.host(ip(3)).unwrap();
        assert_eq!(host3.state(Direction::FromMe).prev, node(2, 1));

        table.change_if(node(2, 1), 6);

        assert_eq!(table.get_link_metric(node(1, 257), node(2, 1)), 0);
        assert_eq!(table.get_link_metric(node(2, 1), node(3, 258)), 0);
        assert_eq!(table.get_link_metric(node(2, 300), node(3, 258)), 500);

        // host 2 itself was reached on the changed interface
        let host2 = table.host(ip(2)).unwrap();
        assert_eq!(host2.state(Direction::FromMe).iface, 300);
        assert_eq!(host2.interfaces(), &[300, 6]);

        // host 3's predecessor was the changed endpoint
        let host3 = table.host(ip(3)).unwrap();
        assert_eq!(host3.state(Direction::FromMe).iface, 258);
        assert_eq!(host3.state(Direction::FromMe).prev, node(2, 300));
    }

    #[test]
    fn test_link_metrics_trait() {
        let (mut table, _) = make_table();
        table.update_link(node(1, 1), node(2, 1), 7, 3, 100);
        let metrics: &dyn LinkMetrics = &table;
        assert_eq!(metrics.link_metric(node(1, 1), node(2, 1)), 100);
        assert_eq!(metrics.link_seq(node(1, 1), node(2, 1)), 7);
        assert_eq!(metrics.link_age(node(1, 1), node(2, 1)), 3);
        assert_eq!(metrics.link_metric(node(2, 1), node(1, 1)), 0);
    }
}
