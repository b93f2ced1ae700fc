//! Channel-diversity aware shortest paths
//!
//! Link metrics are expected transmission times. A path that keeps
//! reusing one radio channel interferes with itself, so the cost of
//! extending a path is the plain sum of its link metrics plus the load on
//! its busiest channel (WCETT with beta = 1).

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::time::Instant;

use meshroute_core::{NodeAddress, NodePair, channel_of};
use tracing::{debug, instrument, trace};

use crate::host::Direction;
use crate::table::LinkTable;

/// Cost of extending a path with per-channel load `channels` by a link of
/// metric `link` on `channel`
pub fn wcett_cost(channels: &BTreeMap<u16, u32>, link: u32, channel: u16) -> u32 {
    let mut total = link;
    let mut max = 0u32;
    let mut found = false;
    for (&ch, &load) in channels {
        let load_here = if ch == channel {
            found = true;
            load.saturating_add(link)
        } else {
            load
        };
        max = max.max(load_here);
        total = total.saturating_add(load);
    }
    if !found {
        max = max.max(link);
    }
    total.saturating_add(max)
}

impl LinkTable {
    /// Recompute best routes in one direction from the local node
    ///
    /// Every host's state for `dir` is reset first. Hosts that cannot be
    /// reached keep a metric of 0.
    #[instrument(skip(self), fields(node = %self.ip, hosts = self.hosts.len()))]
    pub fn dijkstra(&mut self, dir: Direction) {
        let start = Instant::now();
        let root_ip = self.ip;

        for host in self.hosts.values_mut() {
            host.state_mut(dir).clear();
        }

        let Some(root) = self.hosts.get_mut(&root_ip) else {
            debug!("Local node has no links yet");
            self.dijkstra_time = start.elapsed();
            return;
        };
        let seed = root.state_mut(dir);
        seed.prev = NodeAddress::new(root_ip, 0);
        seed.metric = 0;

        let ips: Vec<Ipv4Addr> = self.hosts.keys().copied().collect();
        let links = &self.links;
        let blacklist = &self.blacklist;
        let hosts = &mut self.hosts;

        let mut current = Some(root_ip);
        let mut settled = 0usize;
        while let Some(cur_ip) = current {
            let Some(cur) = hosts.get_mut(&cur_ip) else {
                break;
            };
            cur.state_mut(dir).marked = true;
            settled += 1;
            let cur_ifaces = cur.interfaces().to_vec();
            let cur_channels = cur.state(dir).channels.clone();
            let cur_blacklisted = blacklist.contains(&cur_ip);

            for &cur_if in &cur_ifaces {
                let cur_addr = NodeAddress::new(cur_ip, cur_if);
                for &nbr_ip in &ips {
                    if nbr_ip == cur_ip || cur_blacklisted || blacklist.contains(&nbr_ip) {
                        continue;
                    }
                    let Some(nbr) = hosts.get_mut(&nbr_ip) else {
                        continue;
                    };
                    if nbr.state(dir).marked {
                        continue;
                    }
                    for idx in 0..nbr.interfaces().len() {
                        let nbr_if = nbr.interfaces()[idx];
                        let nbr_addr = NodeAddress::new(nbr_ip, nbr_if);
                        let pair = match dir {
                            Direction::FromMe => NodePair::new(cur_addr, nbr_addr),
                            Direction::ToMe => NodePair::new(nbr_addr, cur_addr),
                        };
                        let metric = match links.get(&pair) {
                            Some(link) if link.metric() > 0 => link.metric(),
                            _ => continue,
                        };

                        let channel = channel_of(nbr_if);
                        let adjusted = wcett_cost(&cur_channels, metric, channel);
                        let state = nbr.state_mut(dir);
                        if state.metric == 0 || adjusted < state.metric {
                            trace!(from = %cur_addr, to = %nbr_addr, adjusted, "Relaxed");
                            state.metric = adjusted;
                            state.prev = cur_addr;
                            state.iface = nbr_if;
                            state.channels = cur_channels.clone();
                            let load = state.channels.entry(channel).or_insert(0);
                            *load = load.saturating_add(metric);
                        }
                    }
                }
            }

            current = hosts
                .values()
                .filter(|h| {
                    let state = h.state(dir);
                    !state.marked && state.metric != 0
                })
                .min_by_key(|h| h.state(dir).metric)
                .map(|h| h.ip());
        }

        self.dijkstra_time = start.elapsed();
        debug!(settled, elapsed = ?self.dijkstra_time, "Dijkstra complete");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use meshroute_core::ManualClock;

    use super::*;
    use crate::config::LinkTableConfig;

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn node(last: u8, iface: u16) -> NodeAddress {
        NodeAddress::new(ip(last), iface)
    }

    fn make_table() -> LinkTable {
        LinkTable::with_config(
            ip(1),
            LinkTableConfig::default(),
            Arc::new(ManualClock::new()),
        )
    }

    #[test]
    fn test_wcett_first_hop() {
        assert_eq!(wcett_cost(&BTreeMap::new(), 100, 1), 200);
    }

    #[test]
    fn test_wcett_same_channel_costs_more() {
        let channels = BTreeMap::from([(1, 100)]);
        assert_eq!(wcett_cost(&channels, 100, 1), 400);
        assert_eq!(wcett_cost(&channels, 100, 6), 300);
    }

    #[test]
    fn test_wcett_busiest_channel_dominates() {
        let channels = BTreeMap::from([(1, 300), (6, 100)]);
        // total = 50 + 400, busiest stays channel 1
        assert_eq!(wcett_cost(&channels, 50, 6), 750);
        // a large link on a new channel becomes the busiest
        assert_eq!(wcett_cost(&channels, 500, 11), 1400);
    }

    #[test]
    fn test_wcett_saturates() {
        let channels = BTreeMap::from([(1, u32::MAX)]);
        assert_eq!(wcett_cost(&channels, 10, 1), u32::MAX);
    }

    #[test]
    fn test_dijkstra_without_local_host() {
        let mut table = make_table();
        table.update_link(node(2, 1), node(3, 1), 1, 0, 100);
        table.dijkstra(Direction::FromMe);
        assert_eq!(table.get_host_metric_from_me(ip(3)), 0);
    }

    #[test]
    fn test_dijkstra_prefers_channel_diversity() {
        let mut table = make_table();
        // 1 -> 2 on channel 1
        table.update_link(node(1, 1), node(2, 1), 1, 0, 100);
        // 2 -> 3 either on channel 1 again or on channel 6
        table.update_link(node(2, 1), node(3, 1), 1, 0, 100);
        table.update_link(node(2, 6), node(3, 6), 1, 0, 100);
        table.dijkstra(Direction::FromMe);

        assert_eq!(table.get_host_metric_from_me(ip(2)), 200);
        assert_eq!(table.get_host_metric_from_me(ip(3)), 300);
        let host3 = table.host(ip(3)).unwrap();
        assert_eq!(host3.state(Direction::FromMe).iface, 6);
        assert_eq!(host3.state(Direction::FromMe).prev, node(2, 6));
        assert_eq!(
            host3.state(Direction::FromMe).channels,
            BTreeMap::from([(1, 100), (6, 100)])
        );
    }

    #[test]
    fn test_dijkstra_single_channel_chain() {
        let mut table = make_table();
        table.update_link(node(1, 1), node(2, 1), 1, 0, 100);
        table.update_link(node(2, 1), node(3, 1), 1, 0, 100);
        table.dijkstra(Direction::FromMe);
        assert_eq!(table.get_host_metric_from_me(ip(3)), 400);
    }

    #[test]
    fn test_dijkstra_to_me_uses_reverse_links() {
        let mut table = make_table();
        table.update_link(node(1, 1), node(2, 1), 1, 0, 100);
        table.dijkstra(Direction::ToMe);
        assert_eq!(table.get_host_metric_to_me(ip(2)), 0);

        table.update_link(node(2, 1), node(1, 1), 1, 0, 70);
        table.dijkstra(Direction::ToMe);
        assert_eq!(table.get_host_metric_to_me(ip(2)), 140);
        assert_eq!(table.get_host_metric_from_me(ip(2)), 0);
    }

    #[test]
    fn test_dijkstra_skips_blacklisted_hosts() {
        let mut table = make_table();
        table.update_link(node(1, 1), node(2, 1), 1, 0, 100);
        table.update_link(node(2, 6), node(3, 6), 1, 0, 100);
        table.update_link(node(1, 11), node(3, 11), 1, 0, 1000);
        table.blacklist_add(ip(2));
        table.dijkstra(Direction::FromMe);

        assert_eq!(table.get_host_metric_from_me(ip(2)), 0);
        assert_eq!(table.get_host_metric_from_me(ip(3)), 2000);
    }

    #[test]
    fn test_dijkstra_resets_previous_results() {
        let mut table = make_table();
        table.update_link(node(1, 1), node(2, 1), 1, 0, 100);
        table.dijkstra(Direction::FromMe);
        assert_eq!(table.get_host_metric_from_me(ip(2)), 200);

        table.clear_stale();
        table.change_if(node(2, 1), 6);
        table.dijkstra(Direction::FromMe);
        assert_eq!(table.get_host_metric_from_me(ip(2)), 0);
    }
}
