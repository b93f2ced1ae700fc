//! Route derivation and validation

use std::collections::HashSet;
use std::net::Ipv4Addr;

use meshroute_core::{NodeAirport, Path};

use crate::host::Direction;
use crate::table::LinkTable;

impl LinkTable {
    /// Best route between the local node and `dst`, per the last
    /// Dijkstra pass in `dir`
    ///
    /// `FromMe` routes start at the local node and end at `dst`; `ToMe`
    /// routes start at `dst` and end at the local node. Unknown, null or
    /// unreachable destinations give an empty path. The local node itself
    /// gives a single airport with no interfaces.
    pub fn best_route(&self, dst: Ipv4Addr, dir: Direction) -> Path {
        let mut route = Path::new();
        if dst.is_unspecified() {
            return route;
        }

        let mut prev_if = 0u16;
        let mut current = self.hosts.get(&dst);
        while let Some(host) = current {
            let state = host.state(dir);
            if state.metric == 0 {
                if host.ip() != self.ip {
                    return Path::new();
                }
                route.push(match dir {
                    Direction::FromMe => NodeAirport::new(host.ip(), 0, prev_if),
                    Direction::ToMe => NodeAirport::new(host.ip(), prev_if, 0),
                });
                break;
            }
            // predecessor pointers form a tree after a full pass; a
            // partially updated table must not loop forever
            if route.len() > self.hosts.len() {
                return Path::new();
            }
            route.push(match dir {
                Direction::FromMe => NodeAirport::new(host.ip(), state.iface, prev_if),
                Direction::ToMe => NodeAirport::new(host.ip(), prev_if, state.iface),
            });
            prev_if = state.prev.iface;
            current = self.hosts.get(&state.prev.ip);
        }

        if current.is_none() {
            return Path::new();
        }
        if dir == Direction::FromMe {
            route.reverse();
        }
        route
    }

    /// Sum of link metrics along a path, 0 if any hop is unknown or
    /// unusable
    pub fn get_route_metric(&self, path: &[NodeAirport]) -> u32 {
        let mut metric = 0u32;
        for hop in path.windows(2) {
            let m = self.get_link_metric(hop[0].departure(), hop[1].arrival());
            if m == 0 {
                return 0;
            }
            metric = metric.saturating_add(m);
        }
        metric
    }

    /// A route is valid if it is non-empty, its metric is in
    /// `(0, max_route_metric)` and no IP repeats
    pub fn valid_route(&self, path: &[NodeAirport]) -> bool {
        if path.is_empty() {
            return false;
        }
        let metric = self.get_route_metric(path);
        if metric == 0 || metric >= self.config.max_route_metric {
            return false;
        }
        let mut seen = HashSet::with_capacity(path.len());
        path.iter().all(|a| seen.insert(a.ip))
    }
}
