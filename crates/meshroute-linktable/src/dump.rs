//! Human-readable table dumps

use std::fmt::Write;

use meshroute_core::NodeAirport;

use crate::host::Direction;
use crate::table::LinkTable;

impl LinkTable {
    /// One line per hop-annotated route:
    /// `dst hops N metric M ip,arr,dep (m) ip,arr,dep ...`
    pub fn route_to_string(&self, path: &[NodeAirport]) -> String {
        let Some(last) = path.last() else {
            return String::new();
        };
        let mut hops = String::new();
        let mut metric = 0u32;
        for (i, airport) in path.iter().enumerate() {
            let _ = write!(hops, "{airport}");
            if let Some(next) = path.get(i + 1) {
                let m = self.get_link_metric(airport.departure(), next.arrival());
                let _ = write!(hops, " ({m}) ");
                metric = metric.saturating_add(m);
            }
        }
        format!(
            "{} hops {} metric {} {}",
            last.ip,
            path.len() - 1,
            metric,
            hops
        )
    }

    /// Every valid best route in `dir`, ordered by destination IP
    ///
    /// The compact form prints `dst  ip,arr,dep metric (seq,age) ...`.
    pub fn print_routes(&self, dir: Direction, pretty: bool) -> String {
        let mut out = String::new();
        for &ip in self.hosts.keys() {
            let route = self.best_route(ip, dir);
            if !self.valid_route(&route) {
                continue;
            }
            if pretty {
                let _ = writeln!(out, "{}", self.route_to_string(&route));
                continue;
            }
            let Some(last) = route.last() else {
                continue;
            };
            let _ = write!(out, "{}  ", last.ip);
            for (i, airport) in route.iter().enumerate() {
                let _ = write!(out, "{airport}");
                if let Some(next) = route.get(i + 1) {
                    let (from, to) = (airport.departure(), next.arrival());
                    let _ = write!(
                        out,
                        " {} ({},{}) ",
                        self.get_link_metric(from, to),
                        self.get_link_seq(from, to),
                        self.get_link_age(from, to)
                    );
                }
            }
            out.push('\n');
        }
        out
    }

    /// `ip,if - ip,if metric rate seq age` per link, ordered by endpoints
    pub fn print_links(&self) -> String {
        let now = self.now();
        let mut links: Vec<_> = self.links.values().collect();
        links.sort_by_key(|l| (l.from(), l.to()));

        let mut out = String::new();
        for link in links {
            let _ = writeln!(
                out,
                "{} - {} {} {} {} {}",
                link.from(),
                link.to(),
                link.metric(),
                link.rate(),
                link.seq(),
                link.age(now)
            );
        }
        out
    }

    /// `ip interfaces: a b ...` per host, ordered by IP
    pub fn print_hosts(&self) -> String {
        let mut out = String::new();
        for host in self.hosts.values() {
            let _ = write!(out, "{} interfaces:", host.ip());
            for iface in host.interfaces() {
                let _ = write!(out, " {iface}");
            }
            out.push('\n');
        }
        out
    }
}
