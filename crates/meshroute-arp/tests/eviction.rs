//! Eviction and accounting scenarios for the resolution cache
//!
//! Every packet that enters the cache must leave it exactly once: drained
//! by a resolve, or counted as a drop.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use meshroute_arp::{ArpCache, ArpConfig, QueryOutcome};
use meshroute_core::{EtherAddress, ManualClock, NodeAddress, ResolutionError};

fn node(i: u8) -> NodeAddress {
    NodeAddress::new(Ipv4Addr::new(192, 168, 1, i), 1)
}

fn eth(i: u8) -> EtherAddress {
    EtherAddress::new([0x02, 0, 0, 0, 1, i])
}

fn cache_with(config: ArpConfig) -> (ArpCache<String>, ManualClock) {
    let clock = ManualClock::new();
    (ArpCache::with_config(config, Arc::new(clock.clone())), clock)
}

#[test]
fn test_eviction_follows_insert_order() {
    let config = ArpConfig {
        entry_capacity: 3,
        ..ArpConfig::default()
    };
    let (cache, clock) = cache_with(config);

    for i in 1..=3 {
        cache.insert(node(i), eth(i)).unwrap();
        clock.advance(Duration::from_secs(1));
    }
    // heavy lookup traffic on the oldest does not save it
    for _ in 0..10 {
        assert_eq!(cache.lookup(node(1)), eth(1));
    }
    // re-inserting the second does
    cache.insert(node(2), eth(2)).unwrap();

    cache.insert(node(4), eth(4)).unwrap();
    assert_eq!(cache.lookup(node(1)), EtherAddress::broadcast());

    cache.insert(node(5), eth(5)).unwrap();
    assert_eq!(cache.lookup(node(3)), EtherAddress::broadcast());

    let nodes: Vec<_> = cache.entries().into_iter().map(|e| e.node).collect();
    assert_eq!(nodes, vec![node(2), node(4), node(5)]);
}

#[test]
fn test_every_packet_accounted_once() {
    let config = ArpConfig {
        packet_capacity: 8,
        entry_capacity: 4,
        ..ArpConfig::default()
    };
    let (cache, clock) = cache_with(config);

    let mut sent = 0u64;
    let mut delivered = 0u64;
    for round in 0..20u8 {
        for i in 0..6u8 {
            let target = node(round % 7 + i);
            match cache.append_query(target, format!("{round}/{i}")) {
                Ok(QueryOutcome::Queued { .. }) => sent += 1,
                Err(rejected) => {
                    assert_eq!(rejected.reason, ResolutionError::AlreadyResolved);
                    delivered += 1;
                    sent += 1;
                }
            }
        }
        if round % 3 == 0 {
            let released = cache.insert_and_drain(node(round % 7), eth(round)).unwrap();
            delivered += released.len() as u64;
        }
        clock.advance(Duration::from_secs(40));
        cache.slim();
    }

    let queued = cache.packet_count() as u64;
    assert_eq!(sent, delivered + cache.drops() + queued);
    assert!(cache.packet_count() <= 8);
    assert!(cache.entry_count() <= 4);

    cache.clear();
    assert_eq!(sent, delivered + cache.drops());
}

#[test]
fn test_drained_packets_keep_order() {
    let (cache, _) = cache_with(ArpConfig::default());
    for i in 0..5 {
        cache.append_query(node(9), format!("p{i}")).unwrap();
    }
    let released = cache.insert_and_drain(node(9), eth(9)).unwrap();
    assert_eq!(released, vec!["p0", "p1", "p2", "p3", "p4"]);

    // a second resolve releases nothing more
    assert!(cache.insert_and_drain(node(9), eth(9)).unwrap().is_empty());
    assert_eq!(cache.drops(), 0);
}

#[test]
fn test_packet_capacity_sheds_oldest_entries_first() {
    let config = ArpConfig {
        packet_capacity: 4,
        ..ArpConfig::default()
    };
    let (cache, _) = cache_with(config);
    for p in ["a1", "a2", "a3"] {
        cache.append_query(node(1), p.to_string()).unwrap();
    }
    for p in ["b1", "b2", "b3"] {
        cache.append_query(node(2), p.to_string()).unwrap();
    }

    assert_eq!(cache.packet_count(), 4);
    assert_eq!(cache.drops(), 2);
    assert_eq!(cache.insert_and_drain(node(1), eth(1)).unwrap(), vec!["a3"]);
    assert_eq!(
        cache.insert_and_drain(node(2), eth(2)).unwrap(),
        vec!["b1", "b2", "b3"]
    );
}

#[test]
fn test_expired_entries_release_their_queues_on_slim() {
    let config = ArpConfig {
        timeout: Duration::from_secs(10),
        ..ArpConfig::default()
    };
    let (cache, clock) = cache_with(config.clone());
    cache.append_query(node(1), "stale".to_string()).unwrap();
    clock.advance(Duration::from_secs(5));
    cache.append_query(node(2), "young".to_string()).unwrap();

    clock.advance(config.slim_interval().unwrap() - Duration::from_secs(5));
    cache.slim();
    assert_eq!(cache.drops(), 1);
    assert_eq!(cache.entry_count(), 1);
    assert_eq!(cache.packet_count(), 1);

    clock.advance(Duration::from_secs(10));
    cache.slim();
    assert_eq!(cache.drops(), 2);
    assert_eq!(cache.entry_count(), 0);
}

#[test]
fn test_take_state_after_restart() {
    let (old, _) = cache_with(ArpConfig::default());
    old.insert(node(1), eth(1)).unwrap();
    old.append_query(node(2), "waiting".to_string()).unwrap();

    let (fresh, _) = cache_with(ArpConfig::default());
    fresh.take_state(&old).unwrap();
    assert_eq!(
        fresh.insert_and_drain(node(2), eth(2)).unwrap(),
        vec!["waiting"]
    );
    assert_eq!(fresh.lookup(node(1)), eth(1));
    assert_eq!(old.entry_count(), 0);

    // taking its own state is a no-op
    fresh.take_state(&fresh).unwrap();
    assert_eq!(fresh.entry_count(), 2);
}

#[test]
fn test_new_packet_survives_capacity_shedding() {
    let config = ArpConfig {
        packet_capacity: 1,
        ..ArpConfig::default()
    };
    let (cache, clock) = cache_with(config);

    // node 1 is the oldest entry, node 2 holds the only queued packet
    cache.insert(node(1), EtherAddress::broadcast()).unwrap();
    clock.advance(Duration::from_secs(1));
    cache.append_query(node(2), "older".to_string()).unwrap();

    let outcome = cache.append_query(node(1), "newer".to_string()).unwrap();
    assert!(matches!(outcome, QueryOutcome::Queued { .. }));
    assert_eq!(cache.packet_count(), 1);
    assert_eq!(cache.drops(), 1);

    assert_eq!(cache.insert_and_drain(node(1), eth(1)).unwrap(), vec!["newer"]);
    assert!(cache.insert_and_drain(node(2), eth(2)).unwrap().is_empty());
}

#[test]
fn test_queueing_on_expired_entry_keeps_packet() {
    let config = ArpConfig {
        packet_capacity: 1,
        ..ArpConfig::default()
    };
    let (cache, clock) = cache_with(config);

    cache.append_query(node(1), "stale".to_string()).unwrap();
    clock.advance(Duration::from_secs(301));

    // shedding expires node 1 along with its old packet
    cache.append_query(node(1), "fresh".to_string()).unwrap();
    assert_eq!(cache.packet_count(), 1);
    assert_eq!(cache.drops(), 1);
    assert_eq!(cache.entry_count(), 1);
    assert_eq!(cache.insert_and_drain(node(1), eth(1)).unwrap(), vec!["fresh"]);
}
