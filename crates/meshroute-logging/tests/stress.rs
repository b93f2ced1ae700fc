//! Stress tests for node context handling
//!
//! Run with: cargo test -p meshroute-logging --test stress -- --nocapture

use std::net::Ipv4Addr;
use std::thread;
use std::time::Instant;

use meshroute_logging::{NodeContextGuard, node_span};

/// Each thread keeps its own context while others churn theirs
#[test]
fn test_concurrent_node_contexts() {
    const NUM_THREADS: usize = 50;
    const ITERATIONS: usize = 200;

    let start = Instant::now();

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|t| {
            thread::spawn(move || {
                let ip = Ipv4Addr::new(10, 1, (t / 256) as u8, (t % 256) as u8);
                for _ in 0..ITERATIONS {
                    let guard = NodeContextGuard::new(ip);
                    assert_eq!(NodeContextGuard::current_node(), Some(ip));
                    let _span = node_span().entered();
                    drop(guard);
                    assert!(NodeContextGuard::current().is_none());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let elapsed = start.elapsed();
    println!(
        "Completed {} node context operations across {} threads in {:?}",
        NUM_THREADS * ITERATIONS,
        NUM_THREADS,
        elapsed
    );
}

/// Nested guards restore the enclosing node on drop
#[test]
fn test_rapid_context_switching() {
    const NUM_SWITCHES: usize = 10_000;

    let a = Ipv4Addr::new(10, 0, 0, 1);
    let b = Ipv4Addr::new(10, 0, 0, 2);
    let _outer = NodeContextGuard::new(a);

    let start = Instant::now();

    for i in 0..NUM_SWITCHES {
        let ip = if i % 2 == 0 { b } else { a };
        let _guard = NodeContextGuard::new(ip);
        assert_eq!(NodeContextGuard::current_node(), Some(ip));
    }

    let elapsed = start.elapsed();
    println!("Completed {} context switches in {:?}", NUM_SWITCHES, elapsed);

    assert_eq!(NodeContextGuard::current_node(), Some(a));
}
