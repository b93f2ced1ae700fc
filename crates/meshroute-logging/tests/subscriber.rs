//! Global subscriber installation
//!
//! Kept to a single test: a process can only install one global
//! subscriber.

use std::fs;
use std::net::Ipv4Addr;

use meshroute_logging::{
    FileConfig, LogConfig, MeshSubscriberBuilder, NodeContextGuard, RotationStrategy, node_span,
};

#[test]
fn test_file_output_carries_node_span() {
    let dir = std::env::temp_dir().join(format!("meshroute-subscriber-{}", uuid::Uuid::new_v4()));
    let config = LogConfig {
        default_level: "debug".to_string(),
        file: Some(FileConfig {
            directory: dir.clone(),
            rotation: RotationStrategy::Never,
            ..FileConfig::default()
        }),
        ..LogConfig::default()
    };
    let guard = MeshSubscriberBuilder::new()
        .with_config(config)
        .with_console(false)
        .try_init()
        .unwrap();

    {
        let _ctx = NodeContextGuard::new(Ipv4Addr::new(10, 0, 0, 9));
        let _span = node_span().entered();
        tracing::error!(hops = 3, "Route to destination lost");
    }
    // flush the background writer
    drop(guard);

    let contents = fs::read_to_string(dir.join("meshroute.log")).unwrap();
    let line = contents
        .lines()
        .find(|l| l.contains("Route to destination lost"))
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(json["level"], "ERROR");
    assert_eq!(json["hops"], 3);
    assert_eq!(json["span"]["name"], "node");
    assert_eq!(json["span"]["node"], "10.0.0.9");

    // a second global subscriber is refused
    assert!(MeshSubscriberBuilder::new().with_console(false).try_init().is_err());

    let _ = fs::remove_dir_all(dir);
}
