//! Path resolution tests for qnet-routing
//!
//! These tests run the resolver over larger topologies and under concurrent
//! access to a shared topology.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use qnet_core::{NodeAddress, NodeContext, RoutingError, RoutingProtocol};
use qnet_routing::{DijkstraRouting, TopologySpec, TopologyStore, shortest_path};

// Test helpers
fn grid_addr(row: u8, col: u8) -> NodeAddress {
    NodeAddress::new(10, 1, row, col)
}

/// `n` x `n` grid, horizontal links cost 1.0 and vertical links 2.0
fn grid(n: u8) -> TopologyStore {
    let mut store = TopologyStore::new();
    for row in 0..n {
        for col in 0..n {
            if col + 1 < n {
                store
                    .add_link(grid_addr(row, col), grid_addr(row, col + 1), 1.0)
                    .unwrap();
            }
            if row + 1 < n {
                store
                    .add_link(grid_addr(row, col), grid_addr(row + 1, col), 2.0)
                    .unwrap();
            }
        }
    }
    store
}

#[test]
fn test_grid_path_cost() {
    let store = grid(20);
    assert_eq!(store.node_count(), 400);

    let start = Instant::now();
    let route = shortest_path(&store, grid_addr(0, 0), grid_addr(19, 19)).unwrap();
    println!("Resolved 20x20 grid corner-to-corner in {:?}", start.elapsed());

    // 19 horizontal steps at 1.0 plus 19 vertical steps at 2.0
    assert_eq!(route.cost, 57.0);
    assert_eq!(route.hop_count(), 38);
    assert_eq!(route.source(), Some(grid_addr(0, 0)));
    assert_eq!(route.destination(), Some(grid_addr(19, 19)));
}

#[test]
fn test_route_is_consistent_hop_by_hop() {
    let store = grid(8).into_shared();
    let destination = grid_addr(7, 5);

    let mut current = grid_addr(0, 0);
    let expected = shortest_path(&store.read(), current, destination).unwrap();

    // Following next_hop from each node reproduces the full path
    let mut walked = vec![current];
    while current != destination {
        let mut routing = DijkstraRouting::with_topology(store.clone());
        routing.bind(NodeContext::new(current));
        current = routing.route_output(destination).unwrap();
        walked.push(current);
        assert!(walked.len() <= 64, "forwarding loop");
    }

    assert_eq!(walked, expected.hops);
}

#[test]
fn test_diamond_from_json_description() {
    let spec = TopologySpec::from_json(
        r#"{
            "links": [
                { "a": "10.1.1.1", "b": "10.1.1.2", "cost": 1.0 },
                { "a": "10.1.1.2", "b": "10.1.1.4", "cost": 1.0 },
                { "a": "10.1.1.1", "b": "10.1.1.3", "cost": 0.5 },
                { "a": "10.1.1.3", "b": "10.1.1.4", "cost": 0.5 }
            ]
        }"#,
    )
    .unwrap();

    let shared = spec.build().unwrap().into_shared();
    let mut routing = DijkstraRouting::with_topology(shared);
    routing.bind(NodeContext::new(NodeAddress::new(10, 1, 1, 1)));

    assert_eq!(
        routing.route_output(NodeAddress::new(10, 1, 1, 4)),
        Ok(NodeAddress::new(10, 1, 1, 3))
    );
}

#[test]
fn test_concurrent_readers_with_writer() {
    let shared = grid(10).into_shared();
    let destination = grid_addr(9, 9);

    let readers: Vec<_> = (0..8u8)
        .map(|i| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let mut routing = DijkstraRouting::with_topology(shared);
                routing.bind(NodeContext::new(grid_addr(i, 0)));
                for _ in 0..200 {
                    let hop = routing.route_output(destination).unwrap();
                    assert_ne!(hop, grid_addr(i, 0));
                }
            })
        })
        .collect();

    // A single writer adds shortcuts while readers resolve
    let writer = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            for i in 0..10u8 {
                shared
                    .write()
                    .add_link(grid_addr(i, 0), destination, 100.0)
                    .unwrap();
            }
        })
    };

    for handle in readers {
        handle.join().unwrap();
    }
    writer.join().unwrap();

    assert_eq!(shared.read().neighbors(&destination).len(), 12);
}

#[test]
fn test_unreachable_island() {
    let mut store = grid(4);
    store
        .add_link(NodeAddress::new(192, 168, 0, 1), NodeAddress::new(192, 168, 0, 2), 1.0)
        .unwrap();

    let mut routing = DijkstraRouting::with_topology(store.into_shared());
    routing.bind(NodeContext::new(grid_addr(0, 0)));

    let island = NodeAddress::new(192, 168, 0, 2);
    assert_eq!(
        routing.route_output(island),
        Err(RoutingError::NoRoute { destination: island })
    );
}
