//! Link topology store
//!
//! The [`TopologyStore`] holds the undirected, weighted graph every routing
//! instance consults. Inserting `(u, v, cost)` creates the edges `u -> v`
//! and `v -> u` with the same cost.
//!
//! Re-inserting an existing pair is additive: a parallel edge is appended
//! next to the old one instead of replacing it. Shortest-path search only
//! ever uses the cheapest of the parallel edges, so lowering a cost works by
//! adding the cheaper link, while raising one has no effect.
//!
//! Links are never removed. Every insertion bumps a generation counter that
//! caches use to detect a changed graph.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use qnet_core::{NodeAddress, TopologyError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RoutingResult;

/// Topology shared by every routing instance of a process
///
/// Writers take the lock only during setup or live link insertion; path
/// resolution holds the read lock for the duration of one search.
pub type SharedTopology = Arc<RwLock<TopologyStore>>;

/// One directed half of an undirected link
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// The adjacent node
    pub to: NodeAddress,
    /// Cost of traversing the link
    pub cost: f64,
}

/// Undirected weighted graph of known links
#[derive(Debug, Clone, Default)]
pub struct TopologyStore {
    /// Incident links per node, in insertion order
    adjacency: BTreeMap<NodeAddress, Vec<Link>>,
    /// Number of undirected links inserted
    link_count: usize,
    /// Incremented on every successful insertion
    generation: u64,
}

impl TopologyStore {
    /// Create an empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a topology from `(u, v, cost)` triples
    pub fn from_links(
        links: impl IntoIterator<Item = (NodeAddress, NodeAddress, f64)>,
    ) -> Result<Self, TopologyError> {
        let mut store = Self::new();
        for (u, v, cost) in links {
            store.add_link(u, v, cost)?;
        }
        Ok(store)
    }

    /// Insert the undirected link `u <-> v`
    ///
    /// The cost must be finite and non-negative. A self-link is stored once.
    pub fn add_link(&mut self, u: NodeAddress, v: NodeAddress, cost: f64) -> Result<(), TopologyError> {
        if !cost.is_finite() || cost < 0.0 {
            return Err(TopologyError::InvalidCost { a: u, b: v, cost });
        }

        self.adjacency.entry(u).or_default().push(Link { to: v, cost });
        if u != v {
            self.adjacency.entry(v).or_default().push(Link { to: u, cost });
        }
        self.link_count += 1;
        self.generation += 1;

        debug!(a = %u, b = %v, cost, generation = self.generation, "Link added");
        Ok(())
    }

    /// Links incident to `node`, in insertion order
    ///
    /// An unknown node has no links.
    pub fn neighbors(&self, node: &NodeAddress) -> &[Link] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check whether `node` has any link
    pub fn contains(&self, node: &NodeAddress) -> bool {
        self.adjacency.contains_key(node)
    }

    /// All nodes with at least one link, in address order
    pub fn nodes(&self) -> Vec<NodeAddress> {
        self.adjacency.keys().copied().collect()
    }

    /// Number of nodes with at least one link
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected links, parallel links counted separately
    pub fn link_count(&self) -> usize {
        self.link_count
    }

    /// Current generation, bumped on every insertion
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check if the topology has no links
    pub fn is_empty(&self) -> bool {
        self.link_count == 0
    }

    /// Wrap this store for sharing between routing instances
    pub fn into_shared(self) -> SharedTopology {
        Arc::new(RwLock::new(self))
    }
}

/// Serializable description of a topology
///
/// ```json
/// { "links": [ { "a": "10.1.1.1", "b": "10.1.1.2", "cost": 1.0 } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySpec {
    /// Undirected links to insert, in order
    pub links: Vec<LinkSpec>,
}

/// One undirected link in a [`TopologySpec`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub a: NodeAddress,
    pub b: NodeAddress,
    pub cost: f64,
}

impl TopologySpec {
    /// Parse a JSON topology description
    pub fn from_json(json: &str) -> RoutingResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON topology description from disk
    pub fn load(path: impl AsRef<Path>) -> RoutingResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Insert every link into `store`, stopping at the first invalid cost
    pub fn apply(&self, store: &mut TopologyStore) -> Result<(), TopologyError> {
        for link in &self.links {
            store.add_link(link.a, link.b, link.cost)?;
        }
        Ok(())
    }

    /// Build a fresh topology from this description
    pub fn build(&self) -> Result<TopologyStore, TopologyError> {
        let mut store = TopologyStore::new();
        self.apply(&mut store)?;
        Ok(store)
    }

    /// Every distinct node mentioned, in address order
    pub fn nodes(&self) -> Vec<NodeAddress> {
        let mut nodes: Vec<_> = self.links.iter().flat_map(|l| [l.a, l.b]).collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> NodeAddress {
        NodeAddress::new(10, 0, 0, last)
    }

    #[test]
    fn test_undirected_insertion() {
        let mut store = TopologyStore::new();
        store.add_link(addr(1), addr(2), 0.75).unwrap();

        assert_eq!(store.neighbors(&addr(1)), &[Link { to: addr(2), cost: 0.75 }]);
        assert_eq!(store.neighbors(&addr(2)), &[Link { to: addr(1), cost: 0.75 }]);
        assert_eq!(store.link_count(), 1);
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn test_unknown_node_has_no_neighbors() {
        let store = TopologyStore::new();
        assert!(store.neighbors(&addr(7)).is_empty());
        assert!(!store.contains(&addr(7)));
    }

    #[test]
    fn test_invalid_costs_rejected() {
        let mut store = TopologyStore::new();
        for cost in [-0.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = store.add_link(addr(1), addr(2), cost).unwrap_err();
            assert!(matches!(err, TopologyError::InvalidCost { .. }));
        }
        assert!(store.is_empty());
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_zero_cost_accepted() {
        let mut store = TopologyStore::new();
        store.add_link(addr(1), addr(2), 0.0).unwrap();
        assert_eq!(store.neighbors(&addr(1))[0].cost, 0.0);
    }

    #[test]
    fn test_reinsertion_is_additive() {
        let mut store = TopologyStore::new();
        store.add_link(addr(1), addr(2), 1.0).unwrap();
        store.add_link(addr(2), addr(1), 3.0).unwrap();

        assert_eq!(
            store.neighbors(&addr(1)),
            &[
                Link { to: addr(2), cost: 1.0 },
                Link { to: addr(2), cost: 3.0 }
            ]
        );
        assert_eq!(store.neighbors(&addr(2)).len(), 2);
        assert_eq!(store.link_count(), 2);
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_self_link_stored_once() {
        let mut store = TopologyStore::new();
        store.add_link(addr(1), addr(1), 2.0).unwrap();
        assert_eq!(store.neighbors(&addr(1)), &[Link { to: addr(1), cost: 2.0 }]);
    }

    #[test]
    fn test_neighbors_keep_insertion_order() {
        let mut store = TopologyStore::new();
        store.add_link(addr(1), addr(9), 1.0).unwrap();
        store.add_link(addr(1), addr(3), 1.0).unwrap();
        store.add_link(addr(5), addr(1), 1.0).unwrap();

        let order: Vec<_> = store.neighbors(&addr(1)).iter().map(|l| l.to).collect();
        assert_eq!(order, vec![addr(9), addr(3), addr(5)]);
        assert_eq!(store.nodes(), vec![addr(1), addr(3), addr(5), addr(9)]);
    }

    #[test]
    fn test_spec_from_json() {
        let json = r#"{
            "links": [
                { "a": "10.0.0.1", "b": "10.0.0.2", "cost": 1.0 },
                { "a": "10.0.0.2", "b": "10.0.0.3", "cost": 0.5 }
            ]
        }"#;
        let spec = TopologySpec::from_json(json).unwrap();
        assert_eq!(spec.nodes(), vec![addr(1), addr(2), addr(3)]);

        let store = spec.build().unwrap();
        assert_eq!(store.link_count(), 2);
        assert_eq!(store.neighbors(&addr(2)).len(), 2);
    }

    #[test]
    fn test_spec_with_negative_cost_fails_build() {
        let spec = TopologySpec {
            links: vec![LinkSpec {
                a: addr(1),
                b: addr(2),
                cost: -2.0,
            }],
        };
        assert!(spec.build().is_err());
    }

    #[test]
    fn test_spec_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");
        std::fs::write(
            &path,
            r#"{ "links": [ { "a": "10.0.0.1", "b": "10.0.0.4", "cost": 2.5 } ] }"#,
        )
        .unwrap();

        let spec = TopologySpec::load(&path).unwrap();
        assert_eq!(spec.links.len(), 1);
        assert_eq!(spec.links[0].cost, 2.5);
    }

    #[test]
    fn test_spec_malformed() {
        assert!(TopologySpec::from_json("{ \"links\": 3 }").is_err());
    }
}
