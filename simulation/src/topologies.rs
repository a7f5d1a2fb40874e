//! Built-in topologies

use qnet_core::NodeAddress;
use qnet_routing::{LinkSpec, TopologySpec};

/// Addresses of the built-in diamond, in order A, B, C, D
pub const DIAMOND_NODES: [NodeAddress; 4] = [
    NodeAddress::new(10, 1, 1, 1),
    NodeAddress::new(10, 1, 1, 2),
    NodeAddress::new(10, 1, 1, 3),
    NodeAddress::new(10, 1, 1, 4),
];

/// Two paths from A to D: A-B-D costs 2.0, A-C-D costs 1.0
pub fn diamond() -> TopologySpec {
    let [a, b, c, d] = DIAMOND_NODES;
    TopologySpec {
        links: vec![
            LinkSpec { a, b, cost: 1.0 },
            LinkSpec { a: b, b: d, cost: 1.0 },
            LinkSpec { a, b: c, cost: 0.5 },
            LinkSpec { a: c, b: d, cost: 0.5 },
        ],
    }
}

/// Address of the `index`th node of a chain, starting at 10.0.0.1
pub fn chain_node(index: u32) -> NodeAddress {
    NodeAddress::from_bits(NodeAddress::new(10, 0, 0, 1).to_bits() + index)
}

/// `nodes` nodes in a line, each link costing 1.0
///
/// Fewer than two nodes yields an empty topology.
pub fn chain(nodes: u32) -> TopologySpec {
    let links = (1..nodes)
        .map(|i| LinkSpec {
            a: chain_node(i - 1),
            b: chain_node(i),
            cost: 1.0,
        })
        .collect();
    TopologySpec { links }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diamond_shape() {
        let spec = diamond();
        assert_eq!(spec.links.len(), 4);
        assert_eq!(spec.nodes(), DIAMOND_NODES.to_vec());
    }

    #[test]
    fn test_chain() {
        let spec = chain(5);
        assert_eq!(spec.links.len(), 4);
        assert_eq!(spec.nodes().len(), 5);
        assert_eq!(spec.links[0].a, "10.0.0.1".parse().unwrap());
        assert_eq!(spec.links[3].b, "10.0.0.5".parse().unwrap());
    }

    #[test]
    fn test_chain_crosses_octet_boundary() {
        assert_eq!(chain_node(255), "10.0.1.0".parse().unwrap());
    }

    #[test]
    fn test_degenerate_chain() {
        assert!(chain(0).links.is_empty());
        assert!(chain(1).links.is_empty());
    }
}
