//! Routing abstractions
//!
//! The network layer talks to routing through [`RoutingProtocol`], so the
//! shortest-path resolver is only one of several interchangeable
//! strategies. A protocol is bound to its node through a [`NodeContext`],
//! an address accessor rather than a handle back into the network layer.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::address::NodeAddress;
use crate::error::RoutingError;

/// Non-owning view of the node a routing protocol serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeContext {
    address: NodeAddress,
}

impl NodeContext {
    /// Create a context for the node with the given address
    pub fn new(address: NodeAddress) -> Self {
        Self { address }
    }

    /// The node's own address
    pub fn address(&self) -> NodeAddress {
        self.address
    }
}

/// Route selection strategy used by the network layer
///
/// Implementations must be deterministic for a fixed topology and must
/// report an unreachable destination as [`RoutingError::NoRoute`], never
/// as an in-band address value.
pub trait RoutingProtocol: Send + Sync {
    /// Associate this protocol with the node it routes for
    fn bind(&mut self, node: NodeContext);

    /// The node this protocol is bound to, if any
    fn node(&self) -> Option<NodeContext>;

    /// Next hop from `source` toward `destination`
    ///
    /// When `source == destination` the source itself is returned.
    fn next_hop(
        &self,
        source: NodeAddress,
        destination: NodeAddress,
    ) -> Result<NodeAddress, RoutingError>;

    /// Next hop from the bound node toward `destination`
    fn route_output(&self, destination: NodeAddress) -> Result<NodeAddress, RoutingError> {
        let node = self.node().ok_or(RoutingError::Unbound)?;
        self.next_hop(node.address(), destination)
    }

    /// Report that forwarding through `neighbor` failed
    fn notify_link_failure(&self, neighbor: NodeAddress);

    /// Short strategy name for logs
    fn name(&self) -> &'static str;
}

/// A resolved path between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Every node on the path, source first and destination last
    pub hops: Vec<NodeAddress>,
    /// Sum of link costs along the path
    pub cost: f64,
}

impl Route {
    /// Create a route from its hop sequence and total cost
    pub fn new(hops: Vec<NodeAddress>, cost: f64) -> Self {
        Self { hops, cost }
    }

    /// First node on the path
    pub fn source(&self) -> Option<NodeAddress> {
        self.hops.first().copied()
    }

    /// Last node on the path
    pub fn destination(&self) -> Option<NodeAddress> {
        self.hops.last().copied()
    }

    /// Neighbor of the source on this path
    ///
    /// A zero-hop route (source is destination) yields the source itself.
    pub fn first_hop(&self) -> Option<NodeAddress> {
        self.hops.get(1).or_else(|| self.hops.first()).copied()
    }

    /// Number of links traversed
    pub fn hop_count(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for hop in &self.hops {
            if !first {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", hop)?;
            first = false;
        }
        write!(f, " (cost {})", self.cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> NodeAddress {
        NodeAddress::new(10, 0, 0, last)
    }

    /// Protocol that always answers with a fixed hop
    struct FixedHop {
        node: Option<NodeContext>,
        hop: NodeAddress,
    }

    impl RoutingProtocol for FixedHop {
        fn bind(&mut self, node: NodeContext) {
            self.node = Some(node);
        }

        fn node(&self) -> Option<NodeContext> {
            self.node
        }

        fn next_hop(
            &self,
            source: NodeAddress,
            destination: NodeAddress,
        ) -> Result<NodeAddress, RoutingError> {
            if source == destination {
                Ok(source)
            } else {
                Ok(self.hop)
            }
        }

        fn notify_link_failure(&self, _neighbor: NodeAddress) {}

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_route_output_requires_binding() {
        let mut proto = FixedHop {
            node: None,
            hop: addr(2),
        };
        assert_eq!(proto.route_output(addr(3)), Err(RoutingError::Unbound));

        proto.bind(NodeContext::new(addr(1)));
        assert_eq!(proto.route_output(addr(3)), Ok(addr(2)));
        assert_eq!(proto.route_output(addr(1)), Ok(addr(1)));
    }

    #[test]
    fn test_route_accessors() {
        let route = Route::new(vec![addr(1), addr(3), addr(4)], 1.0);
        assert_eq!(route.source(), Some(addr(1)));
        assert_eq!(route.destination(), Some(addr(4)));
        assert_eq!(route.first_hop(), Some(addr(3)));
        assert_eq!(route.hop_count(), 2);
        assert_eq!(route.to_string(), "10.0.0.1 -> 10.0.0.3 -> 10.0.0.4 (cost 1)");
    }

    #[test]
    fn test_zero_hop_route() {
        let route = Route::new(vec![addr(1)], 0.0);
        assert_eq!(route.first_hop(), Some(addr(1)));
        assert_eq!(route.hop_count(), 0);
    }
}
