//! Static next-hop table
//!
//! [`StaticRouting`] answers from a fixed destination -> next-hop table
//! configured per node, with an optional default route. It is the simplest
//! alternative to [`DijkstraRouting`](crate::DijkstraRouting) and is useful
//! for pinning a path in tests.

use std::collections::HashMap;

use qnet_core::{NodeAddress, NodeContext, RoutingError, RoutingProtocol};
use tracing::{debug, warn};

use crate::failure::LinkFailureLog;

/// Routing from a manually configured table
#[derive(Debug, Default)]
pub struct StaticRouting {
    node: Option<NodeContext>,
    routes: HashMap<NodeAddress, NodeAddress>,
    default_route: Option<NodeAddress>,
    failures: LinkFailureLog,
}

impl StaticRouting {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, replacing any previous entry for `destination`
    pub fn with_route(mut self, destination: NodeAddress, next_hop: NodeAddress) -> Self {
        self.add_route(destination, next_hop);
        self
    }

    /// Use `next_hop` for destinations without an explicit entry
    pub fn with_default_route(mut self, next_hop: NodeAddress) -> Self {
        self.default_route = Some(next_hop);
        self
    }

    /// Add a route, replacing any previous entry for `destination`
    pub fn add_route(&mut self, destination: NodeAddress, next_hop: NodeAddress) {
        self.routes.insert(destination, next_hop);
    }

    /// Remove the entry for `destination`
    pub fn remove_route(&mut self, destination: &NodeAddress) -> Option<NodeAddress> {
        self.routes.remove(destination)
    }

    /// Number of explicit entries
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the table has no explicit entries
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn failures(&self) -> &LinkFailureLog {
        &self.failures
    }
}

impl RoutingProtocol for StaticRouting {
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
            return Ok(source);
        }

        // The table only describes the bound node's view
        if self.node.map(|n| n.address()) != Some(source) {
            debug!(source = %source, dest = %destination, "Static table queried for foreign source");
            return Err(RoutingError::NoRoute { destination });
        }

        self.routes
            .get(&destination)
            .copied()
            .or(self.default_route)
            .ok_or(RoutingError::NoRoute { destination })
    }

    fn notify_link_failure(&self, neighbor: NodeAddress) {
        let record = self.failures.record(neighbor);
        warn!(neighbor = %neighbor, failures = record.count, "Static route through neighbor failed");
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> NodeAddress {
        NodeAddress::new(10, 0, 0, last)
    }

    fn bound(routing: StaticRouting, node: NodeAddress) -> StaticRouting {
        let mut routing = routing;
        routing.bind(NodeContext::new(node));
        routing
    }

    #[test]
    fn test_explicit_route() {
        let routing = bound(StaticRouting::new().with_route(addr(4), addr(3)), addr(1));
        assert_eq!(routing.route_output(addr(4)), Ok(addr(3)));
        assert_eq!(
            routing.route_output(addr(5)),
            Err(RoutingError::NoRoute { destination: addr(5) })
        );
    }

    #[test]
    fn test_default_route() {
        let routing = bound(
            StaticRouting::new()
                .with_route(addr(4), addr(3))
                .with_default_route(addr(2)),
            addr(1),
        );
        assert_eq!(routing.route_output(addr(4)), Ok(addr(3)));
        assert_eq!(routing.route_output(addr(9)), Ok(addr(2)));
    }

    #[test]
    fn test_self_route_and_foreign_source() {
        let routing = bound(StaticRouting::new().with_default_route(addr(2)), addr(1));
        assert_eq!(routing.next_hop(addr(7), addr(7)), Ok(addr(7)));
        assert!(routing.next_hop(addr(5), addr(9)).is_err());
    }

    #[test]
    fn test_unbound_has_no_routes() {
        let routing = StaticRouting::new().with_default_route(addr(2));
        assert_eq!(routing.route_output(addr(4)), Err(RoutingError::Unbound));
    }

    #[test]
    fn test_replace_and_remove() {
        let mut routing = bound(StaticRouting::new(), addr(1));
        routing.add_route(addr(4), addr(2));
        routing.add_route(addr(4), addr(3));
        assert_eq!(routing.len(), 1);
        assert_eq!(routing.route_output(addr(4)), Ok(addr(3)));

        assert_eq!(routing.remove_route(&addr(4)), Some(addr(3)));
        assert!(routing.is_empty());
    }

    #[test]
    fn test_failures_recorded() {
        let routing = bound(StaticRouting::new(), addr(1));
        routing.notify_link_failure(addr(2));
        assert_eq!(routing.failures().count(&addr(2)), 1);
    }
}
