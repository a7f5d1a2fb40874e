//! # qnet Routing
//!
//! Routing layer for the qnet entanglement control plane.
//!
//! Every node asks its routing component for the next hop toward a
//! destination. The default strategy runs Dijkstra's algorithm over a
//! weighted, undirected link topology that all nodes of a process share, so
//! each node has global topology knowledge without exchanging link state.
//!
//! ## Core Components
//!
//! - [`TopologyStore`]: undirected weighted links, additive on re-insertion
//! - [`DijkstraRouting`]: shortest-path next-hop resolution
//! - [`StaticRouting`]: fixed per-node next-hop table
//! - [`RouteCache`]: computed next hops, invalidated by topology changes
//! - [`LinkFailureLog`]: failures reported by the network layer
//!
//! ## Example
//!
//! ```rust,ignore
//! use qnet_core::{NodeAddress, NodeContext, RoutingProtocol};
//! use qnet_routing::{DijkstraRouting, TopologyStore};
//!
//! let topology = TopologyStore::new().into_shared();
//! let mut routing = DijkstraRouting::with_topology(topology.clone());
//! routing.bind(NodeContext::new(a));
//!
//! routing.add_link(a, b, 1.0)?;
//! routing.add_link(b, c, 1.0)?;
//!
//! assert_eq!(routing.route_output(c)?, b);
//! ```

pub mod cache;
pub mod dijkstra;
pub mod error;
pub mod failure;
pub mod static_routing;
pub mod topology;

// Re-exports
pub use cache::{CachedRoute, RouteCache};
pub use dijkstra::{DijkstraConfig, DijkstraRouting, shortest_path};
pub use error::{RoutingError, RoutingResult};
pub use failure::{FailureRecord, LinkFailureLog};
pub use static_routing::StaticRouting;
pub use topology::{Link, LinkSpec, SharedTopology, TopologySpec, TopologyStore};
