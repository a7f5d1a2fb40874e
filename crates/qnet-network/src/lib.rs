//! # qnet Network
//!
//! Network layer for the qnet entanglement control plane.
//!
//! This crate turns next-hop decisions from a [`RoutingProtocol`] into
//! control traffic on a [`Transport`]: originating entanglement requests,
//! relaying them hop by hop, and terminating them at the destination, with
//! a per-flow session ledger at every node on the path.
//!
//! ## Core Components
//!
//! - [`NetworkLayer`]: per-node message handling and request origination
//! - [`SessionRegistry`]: flow sessions opened at a node
//! - [`NodeRunner`] / [`NodeHandle`]: async event loop driving one node
//! - [`LayerConfig`]: reply and failure-reporting options
//!
//! ## Example
//!
//! ```rust,ignore
//! use qnet_core::MockNetwork;
//! use qnet_network::NetworkLayer;
//! use qnet_routing::{DijkstraRouting, TopologyStore};
//!
//! let topology = TopologyStore::from_links([(a, b, 1.0), (b, c, 1.0)])?.into_shared();
//! let network = MockNetwork::with_nodes([a, b, c]);
//!
//! let mut layer = NetworkLayer::new(
//!     DijkstraRouting::with_topology(topology.clone()),
//!     network.add_node(a),
//! );
//! let disposition = layer.request_entanglement(c, 101);
//! assert_eq!(disposition.next_hop(), Some(b));
//! ```
//!
//! [`RoutingProtocol`]: qnet_core::RoutingProtocol
//! [`Transport`]: qnet_core::Transport

pub mod config;
pub mod error;
pub mod layer;
pub mod runner;
pub mod session;

pub use config::LayerConfig;
pub use error::{NetworkError, NetworkResult};
pub use layer::{Disposition, DropReason, LayerStats, NetworkLayer};
pub use runner::{NodeHandle, NodeRunner};
pub use session::{FlowOutcome, FlowSession, SessionRegistry, SessionRole};
