//! # qnet Core
//!
//! Core types, wire codec, and traits for the qnet entanglement control
//! plane.
//!
//! The control plane forwards classical control messages hop-by-hop along a
//! shortest path so that two distant nodes can set up an end-to-end
//! entanglement session. This crate holds everything the routing and
//! network-layer crates agree on.
//!
//! ## Key Traits
//!
//! - [`RoutingProtocol`]: next-hop selection strategy bound to one node
//! - [`Transport`]: fire-and-forget control-channel datagrams
//!
//! ## Key Types
//!
//! - [`NodeAddress`]: IPv4-shaped node identifier
//! - [`ControlMessage`]: the fixed 17-byte control record and its codec
//! - [`OpCode`] / [`OperationType`]: raw and classified operation codes
//! - [`MockTransport`] / [`MockNetwork`]: in-memory control channel

pub mod address;
pub mod error;
pub mod message;
pub mod mock_transport;
pub mod routing;
pub mod transport;

// Re-export main types
pub use address::*;
pub use error::*;
pub use message::*;
pub use mock_transport::*;
pub use routing::*;
pub use transport::*;
