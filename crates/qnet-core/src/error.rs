//! Error types for the qnet control plane

use thiserror::Error;

use crate::address::NodeAddress;

/// Errors related to node addresses
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("Invalid address format: {0}")]
    InvalidFormat(String),

    #[error("Invalid address length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors raised while building the link topology
///
/// These are configuration-time failures: a negative or non-finite cost
/// would silently corrupt every later shortest-path result, so setup code
/// is expected to propagate them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("Invalid link cost {cost} between {a} and {b}: must be finite and non-negative")]
    InvalidCost {
        a: NodeAddress,
        b: NodeAddress,
        cost: f64,
    },
}

/// Errors related to path resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("No route available to {destination}")]
    NoRoute { destination: NodeAddress },

    #[error("Routing protocol is not bound to a node")]
    Unbound,
}

/// Errors related to the control message wire format
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Truncated control message: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Errors related to the control-channel transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Peer not reachable: {0}")]
    PeerUnreachable(NodeAddress),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
