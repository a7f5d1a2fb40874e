//! Error types for the network layer

use qnet_core::TransportError;
use thiserror::Error;

/// Errors that stop a node runner or its handle
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The runner has stopped and no longer accepts commands
    #[error("Node runner stopped")]
    RunnerStopped,

    /// The runner task panicked or was aborted
    #[error("Node runner task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for network layer operations
pub type NetworkResult<T> = Result<T, NetworkError>;
