//! Routing error types
//!
//! Re-exports core routing errors and adds errors raised while loading or
//! building a topology.

use thiserror::Error;

// Re-export core routing errors
pub use qnet_core::RoutingError as CoreRoutingError;
pub use qnet_core::TopologyError;

/// Extended routing errors for the routing crate
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Core routing error
    #[error("Core routing error: {0}")]
    Core(#[from] CoreRoutingError),

    /// A link was rejected by the topology store
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Topology description could not be read
    #[error("Failed to read topology file: {0}")]
    Io(#[from] std::io::Error),

    /// Topology description is malformed
    #[error("Invalid topology description: {0}")]
    InvalidTopology(#[from] serde_json::Error),
}

/// Result type for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
