//! Node context injection for multi-node logging
//!
//! Several simulated nodes usually log from the same process. This module
//! keeps the address of the node currently doing work in thread-local
//! storage so every span opened in that scope can be attributed to it.
//!
//! The guard must not be held across an `.await`: a task can resume on a
//! different thread.

use std::cell::RefCell;

use qnet_core::NodeAddress;
use uuid::Uuid;

/// Node context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContextData {
    /// Address of the node
    pub address: NodeAddress,
    /// Unique instance ID for this node session
    pub instance_id: Uuid,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// When this guard is created, it sets the node context for the current thread.
/// When it's dropped, it restores the previous context (if any).
///
/// # Example
///
/// ```ignore
/// use qnet_logging::NodeContextGuard;
///
/// let _guard = NodeContextGuard::new(node_address);
///
/// // Spans opened in this scope carry the node address
/// tracing::info_span!("handle_control_message").in_scope(|| { /* ... */ });
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Set `address` as the current node with a fresh instance ID
    pub fn new(address: NodeAddress) -> Self {
        Self::with_instance_id(address, Uuid::new_v4())
    }

    /// Set `address` as the current node with a specific instance ID
    ///
    /// Useful to keep one instance ID for a node across many scopes.
    pub fn with_instance_id(address: NodeAddress, instance_id: Uuid) -> Self {
        let new_ctx = NodeContextData {
            address,
            instance_id,
        };
        let previous = NODE_CONTEXT.with(|ctx| ctx.borrow_mut().replace(new_ctx));
        Self { previous }
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current node address (if set)
    pub fn current_address() -> Option<NodeAddress> {
        Self::current().map(|ctx| ctx.address)
    }

    /// Get the current instance ID (if set)
    pub fn current_instance_id() -> Option<Uuid> {
        Self::current().map(|ctx| ctx.instance_id)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Convenience macro to run a block in a node context
///
/// # Example
///
/// ```ignore
/// with_node_context!(address, {
///     tracing::info!("Handling control message");
/// });
/// ```
#[macro_export]
macro_rules! with_node_context {
    ($address:expr, $body:block) => {{
        let _guard = $crate::context::NodeContextGuard::new($address);
        $body
    }};
}
