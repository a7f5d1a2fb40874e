//! Control-channel transport abstraction
//!
//! The [`Transport`] trait is the boundary between the control plane and
//! whatever carries its datagrams. Sending is synchronous and
//! fire-and-forget: the core never waits on delivery and assumes no
//! delivery guarantee. Receiving is async and yields messages in arrival
//! order together with the sender's address.
//!
//! ## Implementations
//!
//! - [`MockTransport`](crate::MockTransport): in-memory channels for tests and simulation
//! - `UdpTransport`: UDP datagrams on the control port (in qnet-transport)

use async_trait::async_trait;
use bytes::Bytes;

use crate::address::NodeAddress;
use crate::error::TransportError;

/// Well-known port every node listens on for control messages
pub const DEFAULT_CONTROL_PORT: u16 = 9999;

/// Transport for control messages between nodes
#[async_trait]
pub trait Transport: Send + Sync {
    /// Address of the node this transport belongs to
    fn local_address(&self) -> NodeAddress;

    /// Hand a datagram to the transport for delivery to `next_hop`
    ///
    /// Must not block. An `Ok` result only means the datagram was accepted.
    fn send(&self, next_hop: NodeAddress, data: Bytes) -> Result<(), TransportError>;

    /// Wait for the next inbound datagram
    ///
    /// # Returns
    ///
    /// A tuple of (sender address, datagram)
    async fn recv(&self) -> Result<(NodeAddress, Bytes), TransportError>;

    /// Receive a datagram if one is immediately available
    async fn try_recv(&self) -> Result<Option<(NodeAddress, Bytes)>, TransportError> {
        match tokio::time::timeout(std::time::Duration::ZERO, self.recv()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn local_address(&self) -> NodeAddress {
        (**self).local_address()
    }

    fn send(&self, next_hop: NodeAddress, data: Bytes) -> Result<(), TransportError> {
        (**self).send(next_hop, data)
    }

    async fn recv(&self) -> Result<(NodeAddress, Bytes), TransportError> {
        (**self).recv().await
    }

    async fn try_recv(&self) -> Result<Option<(NodeAddress, Bytes)>, TransportError> {
        (**self).try_recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_transport_trait_is_object_safe() {
        fn assert_transport<T: Transport>(_: &T) {}
        fn assert_dyn(_: Option<Arc<dyn Transport>>) {}
        let _ = assert_transport::<Arc<dyn Transport>>;
        assert_dyn(None);
    }
}
