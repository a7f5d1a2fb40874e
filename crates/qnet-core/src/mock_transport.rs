//! Mock transport implementation for testing
//!
//! Provides an in-memory control channel so routing and network-layer logic
//! can run without sockets.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qnet_core::{MockNetwork, NodeAddress, Transport};
//!
//! let network = MockNetwork::new();
//! let a = network.add_node(NodeAddress::new(10, 0, 0, 1));
//! let b = network.add_node(NodeAddress::new(10, 0, 0, 2));
//!
//! a.send(b.local_address(), bytes::Bytes::from_static(b"ping"))?;
//! let (sender, data) = b.recv().await?;
//! assert_eq!(sender, a.local_address());
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use crate::address::NodeAddress;
use crate::error::TransportError;
use crate::transport::Transport;

/// Datagram in flight on the mock network
#[derive(Debug, Clone)]
pub struct MockMessage {
    /// The sender of the datagram
    pub sender: NodeAddress,
    /// The datagram payload
    pub data: Bytes,
}

/// A mock transport for testing
///
/// Datagrams are delivered through unbounded in-memory channels, so `send`
/// never blocks. Every accepted datagram is also appended to a send log
/// that tests can inspect.
pub struct MockTransport {
    /// Our address
    local: NodeAddress,
    /// Outgoing channels to reachable nodes
    outgoing: DashMap<NodeAddress, mpsc::UnboundedSender<MockMessage>>,
    /// Incoming datagram receiver
    inbox_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockMessage>>,
    /// Incoming datagram sender (handed to other nodes)
    inbox_tx: mpsc::UnboundedSender<MockMessage>,
    /// Every datagram accepted by `send`, in order
    sent: Mutex<Vec<(NodeAddress, Bytes)>>,
}

impl MockTransport {
    /// Create an unconnected mock transport
    pub fn new(local: NodeAddress) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            local,
            outgoing: DashMap::new(),
            inbox_rx: tokio::sync::Mutex::new(inbox_rx),
            inbox_tx,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Sender half of this transport's inbox
    pub fn inbox_sender(&self) -> mpsc::UnboundedSender<MockMessage> {
        self.inbox_tx.clone()
    }

    /// Make `peer` reachable from this transport (one direction only)
    pub fn connect_to(&self, peer: NodeAddress, peer_inbox: mpsc::UnboundedSender<MockMessage>) {
        self.outgoing.insert(peer, peer_inbox);
    }

    /// Make `peer` unreachable from this transport
    pub fn disconnect_from(&self, peer: &NodeAddress) {
        self.outgoing.remove(peer);
    }

    /// Check whether `peer` is reachable
    pub fn is_connected(&self, peer: &NodeAddress) -> bool {
        self.outgoing.contains_key(peer)
    }

    /// Snapshot of every datagram sent so far
    pub fn sent(&self) -> Vec<(NodeAddress, Bytes)> {
        self.sent.lock().clone()
    }

    /// Drain the send log
    pub fn take_sent(&self) -> Vec<(NodeAddress, Bytes)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Inject a datagram into our own inbox as if `sender` had sent it
    pub fn inject(&self, sender: NodeAddress, data: Bytes) -> Result<(), TransportError> {
        self.inbox_tx
            .send(MockMessage { sender, data })
            .map_err(|_| TransportError::ChannelClosed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn local_address(&self) -> NodeAddress {
        self.local
    }

    fn send(&self, next_hop: NodeAddress, data: Bytes) -> Result<(), TransportError> {
        let sender = self
            .outgoing
            .get(&next_hop)
            .ok_or(TransportError::PeerUnreachable(next_hop))?;

        sender
            .send(MockMessage {
                sender: self.local,
                data: data.clone(),
            })
            .map_err(|_| TransportError::SendFailed("channel closed".into()))?;

        trace!(from = %self.local, to = %next_hop, len = data.len(), "Mock datagram sent");
        self.sent.lock().push((next_hop, data));
        Ok(())
    }

    async fn recv(&self) -> Result<(NodeAddress, Bytes), TransportError> {
        let mut inbox = self.inbox_rx.lock().await;
        let msg = inbox.recv().await.ok_or(TransportError::ChannelClosed)?;
        Ok((msg.sender, msg.data))
    }

    async fn try_recv(&self) -> Result<Option<(NodeAddress, Bytes)>, TransportError> {
        let mut inbox = self.inbox_rx.lock().await;
        match inbox.try_recv() {
            Ok(msg) => Ok(Some((msg.sender, msg.data))),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(TransportError::ChannelClosed),
        }
    }
}

/// A set of mock transports that can all reach each other
///
/// The control channel is an ordinary datagram network, so every node can
/// address every other node regardless of the entanglement topology.
#[derive(Default)]
pub struct MockNetwork {
    nodes: DashMap<NodeAddress, Arc<MockTransport>>,
}

impl MockNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a network containing the given nodes
    pub fn with_nodes(addresses: impl IntoIterator<Item = NodeAddress>) -> Self {
        let network = Self::new();
        for address in addresses {
            network.add_node(address);
        }
        network
    }

    /// Add a node and connect it both ways to every existing node
    ///
    /// Adding an address twice returns the existing transport.
    pub fn add_node(&self, address: NodeAddress) -> Arc<MockTransport> {
        if let Some(existing) = self.nodes.get(&address) {
            return Arc::clone(existing.value());
        }

        let transport = Arc::new(MockTransport::new(address));
        for entry in self.nodes.iter() {
            let other = entry.value();
            transport.connect_to(other.local_address(), other.inbox_sender());
            other.connect_to(address, transport.inbox_sender());
        }
        self.nodes.insert(address, Arc::clone(&transport));
        transport
    }

    /// Transport of a node, if present
    pub fn transport(&self, address: &NodeAddress) -> Option<Arc<MockTransport>> {
        self.nodes.get(address).map(|t| Arc::clone(t.value()))
    }

    /// Cut the channel between two nodes in both directions
    pub fn partition(&self, a: &NodeAddress, b: &NodeAddress) {
        if let Some(ta) = self.nodes.get(a) {
            ta.disconnect_from(b);
        }
        if let Some(tb) = self.nodes.get(b) {
            tb.disconnect_from(a);
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the network has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> NodeAddress {
        NodeAddress::new(10, 0, 0, last)
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let network = MockNetwork::new();
        let a = network.add_node(addr(1));
        let b = network.add_node(addr(2));

        a.send(addr(2), Bytes::from_static(b"hello")).unwrap();

        let (sender, data) = b.recv().await.unwrap();
        assert_eq!(sender, addr(1));
        assert_eq!(data.as_ref(), b"hello");
        assert_eq!(a.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_arrival_order_preserved() {
        let network = MockNetwork::with_nodes([addr(1), addr(2)]);
        let a = network.transport(&addr(1)).unwrap();
        let b = network.transport(&addr(2)).unwrap();

        for i in 0u8..10 {
            a.send(addr(2), Bytes::from(vec![i])).unwrap();
        }
        for i in 0u8..10 {
            let (_, data) = b.recv().await.unwrap();
            assert_eq!(data.as_ref(), &[i]);
        }
    }

    #[tokio::test]
    async fn test_unknown_peer_unreachable() {
        let network = MockNetwork::new();
        let a = network.add_node(addr(1));

        let err = a.send(addr(9), Bytes::new()).unwrap_err();
        assert!(matches!(err, TransportError::PeerUnreachable(p) if p == addr(9)));
        assert!(a.sent().is_empty());
    }

    #[tokio::test]
    async fn test_partition() {
        let network = MockNetwork::with_nodes([addr(1), addr(2), addr(3)]);
        network.partition(&addr(1), &addr(2));

        let a = network.transport(&addr(1)).unwrap();
        assert!(!a.is_connected(&addr(2)));
        assert!(a.is_connected(&addr(3)));
        assert!(a.send(addr(2), Bytes::new()).is_err());
    }

    #[test]
    fn test_try_recv_empty() {
        let network = MockNetwork::new();
        let a = network.add_node(addr(1));
        assert!(tokio_test::block_on(a.try_recv()).unwrap().is_none());

        a.inject(addr(5), Bytes::from_static(b"x")).unwrap();
        let (sender, _) = tokio_test::block_on(a.try_recv()).unwrap().unwrap();
        assert_eq!(sender, addr(5));
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let network = MockNetwork::new();
        let first = network.add_node(addr(1));
        let second = network.add_node(addr(1));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(network.len(), 1);
    }
}
