//! UDP control channel
//!
//! Each node binds one UDP socket on the control port. A datagram carries
//! exactly one encoded control message. By default a next hop is reached at
//! `(next_hop, control_port)`; explicit endpoints can be registered for
//! peers that listen elsewhere, which also lets several nodes share one
//! host during tests.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use qnet_core::{ControlMessage, DEFAULT_CONTROL_PORT, NodeAddress, Transport, TransportError};
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tracing::{debug, trace};

/// Configuration for a [`UdpTransport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpConfig {
    /// IP to bind; defaults to the node address
    pub bind_ip: Option<Ipv4Addr>,
    /// Local port to bind (0 picks a free port)
    pub control_port: u16,
    /// Port peers are assumed to listen on when no endpoint is registered
    pub peer_port: u16,
    /// Receive buffer size; longer datagrams are truncated by the socket
    pub recv_buffer_size: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind_ip: None,
            control_port: DEFAULT_CONTROL_PORT,
            peer_port: DEFAULT_CONTROL_PORT,
            recv_buffer_size: 512,
        }
    }
}

impl UdpConfig {
    /// Bind to a specific IP instead of the node address
    pub fn with_bind_ip(mut self, ip: Ipv4Addr) -> Self {
        self.bind_ip = Some(ip);
        self
    }

    /// Set the local control port
    pub fn with_control_port(mut self, port: u16) -> Self {
        self.control_port = port;
        self
    }

    /// Set the port assumed for peers
    pub fn with_peer_port(mut self, port: u16) -> Self {
        self.peer_port = port;
        self
    }

    /// Loopback configuration on an ephemeral port
    pub fn loopback() -> Self {
        Self::default()
            .with_bind_ip(Ipv4Addr::LOCALHOST)
            .with_control_port(0)
    }
}

/// Control-channel transport over UDP
pub struct UdpTransport {
    local: NodeAddress,
    socket: UdpSocket,
    config: UdpConfig,
    /// Registered peer endpoints
    endpoints: DashMap<NodeAddress, SocketAddr>,
    /// Reverse lookup for registered endpoints
    senders: DashMap<SocketAddr, NodeAddress>,
}

impl UdpTransport {
    /// Bind the control socket for `local`
    pub async fn bind(local: NodeAddress, config: UdpConfig) -> Result<Self, TransportError> {
        let ip = config.bind_ip.unwrap_or_else(|| local.ip());
        let socket = UdpSocket::bind(SocketAddrV4::new(ip, config.control_port)).await?;
        debug!(node = %local, endpoint = %socket.local_addr()?, "UDP control channel bound");
        Ok(Self {
            local,
            socket,
            config,
            endpoints: DashMap::new(),
            senders: DashMap::new(),
        })
    }

    /// Socket address this transport is bound to
    pub fn local_endpoint(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn config(&self) -> &UdpConfig {
        &self.config
    }

    /// Reach `peer` at `endpoint` instead of its default address
    pub fn add_peer_endpoint(&self, peer: NodeAddress, endpoint: SocketAddr) {
        if let Some(old) = self.endpoints.insert(peer, endpoint) {
            self.senders.remove(&old);
        }
        self.senders.insert(endpoint, peer);
    }

    /// Endpoint datagrams for `peer` are sent to
    pub fn endpoint_for(&self, peer: NodeAddress) -> SocketAddr {
        self.endpoints
            .get(&peer)
            .map(|e| *e.value())
            .unwrap_or_else(|| SocketAddr::V4(SocketAddrV4::new(peer.ip(), self.config.peer_port)))
    }

    /// Node a datagram from `from` belongs to
    fn resolve_sender(&self, from: SocketAddr) -> Result<NodeAddress, TransportError> {
        if let Some(node) = self.senders.get(&from) {
            return Ok(*node.value());
        }
        match from.ip() {
            IpAddr::V4(ip) => Ok(NodeAddress::from(ip)),
            IpAddr::V6(_) => Err(TransportError::ReceiveFailed(format!(
                "datagram from non-IPv4 endpoint {from}"
            ))),
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn local_address(&self) -> NodeAddress {
        self.local
    }

    fn send(&self, next_hop: NodeAddress, data: Bytes) -> Result<(), TransportError> {
        let target = self.endpoint_for(next_hop);
        match self.socket.try_send_to(&data, target) {
            Ok(_) => {
                trace!(from = %self.local, to = %next_hop, %target, len = data.len(), "UDP datagram sent");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Err(TransportError::SendFailed(
                format!("socket not ready for {target}"),
            )),
            Err(e) => match e.kind() {
                ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => {
                    Err(TransportError::PeerUnreachable(next_hop))
                }
                _ => Err(TransportError::Io(e)),
            },
        }
    }

    async fn recv(&self) -> Result<(NodeAddress, Bytes), TransportError> {
        let mut buf = vec![0u8; self.config.recv_buffer_size.max(ControlMessage::WIRE_SIZE)];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        let sender = self.resolve_sender(from)?;
        trace!(node = %self.local, sender = %sender, len, "UDP datagram received");
        Ok((sender, Bytes::from(buf)))
    }

    async fn try_recv(&self) -> Result<Option<(NodeAddress, Bytes)>, TransportError> {
        let mut buf = vec![0u8; self.config.recv_buffer_size.max(ControlMessage::WIRE_SIZE)];
        match self.socket.try_recv_from(&mut buf) {
            Ok((len, from)) => {
                buf.truncate(len);
                Ok(Some((self.resolve_sender(from)?, Bytes::from(buf))))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = UdpConfig::default();
        assert_eq!(config.control_port, 9999);
        assert_eq!(config.peer_port, 9999);
        assert!(config.bind_ip.is_none());
    }

    #[tokio::test]
    async fn test_default_endpoint_uses_peer_port() {
        let node = NodeAddress::new(10, 0, 0, 1);
        let transport = UdpTransport::bind(node, UdpConfig::loopback().with_peer_port(7777))
            .await
            .unwrap();

        let peer = NodeAddress::new(10, 0, 0, 2);
        assert_eq!(
            transport.endpoint_for(peer),
            "10.0.0.2:7777".parse::<SocketAddr>().unwrap()
        );

        let registered: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        transport.add_peer_endpoint(peer, registered);
        assert_eq!(transport.endpoint_for(peer), registered);
        assert_eq!(transport.resolve_sender(registered).unwrap(), peer);
    }

    #[tokio::test]
    async fn test_unregistered_sender_resolves_by_ip() {
        let transport = UdpTransport::bind(NodeAddress::new(10, 0, 0, 1), UdpConfig::loopback())
            .await
            .unwrap();
        let from: SocketAddr = "192.168.1.7:9999".parse().unwrap();
        assert_eq!(
            transport.resolve_sender(from).unwrap(),
            NodeAddress::new(192, 168, 1, 7)
        );

        let v6: SocketAddr = "[::1]:9999".parse().unwrap();
        assert!(transport.resolve_sender(v6).is_err());
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let transport = UdpTransport::bind(NodeAddress::new(10, 0, 0, 1), UdpConfig::loopback())
            .await
            .unwrap();
        assert!(transport.try_recv().await.unwrap().is_none());
    }
}
