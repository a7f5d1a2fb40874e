//! # qnet Transport
//!
//! Network transports for the qnet control channel.
//!
//! [`UdpTransport`] implements [`qnet_core::Transport`] over one UDP socket
//! per node, bound to the well-known control port. Sends are non-blocking
//! and fire-and-forget: a datagram the socket cannot take right away is
//! reported as a send failure, never queued.
//!
//! ## Example
//!
//! ```rust,ignore
//! use qnet_core::{NodeAddress, Transport};
//! use qnet_transport::{UdpConfig, UdpTransport};
//!
//! let transport = UdpTransport::bind(NodeAddress::new(10, 1, 1, 1), UdpConfig::default()).await?;
//! transport.send(NodeAddress::new(10, 1, 1, 2), message.encode())?;
//! ```

pub mod udp;

pub use udp::{UdpConfig, UdpTransport};
