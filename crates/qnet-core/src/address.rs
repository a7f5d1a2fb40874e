//! Node addressing
//!
//! A [`NodeAddress`] is the opaque, totally ordered identifier used both as
//! a topology vertex and as a control-message endpoint. It is IPv4-shaped
//! so that it fits the 4-byte address fields of the wire format.

use std::fmt::{self, Display};
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// Address of a node in the entanglement network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAddress(Ipv4Addr);

impl NodeAddress {
    /// Size of an encoded address in bytes
    pub const LEN: usize = 4;

    /// Create an address from its four octets
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self(Ipv4Addr::new(a, b, c, d))
    }

    /// Get the address as a big-endian `u32`
    pub fn to_bits(self) -> u32 {
        u32::from(self.0)
    }

    /// Create an address from a big-endian `u32`
    pub fn from_bits(bits: u32) -> Self {
        Self(Ipv4Addr::from(bits))
    }

    /// Get the four octets
    pub fn octets(self) -> [u8; 4] {
        self.0.octets()
    }

    /// Create an address from a byte slice of exactly four bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let octets: [u8; 4] = bytes.try_into().map_err(|_| AddressError::InvalidLength {
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(Ipv4Addr::from(octets)))
    }

    /// Get the underlying IPv4 address
    pub fn ip(self) -> Ipv4Addr {
        self.0
    }
}

impl Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Ipv4Addr>()
            .map(Self)
            .map_err(|_| AddressError::InvalidFormat(s.to_string()))
    }
}

impl From<Ipv4Addr> for NodeAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr)
    }
}

impl From<NodeAddress> for Ipv4Addr {
    fn from(addr: NodeAddress) -> Self {
        addr.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let addr = NodeAddress::new(10, 1, 3, 2);
        assert_eq!(addr.to_string(), "10.1.3.2");
        assert_eq!("10.1.3.2".parse::<NodeAddress>().unwrap(), addr);
        assert!("not-an-address".parse::<NodeAddress>().is_err());
    }

    #[test]
    fn test_ordering_follows_numeric_value() {
        let low = NodeAddress::new(10, 0, 0, 2);
        let high = NodeAddress::new(10, 0, 0, 10);
        assert!(low < high);
        assert!(low.to_bits() < high.to_bits());
    }

    #[test]
    fn test_from_bytes_length_check() {
        let addr = NodeAddress::from_bytes(&[192, 168, 0, 1]).unwrap();
        assert_eq!(addr, NodeAddress::new(192, 168, 0, 1));

        let err = NodeAddress::from_bytes(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            AddressError::InvalidLength {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_serde_transparent() {
        let addr = NodeAddress::new(10, 1, 1, 1);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"10.1.1.1\"");
        let back: NodeAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
