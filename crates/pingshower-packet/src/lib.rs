//! Wire format parsing and building for `ICMPv4` echo probing.
//!
//! The following packet are supported:
//! - `IPv4` (parsing of received datagrams)
//! - `ICMPv4` echo request and echo reply
//!
//! # Endianness
//!
//! The internal representation is held in network byte order (big-endian) and
//! all accessor methods take and return data in host byte order, converting as
//! necessary for the given architecture.
//!
//! # Example
//!
//! The following example builds an `ICMPv4` echo request:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use pingshower_packet::codec::encode_echo_request;
//!
//! let mut buf = [0; 64];
//! let len = encode_echo_request(&mut buf, 0x1234, 1, &[])?;
//! assert_eq!(&buf[..len], &hex_literal::hex!("08 00 e5 ca 12 34 00 01"));
//! # Ok(())
//! # }
//! ```
//!
//! The following example decodes an `IPv4` datagram holding an echo reply:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use pingshower_packet::codec::decode;
//! use pingshower_packet::icmpv4::IcmpType;
//! use std::net::Ipv4Addr;
//!
//! let buf = hex_literal::hex!(
//!     "
//!     45 00 00 1c 00 00 00 00 40 01 00 00 08 08 08 08
//!     c0 a8 01 02 00 00 ed ca 12 34 00 01
//!     "
//! );
//! let datagram = decode(&buf)?;
//! assert_eq!(Ipv4Addr::new(8, 8, 8, 8), datagram.ipv4.source);
//! assert_eq!(64, datagram.ipv4.ttl);
//! assert_eq!(IcmpType::EchoReply, datagram.icmp.icmp_type);
//! assert_eq!(0x1234, datagram.icmp.identifier);
//! assert_eq!(1, datagram.icmp.sequence);
//! # Ok(())
//! # }
//! ```
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;

/// Functions for calculating network checksums.
pub mod checksum;

/// Encoding of echo requests and decoding of received datagrams.
pub mod codec;

/// `ICMPv4` packets.
pub mod icmpv4;

/// `IPv4` packets.
pub mod ipv4;

/// The IP packet next layer protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IpProtocol {
    Icmp,
    Other(u8),
}

impl IpProtocol {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Icmp => 1,
            Self::Other(id) => id,
        }
    }
}

impl From<u8> for IpProtocol {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Icmp,
            p => Self::Other(p),
        }
    }
}

/// Format a payload as a hexadecimal string.
#[must_use]
pub fn fmt_payload(bytes: &[u8]) -> String {
    use itertools::Itertools as _;
    format!("{:02x}", bytes.iter().format(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_protocol() {
        assert_eq!(IpProtocol::Icmp, IpProtocol::from(1));
        assert_eq!(1, IpProtocol::Icmp.id());
        assert_eq!(IpProtocol::Other(17), IpProtocol::from(17));
        assert_eq!(17, IpProtocol::Other(17).id());
    }

    #[test]
    fn test_fmt_payload() {
        assert_eq!("", fmt_payload(&[]));
        assert_eq!("0a ff 00", fmt_payload(&[0x0a, 0xff, 0x00]));
    }
}
