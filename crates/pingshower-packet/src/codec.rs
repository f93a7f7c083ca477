use crate::checksum::icmp_ipv4_checksum;
use crate::error::{Error, Result};
use crate::icmpv4::echo_reply::EchoReplyPacket;
use crate::icmpv4::echo_request::EchoRequestPacket;
use crate::icmpv4::{IcmpCode, IcmpPacket, IcmpType};
use crate::ipv4::Ipv4Packet;
use crate::IpProtocol;
use std::net::Ipv4Addr;

/// Write an `ICMPv4` echo request with the given `identifier`, `sequence` and `payload` into `buf`.
///
/// Returns the number of bytes of `buf` used by the datagram.  The checksum is computed over the
/// header and the payload.
pub fn encode_echo_request(
    buf: &mut [u8],
    identifier: u16,
    sequence: u16,
    payload: &[u8],
) -> Result<usize> {
    let len = EchoRequestPacket::minimum_packet_size() + payload.len();
    if buf.len() < len {
        return Err(Error::InsufficientPacketBuffer(
            String::from("EchoRequestPacket"),
            len,
            buf.len(),
        ));
    }
    let mut echo = EchoRequestPacket::new(&mut buf[..len])?;
    echo.set_icmp_type(IcmpType::EchoRequest);
    echo.set_icmp_code(IcmpCode(0));
    echo.set_checksum(0);
    echo.set_identifier(identifier);
    echo.set_sequence(sequence);
    echo.set_payload(payload);
    echo.set_checksum(icmp_ipv4_checksum(echo.packet()));
    Ok(len)
}

/// The `IPv4` header fields of a received datagram.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Ipv4Header {
    /// The header length in bytes.
    pub header_length: usize,
    pub total_length: u16,
    pub ttl: u8,
    pub protocol: IpProtocol,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

/// The `ICMPv4` header fields of a received datagram.
///
/// `identifier` and `sequence` are the second header word regardless of `icmp_type` and so are
/// only meaningful for echo messages.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IcmpHeader {
    pub icmp_type: IcmpType,
    pub code: IcmpCode,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
}

/// A decoded `IPv4` / `ICMPv4` datagram.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Datagram {
    pub ipv4: Ipv4Header,
    pub icmp: IcmpHeader,
    /// The number of bytes following the `IPv4` header.
    pub icmp_len: usize,
}

/// Decode a datagram as read from a raw `ICMPv4` socket (`IPv4` header included).
///
/// Truncated or malformed input is reported as an error and never panics.
pub fn decode(bytes: &[u8]) -> Result<Datagram> {
    let ipv4 = Ipv4Packet::new_view(bytes)?;
    if ipv4.get_version() != 4 {
        return Err(Error::InvalidVersion(ipv4.get_version()));
    }
    if ipv4.get_header_length() < 5 {
        return Err(Error::InvalidHeaderLength(ipv4.get_header_length()));
    }
    let header_length = ipv4.header_len_bytes();
    let required = header_length + IcmpPacket::minimum_packet_size();
    if bytes.len() < required {
        return Err(Error::InsufficientPacketBuffer(
            String::from("Ipv4Packet"),
            required,
            bytes.len(),
        ));
    }
    if ipv4.get_protocol() != IpProtocol::Icmp {
        return Err(Error::InvalidProtocol(ipv4.get_protocol().id()));
    }
    let icmp_bytes = ipv4.payload();
    let icmp = decode_icmp(icmp_bytes)?;
    Ok(Datagram {
        ipv4: Ipv4Header {
            header_length,
            total_length: ipv4.get_total_length(),
            ttl: ipv4.get_ttl(),
            protocol: ipv4.get_protocol(),
            source: ipv4.get_source(),
            destination: ipv4.get_destination(),
        },
        icmp,
        icmp_len: icmp_bytes.len(),
    })
}

fn decode_icmp(bytes: &[u8]) -> Result<IcmpHeader> {
    let icmp_type = IcmpPacket::new_view(bytes)?.get_icmp_type();
    Ok(match icmp_type {
        IcmpType::EchoRequest => {
            let echo = EchoRequestPacket::new_view(bytes)?;
            IcmpHeader {
                icmp_type,
                code: echo.get_icmp_code(),
                checksum: echo.get_checksum(),
                identifier: echo.get_identifier(),
                sequence: echo.get_sequence(),
            }
        }
        _ => {
            let echo = EchoReplyPacket::new_view(bytes)?;
            IcmpHeader {
                icmp_type,
                code: echo.get_icmp_code(),
                checksum: echo.get_checksum(),
                identifier: echo.get_identifier(),
                sequence: echo.get_sequence(),
            }
        }
    })
}
