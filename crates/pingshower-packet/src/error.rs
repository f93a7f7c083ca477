use thiserror::Error;

/// A packet error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A packet error.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    /// Attempting to create a packet with an insufficient buffer size.
    #[error("insufficient buffer for {0} packet, minimum={1}, provided={2}")]
    InsufficientPacketBuffer(String, usize, usize),
    /// The `IPv4` version nibble is not 4.
    #[error("invalid IP version: {0}")]
    InvalidVersion(u8),
    /// The `IPv4` header length (in 32-bit words) is below the minimum of 5.
    #[error("invalid IPv4 header length: {0}")]
    InvalidHeaderLength(u8),
    /// The datagram does not carry `ICMP`.
    #[error("invalid IP protocol: {0}")]
    InvalidProtocol(u8),
}
