use crate::types::{Sequence, TraceId};
use std::net::Ipv4Addr;
use std::time::Instant;

/// An outstanding echo request.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Probe {
    /// The sequence number of the probe.
    pub sequence: Sequence,
    /// The echo identifier of the session.
    pub identifier: TraceId,
    /// The time the probe was sent.
    pub sent: Instant,
}

impl Probe {
    #[must_use]
    pub const fn new(sequence: Sequence, identifier: TraceId, sent: Instant) -> Self {
        Self {
            sequence,
            identifier,
            sent,
        }
    }

    /// Does the given echo reply answer this probe?
    ///
    /// Only the low 16 bits of the sequence are compared as that is all the
    /// wire format carries.
    #[must_use]
    pub fn is_answered_by(&self, reply: &EchoReply) -> bool {
        reply.identifier == self.identifier.0 && reply.sequence == self.sequence.wire()
    }
}

/// An echo reply received from the network.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EchoReply {
    /// The source of the reply.
    pub source: Ipv4Addr,
    /// The echo identifier carried by the reply.
    pub identifier: u16,
    /// The 16 bit sequence number carried by the reply.
    pub sequence: u16,
    /// The time-to-live of the `IPv4` datagram.
    pub ttl: u8,
    /// The number of bytes following the `IPv4` header.
    pub bytes: usize,
    /// The time the reply was read from the socket.
    pub received: Instant,
}
