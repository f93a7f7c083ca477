use crate::config::{ProbeConfig, MAX_ECHO_REQUEST_SIZE};
use crate::error::{Error, ErrorKind, IoError, Result};
use crate::net::socket::Socket;
use crate::net::Network;
use crate::probe::{EchoReply, Probe};
use pingshower_packet::codec;
use pingshower_packet::icmpv4::echo_request::EchoRequestPacket;
use pingshower_packet::icmpv4::IcmpType;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tracing::instrument;

/// The size of the buffer used to receive datagrams.
const RECV_BUFFER_SIZE: usize = 65_536;

/// A channel for sending echo requests and receiving echo replies over a single socket.
pub struct Channel<S: Socket> {
    target_addr: Ipv4Addr,
    payload: &'static [u8],
    socket: Option<S>,
    recv_buf: Vec<u8>,
}

impl<S: Socket> Channel<S> {
    /// Create a `Channel` over a newly opened raw `ICMP` socket.
    ///
    /// This operation requires the `CAP_NET_RAW` capability on Linux.
    #[instrument(skip_all, level = "trace")]
    pub fn connect(config: &ProbeConfig) -> Result<Self> {
        tracing::debug!(?config);
        let request_size = EchoRequestPacket::minimum_packet_size() + config.payload.len();
        if request_size > MAX_ECHO_REQUEST_SIZE {
            return Err(Error::BadConfig(format!(
                "echo request size {request_size} exceeds maximum {MAX_ECHO_REQUEST_SIZE}"
            )));
        }
        let socket = S::open_icmpv4()?;
        Ok(Self::new(config, socket))
    }

    fn new(config: &ProbeConfig, socket: S) -> Self {
        Self {
            target_addr: config.target_addr,
            payload: config.payload,
            socket: Some(socket),
            recv_buf: vec![0; RECV_BUFFER_SIZE],
        }
    }
}

impl<S: Socket> Network for Channel<S> {
    #[instrument(skip(self), level = "trace")]
    fn send_probe(&mut self, probe: Probe) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(Error::SocketClosed)?;
        let mut buf = [0_u8; MAX_ECHO_REQUEST_SIZE];
        let len = codec::encode_echo_request(
            &mut buf,
            probe.identifier.0,
            probe.sequence.wire(),
            self.payload,
        )?;
        let addr = SocketAddr::new(IpAddr::V4(self.target_addr), 0);
        socket.send_to(&buf[..len], addr).map_err(probe_failed)
    }

    #[instrument(skip(self), level = "trace")]
    fn recv_reply(&mut self, timeout: Duration) -> Result<Option<EchoReply>> {
        let Self {
            socket, recv_buf, ..
        } = self;
        let socket = socket.as_mut().ok_or(Error::SocketClosed)?;
        let Some(received) = socket.recv_timeout(recv_buf, timeout)? else {
            return Ok(None);
        };
        let reply = extract_echo_reply(&recv_buf[..received], Instant::now());
        if let Some(reply) = &reply {
            tracing::debug!(?reply);
        }
        Ok(reply)
    }

    #[instrument(skip(self), level = "trace")]
    fn close(&mut self) -> Result<()> {
        if let Some(mut socket) = self.socket.take() {
            match socket.shutdown() {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::Std(io::ErrorKind::NotConnected) => {}
                Err(err) => return Err(Error::IoError(err)),
            }
        }
        Ok(())
    }
}

/// Classify a send error.
///
/// An unreachable destination fails only the probe being sent.  Any other
/// error is an `IoError`.
fn probe_failed(err: IoError) -> Error {
    match err.kind() {
        ErrorKind::HostUnreachable | ErrorKind::NetUnreachable => Error::ProbeFailed(err),
        _ => Error::IoError(err),
    }
}

/// Extract an `EchoReply` from a datagram read from the raw socket.
///
/// Anything that does not decode, or is not an echo reply, is discarded.
fn extract_echo_reply(bytes: &[u8], received: Instant) -> Option<EchoReply> {
    let datagram = match codec::decode(bytes) {
        Ok(datagram) => datagram,
        Err(err) => {
            tracing::trace!(%err, "discarding undecodable datagram");
            return None;
        }
    };
    if datagram.icmp.icmp_type != IcmpType::EchoReply {
        tracing::trace!(icmp_type = ?datagram.icmp.icmp_type, "discarding non echo reply");
        return None;
    }
    Some(EchoReply {
        source: datagram.ipv4.source,
        identifier: datagram.icmp.identifier,
        sequence: datagram.icmp.sequence,
        ttl: datagram.ipv4.ttl,
        bytes: datagram.icmp_len,
        received,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IoOperation, IoResult};
    use nix::errno::Errno;
    use test_case::test_case;
    use crate::mocket_recv;
    use crate::net::socket::MockSocket;
    use crate::types::{Sequence, TraceId};
    use mockall::predicate;
    use std::sync::Mutex;

    static MTX: Mutex<()> = Mutex::new(());

    const ECHO_REPLY: [u8; 28] = hex_literal::hex!(
        "
        45 00 00 1c 7a 10 00 00 36 01 00 00 5d b8 d8 22
        c0 a8 01 14 00 00 d2 92 2d 68 00 05
        "
    );

    const TIME_EXCEEDED: [u8; 28] = hex_literal::hex!(
        "
        45 00 00 1c 7a 10 00 00 36 01 00 00 5d b8 d8 22
        c0 a8 01 14 0b 00 f4 ff 00 00 00 00
        "
    );

    fn config() -> ProbeConfig {
        ProbeConfig {
            target_addr: Ipv4Addr::new(5, 6, 7, 8),
            payload: b"abcd",
            ..ProbeConfig::default()
        }
    }

    #[test]
    fn test_send_probe() -> anyhow::Result<()> {
        let expected_send_to_buf = hex_literal::hex!("08 00 2e 66 04 d2 00 01 61 62 63 64");
        let expected_send_to_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8)), 0);
        let mut mocket = MockSocket::new();
        mocket
            .expect_send_to()
            .with(
                predicate::eq(expected_send_to_buf),
                predicate::eq(expected_send_to_addr),
            )
            .times(1)
            .returning(|_, _| Ok(()));
        let mut channel = Channel::new(&config(), mocket);
        let probe = Probe::new(Sequence(1), TraceId(1234), Instant::now());
        channel.send_probe(probe)?;
        Ok(())
    }

    #[test]
    fn test_send_probe_carries_low_sequence_bits() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        mocket
            .expect_send_to()
            .withf(|buf: &[u8], _| buf[6..8] == [0x00, 0x02])
            .times(1)
            .returning(|_, _| Ok(()));
        let mut channel = Channel::new(&config(), mocket);
        let probe = Probe::new(Sequence(65_538), TraceId(1), Instant::now());
        channel.send_probe(probe)?;
        Ok(())
    }

    #[test_case(Errno::EHOSTUNREACH, true; "host unreachable")]
    #[test_case(Errno::ENETUNREACH, true; "net unreachable")]
    #[test_case(Errno::EPERM, false; "permission denied")]
    #[test_case(Errno::ENOBUFS, false; "no buffer space")]
    fn test_send_probe_failed(errno: Errno, transient: bool) {
        let mut mocket = MockSocket::new();
        mocket.expect_send_to().times(1).returning(move |_, addr| {
            Err(IoError::SendTo(
                io::Error::from_raw_os_error(errno as i32),
                addr,
            ))
        });
        let mut channel = Channel::new(&config(), mocket);
        let probe = Probe::new(Sequence(1), TraceId(1), Instant::now());
        let err = channel.send_probe(probe).unwrap_err();
        if transient {
            assert!(matches!(err, Error::ProbeFailed(IoError::SendTo(..))));
        } else {
            assert!(matches!(err, Error::IoError(IoError::SendTo(..))));
        }
    }

    #[test]
    fn test_recv_echo_reply() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        mocket
            .expect_recv_timeout()
            .with(
                predicate::always(),
                predicate::eq(Duration::from_millis(10)),
            )
            .times(1)
            .returning(mocket_recv!(ECHO_REPLY));
        let mut channel = Channel::new(&config(), mocket);
        let reply = channel
            .recv_reply(Duration::from_millis(10))?
            .ok_or_else(|| anyhow::anyhow!("expected an echo reply"))?;
        assert_eq!(Ipv4Addr::new(93, 184, 216, 34), reply.source);
        assert_eq!(0x2d68, reply.identifier);
        assert_eq!(5, reply.sequence);
        assert_eq!(54, reply.ttl);
        assert_eq!(8, reply.bytes);
        Ok(())
    }

    #[test]
    fn test_recv_nothing_received() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        mocket
            .expect_recv_timeout()
            .times(1)
            .returning(|_, _| Ok(None));
        let mut channel = Channel::new(&config(), mocket);
        assert_eq!(None, channel.recv_reply(Duration::from_millis(10))?);
        Ok(())
    }

    #[test]
    fn test_recv_error() {
        let mut mocket = MockSocket::new();
        mocket.expect_recv_timeout().times(1).returning(|_, _| {
            Err(IoError::Other(
                io::Error::from(io::ErrorKind::ConnectionReset),
                IoOperation::Read,
            ))
        });
        let mut channel = Channel::new(&config(), mocket);
        let err = channel.recv_reply(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, Error::IoError(IoError::Other(..))));
    }

    #[test]
    fn test_recv_discards_non_echo_reply() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        mocket
            .expect_recv_timeout()
            .times(1)
            .returning(mocket_recv!(TIME_EXCEEDED));
        let mut channel = Channel::new(&config(), mocket);
        assert_eq!(None, channel.recv_reply(Duration::from_millis(10))?);
        Ok(())
    }

    #[test]
    fn test_recv_discards_truncated_datagram() -> anyhow::Result<()> {
        let truncated: [u8; 24] = ECHO_REPLY[..24].try_into()?;
        let mut mocket = MockSocket::new();
        mocket
            .expect_recv_timeout()
            .times(1)
            .returning(mocket_recv!(truncated));
        let mut channel = Channel::new(&config(), mocket);
        assert_eq!(None, channel.recv_reply(Duration::from_millis(10))?);
        Ok(())
    }

    #[test]
    fn test_close_ignores_not_connected() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        mocket.expect_shutdown().times(1).returning(|| {
            Err(IoError::Other(
                io::Error::from(io::ErrorKind::NotConnected),
                IoOperation::Shutdown,
            ))
        });
        let mut channel = Channel::new(&config(), mocket);
        channel.close()?;
        Ok(())
    }

    #[test]
    fn test_no_socket_operations_after_close() -> anyhow::Result<()> {
        let mut mocket = MockSocket::new();
        mocket.expect_shutdown().times(1).returning(|| Ok(()));
        mocket.expect_send_to().never();
        mocket.expect_recv_timeout().never();
        let mut channel = Channel::new(&config(), mocket);
        channel.close()?;
        channel.close()?;
        let probe = Probe::new(Sequence(1), TraceId(1), Instant::now());
        assert!(matches!(
            channel.send_probe(probe),
            Err(Error::SocketClosed)
        ));
        assert!(matches!(
            channel.recv_reply(Duration::from_millis(10)),
            Err(Error::SocketClosed)
        ));
        Ok(())
    }

    #[test]
    fn test_connect() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let ctx = MockSocket::open_icmpv4_context();
        ctx.expect().times(1).returning(|| Ok(MockSocket::new()));
        let _channel = Channel::<MockSocket>::connect(&config())?;
        Ok(())
    }

    #[test]
    fn test_connect_permission_denied() {
        let _m = MTX.lock();
        let ctx = MockSocket::open_icmpv4_context();
        ctx.expect().times(1).returning(|| {
            Err(IoError::Other(
                io::Error::from(io::ErrorKind::PermissionDenied),
                IoOperation::NewSocket,
            ))
        });
        let err = Channel::<MockSocket>::connect(&config()).err();
        assert!(matches!(err, Some(Error::IoError(IoError::Other(..)))));
    }

    #[test]
    fn test_connect_payload_too_large() {
        let _m = MTX.lock();
        let ctx = MockSocket::open_icmpv4_context();
        ctx.expect().never();
        let config = ProbeConfig {
            payload: &[0; MAX_ECHO_REQUEST_SIZE],
            ..config()
        };
        let err = Channel::<MockSocket>::connect(&config).err();
        assert!(matches!(err, Some(Error::BadConfig(_))));
    }
}
