use crate::error::{ErrorKind, IoError, IoOperation, IoResult};
use crate::net::socket::Socket;
use itertools::Itertools;
use nix::errno::Errno;
use socket2::{Domain, Protocol, SockAddr, Type};
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr};
use std::time::Duration;
use tracing::instrument;

/// The kernel rejects a zero receive timeout, so shorter waits are rounded up.
const MIN_RECV_TIMEOUT: Duration = Duration::from_millis(1);

/// The kernel receive buffer size to request.
///
/// A raw `ICMP` socket sees every `ICMP` datagram delivered to the host.
const RECV_BUFFER_SIZE: usize = 256 * 1024;

/// A blocking raw socket with reads bounded by `SO_RCVTIMEO`.
pub struct SocketImpl {
    inner: socket2::Socket,
    /// The receive timeout last applied to `inner`.
    recv_timeout: Option<Duration>,
}

impl SocketImpl {
    fn wait_at_most(&mut self, timeout: Duration) -> IoResult<()> {
        let timeout = timeout.max(MIN_RECV_TIMEOUT);
        if self.recv_timeout != Some(timeout) {
            self.inner
                .set_read_timeout(Some(timeout))
                .map_err(|err| IoError::Other(err, IoOperation::SetTimeout))?;
            self.recv_timeout = Some(timeout);
        }
        Ok(())
    }
}

impl Socket for SocketImpl {
    #[instrument(level = "trace")]
    fn open_icmpv4() -> IoResult<Self> {
        let inner = socket2::Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .map_err(|err| IoError::Other(err, IoOperation::NewSocket))?;
        if let Err(err) = inner.set_recv_buffer_size(RECV_BUFFER_SIZE) {
            tracing::debug!(%err, "using default receive buffer size");
        }
        Ok(Self {
            inner,
            recv_timeout: None,
        })
    }

    #[instrument(skip(self, buf), level = "trace")]
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> IoResult<()> {
        let sent = self
            .inner
            .send_to(buf, &SockAddr::from(addr))
            .map_err(|err| IoError::SendTo(err, addr))?;
        tracing::trace!(sent, buf = format!("{:02x}", buf.iter().format(" ")));
        Ok(())
    }

    #[instrument(skip(self, buf), level = "trace")]
    fn recv_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> IoResult<Option<usize>> {
        self.wait_at_most(timeout)?;
        match self.inner.read(buf) {
            Ok(received) => {
                tracing::trace!(
                    received,
                    buf = format!("{:02x}", buf[..received].iter().format(" "))
                );
                Ok(Some(received))
            }
            Err(err) if is_timeout(&err) => Ok(None),
            Err(err) => Err(IoError::Other(err, IoOperation::Read)),
        }
    }

    #[instrument(skip(self), level = "trace")]
    fn shutdown(&mut self) -> IoResult<()> {
        self.inner
            .shutdown(Shutdown::Both)
            .map_err(|err| IoError::Other(err, IoOperation::Shutdown))
    }
}

/// Did a read end without data because the receive timeout elapsed or a
/// signal interrupted it?
fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

impl From<&io::Error> for ErrorKind {
    fn from(err: &io::Error) -> Self {
        match err.raw_os_error().map(Errno::from_raw) {
            Some(Errno::EHOSTUNREACH) => Self::HostUnreachable,
            Some(Errno::ENETUNREACH) => Self::NetUnreachable,
            _ => Self::Std(err.kind()),
        }
    }
}
