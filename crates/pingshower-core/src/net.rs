use crate::error::Result;
use crate::probe::{EchoReply, Probe};
use std::time::Duration;

/// Platform specific network code.
mod platform;

/// A network socket.
mod socket;

/// A channel for sending echo requests and receiving echo replies.
pub mod channel;

/// The platform specific socket type.
pub use platform::SocketImpl;

/// An abstraction over the network for echo probing.
#[cfg_attr(test, mockall::automock)]
pub trait Network {
    /// Send a `Probe`.
    fn send_probe(&mut self, probe: Probe) -> Result<()>;

    /// Wait up to `timeout` for the next `ICMP` datagram and return it as an `EchoReply`.
    ///
    /// Returns `None` if the wait times out or the datagram read is not an echo reply.
    fn recv_reply(&mut self, timeout: Duration) -> Result<Option<EchoReply>>;

    /// Shut down and release the underlying socket.
    ///
    /// Any later call to `send_probe` or `recv_reply` fails with `Error::SocketClosed`.
    fn close(&mut self) -> Result<()>;
}
