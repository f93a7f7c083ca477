use crate::error::IoResult as Result;
use std::net::SocketAddr;
use std::time::Duration;

#[cfg_attr(test, mockall::automock)]
pub trait Socket
where
    Self: Sized,
{
    /// Open a raw `IPv4` socket for sending and receiving `ICMP`.
    fn open_icmpv4() -> Result<Self>;
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> Result<()>;
    /// Receive a single datagram into `buf`, waiting no longer than `timeout`.
    ///
    /// Returns the number of bytes received, or `None` if nothing arrived in time.
    fn recv_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>>;
    fn shutdown(&mut self) -> Result<()>;
}

#[cfg(test)]
pub mod tests {
    /// A `recv_timeout` implementation which delivers `$packet`.
    #[macro_export]
    macro_rules! mocket_recv {
        ($packet: expr) => {
            move |buf: &mut [u8], _timeout: Duration| -> IoResult<Option<usize>> {
                buf[..$packet.len()].copy_from_slice(&$packet);
                Ok(Some($packet.len()))
            }
        };
    }
}
