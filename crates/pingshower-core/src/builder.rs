use crate::config::{ProbeConfig, MAX_ECHO_REQUEST_SIZE};
use crate::error::{Error, Result};
use crate::types::{Interval, TraceId};
use crate::PingClient;
use pingshower_packet::icmpv4::echo_request::EchoRequestPacket;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Build a ping client.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use pingshower_core::Builder;
/// use std::time::Duration;
///
/// let addr = std::net::Ipv4Addr::new(1, 2, 3, 4);
/// let client = Builder::new(addr)
///     .interval(5)
///     .min_send_interval(Duration::from_millis(500))
///     .build()?;
/// # Ok(())
/// # }
/// ```
///
/// # See Also
///
/// - [`PingClient`] - A continuous echo probe.
#[derive(Debug)]
pub struct Builder {
    target_addr: Ipv4Addr,
    trace_identifier: TraceId,
    interval: u64,
    probe_timeout: Duration,
    min_send_interval: Duration,
    read_timeout: Duration,
    payload: &'static [u8],
}

impl Default for Builder {
    fn default() -> Self {
        let config = ProbeConfig::default();
        Self {
            target_addr: config.target_addr,
            trace_identifier: config.trace_identifier,
            interval: config.interval.get(),
            probe_timeout: config.probe_timeout,
            min_send_interval: config.min_send_interval,
            read_timeout: config.read_timeout,
            payload: config.payload,
        }
    }
}

impl Builder {
    /// Build a ping client builder for a given target.
    #[must_use]
    pub fn new(target_addr: Ipv4Addr) -> Self {
        Self {
            target_addr,
            ..Default::default()
        }
    }

    /// Set the echo identifier.
    ///
    /// Defaults to an identifier derived from the process id.
    #[must_use]
    pub fn trace_identifier(self, trace_id: TraceId) -> Self {
        Self {
            trace_identifier: trace_id,
            ..self
        }
    }

    /// Set the number of probes in each loss window.
    ///
    /// Must be greater than zero.
    #[must_use]
    pub fn interval(self, interval: u64) -> Self {
        Self { interval, ..self }
    }

    /// Set how long to wait for an echo reply.
    #[must_use]
    pub fn probe_timeout(self, probe_timeout: Duration) -> Self {
        Self {
            probe_timeout,
            ..self
        }
    }

    /// Set the minimum time between two consecutive echo requests.
    #[must_use]
    pub fn min_send_interval(self, min_send_interval: Duration) -> Self {
        Self {
            min_send_interval,
            ..self
        }
    }

    /// Set the longest single wait on the socket.
    ///
    /// This bounds how long [`PingClient::stop`] waits for the network thread.
    #[must_use]
    pub fn read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..self
        }
    }

    /// Set the echo request payload.
    #[must_use]
    pub fn payload(self, payload: &'static [u8]) -> Self {
        Self { payload, ..self }
    }

    /// Build the [`PingClient`].
    ///
    /// The notification thread is started, the network is not touched until
    /// [`PingClient::start`] is called.
    pub fn build(self) -> Result<PingClient> {
        PingClient::from_config(self.config()?)
    }

    fn config(self) -> Result<ProbeConfig> {
        let interval = Interval::new(self.interval)
            .ok_or_else(|| Error::BadConfig(String::from("interval must be greater than 0")))?;
        if self.probe_timeout.is_zero() {
            return Err(Error::BadConfig(String::from(
                "probe_timeout must be greater than 0",
            )));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::BadConfig(String::from(
                "read_timeout must be greater than 0",
            )));
        }
        let request_size = EchoRequestPacket::minimum_packet_size() + self.payload.len();
        if request_size > MAX_ECHO_REQUEST_SIZE {
            return Err(Error::BadConfig(format!(
                "payload of {} bytes > {}",
                self.payload.len(),
                MAX_ECHO_REQUEST_SIZE - EchoRequestPacket::minimum_packet_size()
            )));
        }
        Ok(ProbeConfig {
            target_addr: self.target_addr,
            trace_identifier: self.trace_identifier,
            interval,
            probe_timeout: self.probe_timeout,
            min_send_interval: self.min_send_interval,
            read_timeout: self.read_timeout,
            payload: self.payload,
        })
    }
}
