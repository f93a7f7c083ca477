use crate::types::{Interval, TraceId};
use std::net::Ipv4Addr;
use std::process;
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default number of probes in a loss window.
    pub const DEFAULT_INTERVAL: u64 = 10;

    /// The default time to wait for an echo reply.
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(2000);

    /// The default minimum time between two consecutive echo requests.
    pub const DEFAULT_MIN_SEND_INTERVAL: Duration = Duration::from_millis(1000);

    /// The default value for `read-timeout`.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

    /// The default echo request payload.
    pub const DEFAULT_PAYLOAD: &[u8] = b"\"Hello!\" from ping-shower ping.";
}

/// The maximum size of an echo request (header and payload) we allow.
pub const MAX_ECHO_REQUEST_SIZE: usize = 1024;

/// The echo identifier derived from the current process id.
#[must_use]
pub fn default_identifier() -> TraceId {
    TraceId((process::id() % u32::from(u16::MAX)) as u16)
}

/// Probe configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProbeConfig {
    pub target_addr: Ipv4Addr,
    pub trace_identifier: TraceId,
    pub interval: Interval,
    pub probe_timeout: Duration,
    pub min_send_interval: Duration,
    pub read_timeout: Duration,
    pub payload: &'static [u8],
}

impl ProbeConfig {
    /// The probe timeout in whole milliseconds.
    #[must_use]
    pub fn probe_timeout_ms(&self) -> u64 {
        u64::try_from(self.probe_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target_addr: Ipv4Addr::UNSPECIFIED,
            trace_identifier: default_identifier(),
            interval: Interval::default(),
            probe_timeout: defaults::DEFAULT_PROBE_TIMEOUT,
            min_send_interval: defaults::DEFAULT_MIN_SEND_INTERVAL,
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
            payload: defaults::DEFAULT_PAYLOAD,
        }
    }
}
