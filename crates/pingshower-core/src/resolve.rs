//! Destination resolution.

use crate::error::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};
use tracing::instrument;

/// Resolve `host` to the `IPv4` address to probe.
///
/// An `IPv4` literal is returned as is.  Otherwise the host is looked up with
/// the system resolver and the first `IPv4` address returned is used.
///
/// # Examples
///
/// ```
/// # fn main() -> anyhow::Result<()> {
/// use pingshower_core::resolve::resolve_ipv4;
/// use std::net::Ipv4Addr;
///
/// assert_eq!(Ipv4Addr::new(192, 0, 2, 1), resolve_ipv4("192.0.2.1")?);
/// assert!(resolve_ipv4("2001:db8::1").is_err());
/// # Ok(())
/// # }
/// ```
#[instrument(level = "trace")]
pub fn resolve_ipv4(host: &str) -> Result<Ipv4Addr> {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => return Ok(addr),
        Ok(addr @ IpAddr::V6(_)) => return Err(Error::UnsupportedAddress(addr)),
        Err(_) => {}
    }
    let addrs = dns_lookup::lookup_host(host).map_err(|err| {
        tracing::debug!(host, %err, "lookup failed");
        Error::UnresolvableHost(String::from(host))
    })?;
    tracing::debug!(host, ?addrs);
    addrs
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(addr) => Some(addr),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| Error::UnresolvableHost(String::from(host)))
}
