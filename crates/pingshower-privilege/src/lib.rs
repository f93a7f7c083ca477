//! Discover and manage the privileges required to open a raw `ICMP` socket.
//!
//! On Linux a raw socket requires `CAP_NET_RAW` in the effective capability
//! set.  A binary may be granted the capability in its permitted set (for
//! example with `setcap cap_net_raw+p`) in which case
//! [`Privilege::acquire_privileges`] raises it before the socket is opened
//! and [`Privilege::drop_privileges`] clears the effective set afterwards.
//! Raw sockets stay usable once privileges are dropped.
//!
//! On other Unix platforms raw sockets require the effective user to be root
//! and acquiring or dropping privileges does nothing.
//!
//! # Examples
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! # use pingshower_privilege::Privilege;
//! let privilege = Privilege::acquire_privileges()?;
//! if privilege.has_privileges() {
//!     println!("raw ICMP sockets are available");
//! }
//! Privilege::drop_privileges()?;
//! # Ok(())
//! # }
//! ```
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![forbid(unsafe_code)]

/// A privilege error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A privilege error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[cfg(target_os = "linux")]
    #[error("caps error: {0}")]
    CapsError(#[from] caps::errors::CapsError),
}

/// Whether the current process may open a raw `ICMP` socket.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Privilege {
    has_privileges: bool,
}

impl Privilege {
    /// Create a `Privilege` with a known state.
    #[must_use]
    pub const fn new(has_privileges: bool) -> Self {
        Self { has_privileges }
    }

    /// Inspect the privileges of the current process without changing them.
    pub fn discover() -> Result<Self> {
        platform::can_open_raw_socket().map(Self::new)
    }

    /// Raise whatever privileges the process is permitted and report the result.
    pub fn acquire_privileges() -> Result<Self> {
        platform::raise()?;
        Self::discover()
    }

    /// Give up all elevated privileges.
    pub fn drop_privileges() -> Result<()> {
        platform::lower()
    }

    #[must_use]
    pub const fn has_privileges(&self) -> bool {
        self.has_privileges
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use crate::Result;
    use caps::{CapSet, Capability};

    pub fn can_open_raw_socket() -> Result<bool> {
        Ok(caps::has_cap(None, CapSet::Effective, Capability::CAP_NET_RAW)?)
    }

    pub fn raise() -> Result<()> {
        if caps::has_cap(None, CapSet::Permitted, Capability::CAP_NET_RAW)? {
            caps::raise(None, CapSet::Effective, Capability::CAP_NET_RAW)?;
        }
        Ok(())
    }

    pub fn lower() -> Result<()> {
        Ok(caps::clear(None, CapSet::Effective)?)
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
#[allow(clippy::unnecessary_wraps)]
mod platform {
    use crate::Result;
    use nix::unistd::Uid;

    pub fn can_open_raw_socket() -> Result<bool> {
        Ok(Uid::effective().is_root())
    }

    pub fn raise() -> Result<()> {
        Ok(())
    }

    pub fn lower() -> Result<()> {
        Ok(())
    }
}
