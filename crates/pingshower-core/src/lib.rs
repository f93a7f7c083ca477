//! Pingshower - a continuous `ICMPv4` echo probing library.
//!
//! A [`PingClient`] sends one echo request at a time to a single `IPv4`
//! destination, matches the echo reply, measures the round trip time and
//! accounts for packet loss over fixed size windows of probes.  Measurements
//! are delivered to registered [`Observer`]s on a dedicated notification
//! thread so that slow observers never delay network I/O.
//!
//! # Example
//!
//! The following example probes `1.1.1.1` and prints every measurement until
//! the client is stopped:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use pingshower_core::{Observer, PingClient};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl Observer for Printer {
//!     fn on_rtt_update(&self, timeout: bool, sequence: u64, rtt_ms: u64) {
//!         println!("seq={sequence} timeout={timeout} rtt={rtt_ms}ms");
//!     }
//!     fn on_packet_loss_update(&self, sequence: u64, loss: f64) {
//!         println!("seq={sequence} loss={loss}");
//!     }
//! }
//!
//! let client = PingClient::new("1.1.1.1", 10)?;
//! client.add_observer(Arc::new(Printer));
//! client.start()?;
//! std::thread::sleep(std::time::Duration::from_secs(30));
//! client.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! The [`Builder`] exposes the remaining probe settings:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use pingshower_core::{Builder, TraceId};
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//!
//! let client = Builder::new(Ipv4Addr::new(1, 1, 1, 1))
//!     .trace_identifier(TraceId(4242))
//!     .interval(20)
//!     .probe_timeout(Duration::from_millis(1500))
//!     .build()?;
//! client.start()?;
//! # Ok(())
//! # }
//! ```
//!
//! # See Also
//!
//! - [`Builder`] - Build a [`PingClient`].
//! - [`PingClient::start`] - Start probing on a background thread.
//! - [`PingClient::stop`] - Stop probing and flush pending notifications.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![deny(unsafe_code)]

mod builder;
mod client;
mod config;
mod dispatcher;
mod engine;
mod error;
mod net;
mod observer;
mod probe;
mod types;

pub mod resolve;

pub use builder::Builder;
pub use client::PingClient;
pub use config::{default_identifier, defaults, ProbeConfig};
pub use error::{Error, ErrorKind, IoError, IoOperation, IoResult, Result};
pub use observer::Observer;
pub use probe::{EchoReply, Probe};
pub use types::{Interval, Sequence, TraceId};
