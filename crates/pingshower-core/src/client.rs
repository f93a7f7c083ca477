use crate::config::ProbeConfig;
use crate::dispatcher::Dispatcher;
use crate::engine::{Engine, Event};
use crate::error::{Error, IoError, IoOperation, Result};
use crate::net::channel::Channel;
use crate::net::{Network, SocketImpl};
use crate::observer::Observer;
use crate::types::{Interval, TraceId};
use crate::{resolve, Builder};
use parking_lot::Mutex;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::instrument;

/// The name of the network I/O thread.
pub const IO_THREAD_NAME: &str = "pingshower-io";

/// A continuous `ICMPv4` echo probe of a single destination.
///
/// Network I/O runs on a background thread started by [`PingClient::start`]
/// and observers are notified on a second background thread, so a slow
/// observer never delays probing.
///
/// A `PingClient` is `Send` and `Sync`; share it in an [`Arc`] to stop it from
/// another thread, such as a signal handler.
pub struct PingClient {
    config: ProbeConfig,
    dispatcher: Arc<Dispatcher>,
    cancel: Arc<AtomicBool>,
    lifecycle: Mutex<Lifecycle>,
}

enum Lifecycle {
    Created,
    Running(JoinHandle<Result<()>>),
    Stopped,
}

impl PingClient {
    /// Create a client probing `destination` and reporting loss every `interval` probes.
    ///
    /// The destination may be a host name or an `IPv4` literal.
    pub fn new(destination: &str, interval: u64) -> Result<Self> {
        let target_addr = resolve::resolve_ipv4(destination)?;
        Builder::new(target_addr).interval(interval).build()
    }

    pub(crate) fn from_config(config: ProbeConfig) -> Result<Self> {
        Ok(Self {
            config,
            dispatcher: Arc::new(Dispatcher::start()?),
            cancel: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(Lifecycle::Created),
        })
    }

    /// Open the raw socket and start probing.
    ///
    /// The socket is opened on the calling thread, so a missing privilege is
    /// reported here.  A client may be started only once.
    pub fn start(&self) -> Result<()> {
        self.start_with(Channel::<SocketImpl>::connect)
    }

    #[instrument(skip_all, level = "trace")]
    fn start_with<N, C>(&self, connect: C) -> Result<()>
    where
        N: Network + Send + 'static,
        C: FnOnce(&ProbeConfig) -> Result<N>,
    {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Created => {}
            Lifecycle::Running(_) => return Err(Error::AlreadyStarted),
            Lifecycle::Stopped => return Err(Error::Stopped),
        }
        let network = connect(&self.config)?;
        let config = self.config;
        let cancel = Arc::clone(&self.cancel);
        let dispatcher = Arc::clone(&self.dispatcher);
        let handle = thread::Builder::new()
            .name(String::from(IO_THREAD_NAME))
            .spawn(move || run_engine(config, network, &cancel, &dispatcher))
            .map_err(|err| Error::IoError(IoError::Other(err, IoOperation::SpawnThread)))?;
        *lifecycle = Lifecycle::Running(handle);
        tracing::debug!(
            target_addr = %self.config.target_addr,
            identifier = self.config.trace_identifier.0,
            interval = %self.config.interval,
            "ping client started"
        );
        Ok(())
    }

    /// Stop probing.
    ///
    /// Every call, including concurrent ones, returns once the network thread
    /// has exited and every pending notification, including the final
    /// `on_stop`, has been delivered.  When called from an observer callback
    /// the remaining notifications are delivered after the callback returns.
    ///
    /// If probing ended because of a network error that error is returned by
    /// the first call.  Calling `stop` again, or before `start`, returns `Ok`.
    #[instrument(skip_all, level = "trace")]
    pub fn stop(&self) -> Result<()> {
        let result = {
            let mut lifecycle = self.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Created | Lifecycle::Stopped => Ok(()),
                Lifecycle::Running(handle) => {
                    self.cancel.store(true, Ordering::Release);
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(Error::Other(String::from("I/O thread panicked"))))
                }
            }
        };
        self.dispatcher.shutdown();
        tracing::debug!("ping client stopped");
        result
    }

    /// Register an observer.
    ///
    /// Registration takes effect after every notification already queued.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) {
        self.dispatcher.add(observer);
    }

    /// Unregister an observer.
    ///
    /// The observer still receives every notification queued before this call
    /// and none queued after it.
    pub fn remove_observer(&self, observer: &Arc<dyn Observer>) {
        self.dispatcher.remove(observer);
    }

    /// Is the observer registered?
    ///
    /// Blocks until all previously queued notifications have been delivered.
    /// Must not be called from an observer callback.
    #[must_use]
    pub fn has_observer(&self, observer: &Arc<dyn Observer>) -> bool {
        self.dispatcher.contains(observer)
    }

    #[must_use]
    pub fn target_addr(&self) -> Ipv4Addr {
        self.config.target_addr
    }

    #[must_use]
    pub fn identifier(&self) -> TraceId {
        self.config.trace_identifier
    }

    #[must_use]
    pub fn interval(&self) -> Interval {
        self.config.interval
    }

    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Is the network thread running?
    #[must_use]
    pub fn is_running(&self) -> bool {
        match &*self.lifecycle.lock() {
            Lifecycle::Running(handle) => !handle.is_finished(),
            Lifecycle::Created | Lifecycle::Stopped => false,
        }
    }
}

impl Drop for PingClient {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::debug!(%err, "error stopping dropped ping client");
        }
    }
}

/// The body of the network thread.
fn run_engine<N: Network>(
    config: ProbeConfig,
    network: N,
    cancel: &AtomicBool,
    dispatcher: &Dispatcher,
) -> Result<()> {
    let publish = |event: Event| match event {
        Event::Rtt(rtt) => dispatcher.post_rtt(rtt.timeout, rtt.sequence.0, rtt.rtt_ms),
        Event::Loss(loss) => dispatcher.post_loss(loss.sequence.0, loss.loss),
    };
    let result = Engine::new(config, network, publish).run(cancel);
    if let Err(err) = &result {
        tracing::error!(%err, "probing failed");
    }
    dispatcher.post_stop();
    result
}
