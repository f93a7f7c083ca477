use crate::config::ProbeConfig;
use crate::error::{Error, Result};
use crate::net::Network;
use crate::probe::EchoReply;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::instrument;

mod state;

pub use state::{LossUpdate, Outcome, RttUpdate, SessionState};

/// A measurement published by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Rtt(RttUpdate),
    Loss(LossUpdate),
}

/// The reply deadline of the outstanding probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeTimer {
    deadline: Option<Instant>,
}

impl ProbeTimer {
    pub fn arm(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn has_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// Sends one echo request at a time, waits for its reply or deadline and
/// publishes the resulting measurements.
pub struct Engine<N, F> {
    config: ProbeConfig,
    network: N,
    publish: F,
    state: SessionState,
    timer: ProbeTimer,
    /// The earliest time the next probe may be sent.
    next_send: Option<Instant>,
}

impl<N: Network, F: FnMut(Event)> Engine<N, F> {
    #[must_use]
    pub fn new(config: ProbeConfig, network: N, publish: F) -> Self {
        Self {
            state: SessionState::new(&config),
            config,
            network,
            publish,
            timer: ProbeTimer::default(),
            next_send: None,
        }
    }

    /// Probe until `cancel` is set or a network error occurs.
    ///
    /// On return the timer has been cancelled and the network closed.
    #[instrument(skip_all, level = "trace")]
    pub fn run(mut self, cancel: &AtomicBool) -> Result<()> {
        let result = self.probe_loop(cancel);
        self.timer.cancel();
        let closed = self.network.close();
        result.and(closed)
    }

    fn probe_loop(&mut self, cancel: &AtomicBool) -> Result<()> {
        while !cancel.load(Ordering::Acquire) {
            let now = Instant::now();
            if self.timer.has_expired(now) {
                self.on_timeout();
            } else if self.can_send(now) {
                self.send_probe(now)?;
            } else if let Some(reply) = self.network.recv_reply(self.wait_duration(now))? {
                if self.timer.has_expired(reply.received) {
                    self.on_timeout();
                }
                self.on_reply(&reply);
            }
        }
        tracing::debug!(
            sequence = %self.state.sequence(),
            status = ?self.state.status(),
            window_start = %self.state.window_start(),
            timeouts_in_window = self.state.timeouts_in_window(),
            "probe loop cancelled"
        );
        Ok(())
    }

    fn can_send(&self, now: Instant) -> bool {
        self.timer.deadline().is_none() && self.next_send.map_or(true, |next| now >= next)
    }

    /// How long to wait on the network before the next timer check.
    fn wait_duration(&self, now: Instant) -> Duration {
        self.timer
            .deadline()
            .or(self.next_send)
            .map_or(self.config.read_timeout, |until| {
                until.saturating_duration_since(now)
            })
            .min(self.config.read_timeout)
    }

    /// Send the next probe and arm its timer.
    ///
    /// A probe which fails to send because the destination is unreachable is
    /// left outstanding and concludes as a timeout.
    #[instrument(skip(self), level = "trace")]
    fn send_probe(&mut self, now: Instant) -> Result<()> {
        let probe = self.state.next_probe(now);
        tracing::debug!(?probe);
        match self.network.send_probe(probe) {
            Ok(()) => {}
            Err(Error::ProbeFailed(err)) => {
                tracing::warn!(%err, "failed to send icmp_seq={}", probe.sequence);
            }
            Err(err) => return Err(err),
        }
        self.timer.arm(now + self.config.probe_timeout);
        self.next_send = Some(now + self.config.min_send_interval);
        Ok(())
    }

    fn on_reply(&mut self, reply: &EchoReply) {
        match self.state.complete_probe(reply) {
            Some(outcome) => {
                self.timer.cancel();
                tracing::info!(
                    "{} bytes from {}: icmp_seq={}, ttl={}, time={} ms",
                    reply.bytes,
                    reply.source,
                    outcome.rtt.sequence,
                    reply.ttl,
                    outcome.rtt.rtt_ms
                );
                self.publish_outcome(outcome);
            }
            None => tracing::trace!(?reply, "ignoring unmatched echo reply"),
        }
    }

    fn on_timeout(&mut self) {
        self.timer.cancel();
        if let Some(outcome) = self.state.timeout_probe() {
            tracing::warn!("request timed out: icmp_seq={}", outcome.rtt.sequence);
            self.publish_outcome(outcome);
        }
    }

    fn publish_outcome(&mut self, outcome: Outcome) {
        (self.publish)(Event::Rtt(outcome.rtt));
        if let Some(loss) = outcome.loss {
            tracing::info!("{:.1}% packet loss", loss.loss * 100.0);
            (self.publish)(Event::Loss(loss));
        }
    }
}
