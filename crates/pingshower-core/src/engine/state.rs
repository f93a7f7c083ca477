use crate::config::ProbeConfig;
use crate::probe::{EchoReply, Probe};
use crate::types::{Interval, Sequence, TraceId};
use std::time::{Duration, Instant};

/// The status of the most recently sent probe.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ProbeStatus {
    /// No probe has been sent yet.
    Idle,
    /// The probe has been sent and no reply has been matched.
    Awaiting,
    /// A reply was matched before the deadline.
    Replied,
    /// The deadline passed without a matching reply.
    TimedOut,
}

/// A round trip time measurement.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RttUpdate {
    pub timeout: bool,
    pub sequence: Sequence,
    pub rtt_ms: u64,
}

/// The loss ratio of a closed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossUpdate {
    /// The first sequence number of the window.
    pub sequence: Sequence,
    pub loss: f64,
}

/// The result of completing a probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub rtt: RttUpdate,
    /// Present if the probe closed a loss window.
    pub loss: Option<LossUpdate>,
}

/// The state of a probing session.
///
/// All time is passed in explicitly, this type performs no I/O.
#[derive(Debug, Clone)]
pub struct SessionState {
    identifier: TraceId,
    interval: Interval,
    probe_timeout_ms: u64,
    /// The sequence of the last probe sent, zero before the first.
    sequence: Sequence,
    /// The last probe sent.
    probe: Option<Probe>,
    status: ProbeStatus,
    /// Timeouts observed in the current window.
    timeouts_in_window: u64,
    /// The first sequence number of the current window.
    window_start: Sequence,
}

impl SessionState {
    #[must_use]
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            identifier: config.trace_identifier,
            interval: config.interval,
            probe_timeout_ms: config.probe_timeout_ms(),
            sequence: Sequence(0),
            probe: None,
            status: ProbeStatus::Idle,
            timeouts_in_window: 0,
            window_start: Sequence(1),
        }
    }

    /// Allocate the next probe, sent at `sent`.
    pub fn next_probe(&mut self, sent: Instant) -> Probe {
        self.sequence += Sequence(1);
        let probe = Probe::new(self.sequence, self.identifier, sent);
        self.probe = Some(probe);
        self.status = ProbeStatus::Awaiting;
        probe
    }

    /// Complete the outstanding probe with `reply`.
    ///
    /// Returns `None`, leaving the state unchanged, if no probe is awaiting a
    /// reply or if `reply` does not answer it.
    pub fn complete_probe(&mut self, reply: &EchoReply) -> Option<Outcome> {
        let probe = self.awaiting()?;
        if !probe.is_answered_by(reply) {
            return None;
        }
        self.status = ProbeStatus::Replied;
        let rtt = reply.received.saturating_duration_since(probe.sent);
        Some(self.close_probe(RttUpdate {
            timeout: false,
            sequence: probe.sequence,
            rtt_ms: as_millis(rtt),
        }))
    }

    /// Time out the outstanding probe.
    ///
    /// Returns `None` if no probe is awaiting a reply.
    pub fn timeout_probe(&mut self) -> Option<Outcome> {
        let probe = self.awaiting()?;
        self.status = ProbeStatus::TimedOut;
        self.timeouts_in_window += 1;
        Some(self.close_probe(RttUpdate {
            timeout: true,
            sequence: probe.sequence,
            rtt_ms: self.probe_timeout_ms,
        }))
    }

    #[must_use]
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    #[must_use]
    pub fn status(&self) -> ProbeStatus {
        self.status
    }

    #[must_use]
    pub fn timeouts_in_window(&self) -> u64 {
        self.timeouts_in_window
    }

    #[must_use]
    pub fn window_start(&self) -> Sequence {
        self.window_start
    }

    fn awaiting(&self) -> Option<Probe> {
        self.probe.filter(|_| self.status == ProbeStatus::Awaiting)
    }

    fn close_probe(&mut self, rtt: RttUpdate) -> Outcome {
        let loss = if rtt.sequence.closes_window(self.interval) {
            let loss = LossUpdate {
                sequence: self.window_start,
                loss: self.timeouts_in_window as f64 / self.interval.get() as f64,
            };
            self.timeouts_in_window = 0;
            self.window_start += Sequence(self.interval.get());
            Some(loss)
        } else {
            None
        };
        Outcome { rtt, loss }
    }
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use test_case::test_case;

    const IDENTIFIER: TraceId = TraceId(4242);

    fn state(interval: u64) -> SessionState {
        SessionState::new(&ProbeConfig {
            trace_identifier: IDENTIFIER,
            interval: Interval::new(interval).unwrap(),
            ..ProbeConfig::default()
        })
    }

    fn reply_to(probe: &Probe, after: Duration) -> EchoReply {
        reply(probe.identifier.0, probe.sequence.wire(), probe.sent + after)
    }

    fn reply(identifier: u16, sequence: u16, received: Instant) -> EchoReply {
        EchoReply {
            source: Ipv4Addr::new(10, 0, 0, 1),
            identifier,
            sequence,
            ttl: 64,
            bytes: 39,
            received,
        }
    }

    #[test]
    fn test_initial_state() {
        let state = state(10);
        assert_eq!(Sequence(0), state.sequence());
        assert_eq!(ProbeStatus::Idle, state.status());
        assert_eq!(Sequence(1), state.window_start());
        assert_eq!(0, state.timeouts_in_window());
    }

    #[test]
    fn test_sequence_incremented_before_send() {
        let mut state = state(10);
        let now = Instant::now();
        assert_eq!(Sequence(1), state.next_probe(now).sequence);
        assert_eq!(Sequence(2), state.next_probe(now).sequence);
        assert_eq!(IDENTIFIER, state.next_probe(now).identifier);
        assert_eq!(ProbeStatus::Awaiting, state.status());
    }

    #[test]
    fn test_reply_completes_probe() {
        let mut state = state(10);
        let probe = state.next_probe(Instant::now());
        let outcome = state.complete_probe(&reply_to(&probe, Duration::from_micros(12_900)));
        assert_eq!(
            Some(Outcome {
                rtt: RttUpdate {
                    timeout: false,
                    sequence: Sequence(1),
                    rtt_ms: 12,
                },
                loss: None,
            }),
            outcome
        );
        assert_eq!(ProbeStatus::Replied, state.status());
    }

    #[test]
    fn test_duplicate_reply_ignored() {
        let mut state = state(10);
        let probe = state.next_probe(Instant::now());
        let reply = reply_to(&probe, Duration::from_millis(5));
        assert!(state.complete_probe(&reply).is_some());
        assert_eq!(None, state.complete_probe(&reply));
        assert_eq!(None, state.timeout_probe());
        assert_eq!(ProbeStatus::Replied, state.status());
    }

    #[test_case(4243, 1; "foreign identifier")]
    #[test_case(4242, 0; "stale sequence")]
    #[test_case(4242, 2; "future sequence")]
    fn test_unmatched_reply_ignored(identifier: u16, sequence: u16) {
        let mut state = state(10);
        let probe = state.next_probe(Instant::now());
        let reply = reply(identifier, sequence, probe.sent);
        assert_eq!(None, state.complete_probe(&reply));
        assert_eq!(ProbeStatus::Awaiting, state.status());
    }

    #[test]
    fn test_reply_before_any_probe_ignored() {
        let mut state = state(10);
        assert_eq!(None, state.complete_probe(&reply(4242, 0, Instant::now())));
        assert_eq!(None, state.timeout_probe());
    }

    #[test]
    fn test_timeout_reports_probe_timeout() {
        let mut state = state(10);
        state.next_probe(Instant::now());
        let outcome = state.timeout_probe();
        assert_eq!(
            Some(Outcome {
                rtt: RttUpdate {
                    timeout: true,
                    sequence: Sequence(1),
                    rtt_ms: 2000,
                },
                loss: None,
            }),
            outcome
        );
        assert_eq!(ProbeStatus::TimedOut, state.status());
        assert_eq!(1, state.timeouts_in_window());
    }

    #[test]
    fn test_reply_after_timeout_ignored() {
        let mut state = state(10);
        let probe = state.next_probe(Instant::now());
        state.timeout_probe();
        let reply = reply_to(&probe, Duration::from_millis(2500));
        assert_eq!(None, state.complete_probe(&reply));
        assert_eq!(ProbeStatus::TimedOut, state.status());
    }

    #[test]
    fn test_wrapped_sequence_matches_low_bits() {
        let mut state = state(10);
        let now = Instant::now();
        for _ in 0..65_536 {
            state.next_probe(now);
            state.timeout_probe();
        }
        let probe = state.next_probe(now);
        assert_eq!(Sequence(65_537), probe.sequence);
        let outcome = state.complete_probe(&reply(4242, 1, now));
        assert_eq!(
            Some(Sequence(65_537)),
            outcome.map(|outcome| outcome.rtt.sequence)
        );
    }

    /// Timeouts on probes 1, 3 and 5 of a window of 5.
    #[test]
    fn test_loss_window() {
        let mut state = state(5);
        let now = Instant::now();
        let mut outcomes = Vec::new();
        for sequence in 1..=5 {
            let probe = state.next_probe(now);
            let outcome = if sequence % 2 == 1 {
                state.timeout_probe()
            } else {
                state.complete_probe(&reply_to(&probe, Duration::from_millis(20)))
            };
            outcomes.push(outcome.unwrap());
        }
        assert!(outcomes[..4].iter().all(|outcome| outcome.loss.is_none()));
        assert_eq!(
            Some(LossUpdate {
                sequence: Sequence(1),
                loss: 0.6,
            }),
            outcomes[4].loss
        );
        assert_eq!(
            RttUpdate {
                timeout: true,
                sequence: Sequence(5),
                rtt_ms: 2000,
            },
            outcomes[4].rtt
        );
        assert_eq!(0, state.timeouts_in_window());
        assert_eq!(Sequence(6), state.window_start());
    }

    #[test]
    fn test_consecutive_windows() {
        let mut state = state(2);
        let now = Instant::now();
        let mut losses = Vec::new();
        for _ in 0..6 {
            state.next_probe(now);
            if let Some(loss) = state.timeout_probe().and_then(|outcome| outcome.loss) {
                losses.push(loss);
            }
        }
        assert_eq!(
            vec![
                LossUpdate {
                    sequence: Sequence(1),
                    loss: 1.0
                },
                LossUpdate {
                    sequence: Sequence(3),
                    loss: 1.0
                },
                LossUpdate {
                    sequence: Sequence(5),
                    loss: 1.0
                },
            ],
            losses
        );
    }

    #[test]
    fn test_window_of_one() {
        let mut state = state(1);
        let probe = state.next_probe(Instant::now());
        let outcome = state.complete_probe(&reply_to(&probe, Duration::ZERO));
        assert_eq!(
            Some(LossUpdate {
                sequence: Sequence(1),
                loss: 0.0,
            }),
            outcome.and_then(|outcome| outcome.loss)
        );
        assert_eq!(Sequence(2), state.window_start());
    }
}
