use itertools::Itertools;
use parking_lot::Mutex;
use pingshower_core::Observer;
use std::fmt::{Display, Formatter};

/// A single concluded probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub sequence: u64,
    pub rtt_ms: u64,
    pub timeout: bool,
}

/// The loss reported for one window of probes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossWindow {
    /// The sequence number of the first probe in the window.
    pub sequence: u64,
    pub loss: f64,
}

/// Everything recorded so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    pub samples: Vec<Sample>,
    pub losses: Vec<LossWindow>,
    pub finished: bool,
}

/// Record every measurement for an end of run summary.
#[derive(Debug, Default)]
pub struct Recorder {
    recording: Mutex<Recording>,
}

impl Recorder {
    /// A copy of everything recorded so far.
    pub fn snapshot(&self) -> Recording {
        self.recording.lock().clone()
    }
}

impl Observer for Recorder {
    fn on_rtt_update(&self, timeout: bool, sequence: u64, rtt_ms: u64) {
        self.recording.lock().samples.push(Sample {
            sequence,
            rtt_ms,
            timeout,
        });
    }

    fn on_packet_loss_update(&self, sequence: u64, loss: f64) {
        self.recording
            .lock()
            .losses
            .push(LossWindow { sequence, loss });
    }

    fn on_stop(&self) {
        self.recording.lock().finished = true;
    }
}

/// Aggregate statistics over a [`Recording`].
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub target: String,
    pub sent: usize,
    pub received: usize,
    pub timeouts: usize,
    pub min_rtt_ms: Option<u64>,
    pub avg_rtt_ms: Option<f64>,
    pub max_rtt_ms: Option<u64>,
    pub losses: Vec<LossWindow>,
}

impl Summary {
    pub fn new(target: &str, recording: &Recording) -> Self {
        let (timeouts, replies): (Vec<&Sample>, Vec<&Sample>) =
            recording.samples.iter().partition(|sample| sample.timeout);
        let rtts = replies.iter().map(|sample| sample.rtt_ms).collect_vec();
        let avg_rtt_ms = if rtts.is_empty() {
            None
        } else {
            Some(rtts.iter().sum::<u64>() as f64 / rtts.len() as f64)
        };
        Self {
            target: String::from(target),
            sent: recording.samples.len(),
            received: replies.len(),
            timeouts: timeouts.len(),
            min_rtt_ms: rtts.iter().min().copied(),
            avg_rtt_ms,
            max_rtt_ms: rtts.iter().max().copied(),
            losses: recording.losses.clone(),
        }
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--- {} ping summary ---", self.target)?;
        writeln!(
            f,
            "{} probes sent, {} received, {} timed out",
            self.sent, self.received, self.timeouts
        )?;
        match (self.min_rtt_ms, self.avg_rtt_ms, self.max_rtt_ms) {
            (Some(min), Some(avg), Some(max)) => {
                writeln!(f, "rtt min/avg/max = {min}/{avg:.1}/{max} ms")?;
            }
            _ => writeln!(f, "rtt min/avg/max = -/-/- ms")?,
        }
        for window in &self.losses {
            writeln!(
                f,
                "loss from seq={}: {:.1}%",
                window.sequence,
                window.loss * 100_f64
            )?;
        }
        Ok(())
    }
}
