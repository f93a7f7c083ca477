use derive_more::{Add, AddAssign};
use std::fmt::{Display, Formatter};
use std::num::NonZeroU64;

/// `Sequence` number newtype.
///
/// The engine counts probes with a 64 bit counter; only the low 16 bits are
/// carried on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Add, AddAssign)]
pub struct Sequence(pub u64);

impl Sequence {
    /// The sequence number as carried in the `ICMP` echo header.
    #[must_use]
    pub const fn wire(self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    /// Does this sequence close a loss window of the given size?
    #[must_use]
    pub const fn closes_window(self, interval: Interval) -> bool {
        self.0 % interval.get() == 0
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `TraceId` newtype, the `ICMP` echo identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct TraceId(pub u16);

/// The number of probes in a loss accounting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Interval(pub NonZeroU64);

impl Interval {
    /// Create an `Interval`, `None` if `probes` is zero.
    #[must_use]
    pub const fn new(probes: u64) -> Option<Self> {
        match NonZeroU64::new(probes) {
            Some(probes) => Some(Self(probes)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self(NonZeroU64::MIN.saturating_add(crate::defaults::DEFAULT_INTERVAL - 1))
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
