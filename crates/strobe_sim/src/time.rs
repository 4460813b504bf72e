//! Virtual simulation time measured in half-cycle samples.
//!
//! [`SimTime`] is the sample counter owned by the clock driver. Every clock
//! transition records exactly one trace sample and advances the counter by
//! one, so a full clock cycle spans two ticks of [`SimTime`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trace samples recorded per full clock cycle (one per phase).
pub const SAMPLES_PER_CYCLE: u64 = 2;

/// A point in simulation time, counted in half-cycle samples.
///
/// The counter is monotonically increasing and never reset during a run.
/// Ordering follows the sample index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// The first sample of a run.
    pub const ZERO: SimTime = SimTime(0);

    /// Creates a time point from a raw sample index.
    pub fn from_samples(samples: u64) -> Self {
        Self(samples)
    }

    /// Creates the time point reached after `cycles` full clock cycles.
    pub fn from_cycles(cycles: u64) -> Self {
        Self(cycles * SAMPLES_PER_CYCLE)
    }

    /// Returns the raw sample index.
    pub fn samples(self) -> u64 {
        self.0
    }

    /// Returns the number of completed full clock cycles (truncated).
    pub fn cycles(self) -> u64 {
        self.0 / SAMPLES_PER_CYCLE
    }

    /// Returns the sample immediately after this one.
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the number of samples elapsed since `earlier`.
    pub fn since(self, earlier: SimTime) -> u64 {
        debug_assert!(
            self >= earlier,
            "time went backwards: {} -> {}",
            earlier.0,
            self.0
        );
        self.0 - earlier.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle {}", self.cycles())?;
        if self.0 % SAMPLES_PER_CYCLE != 0 {
            write!(f, ".5")?;
        }
        Ok(())
    }
}
