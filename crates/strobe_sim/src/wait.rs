//! Bounded polling on level-sensitive device outputs.
//!
//! A wait makes at most `budget` attempts. Each attempt drives the clock low,
//! evaluates, and samples the predicate *before* the rising edge: a flag that
//! the next edge would clear is still observed. The rising half of the cycle
//! is then completed whether or not the predicate held.

use tracing::debug;

use crate::clock::ClockDriver;
use crate::device::{Dut, DutOutputs};
use crate::error::{Timeout, WaitTarget};

impl<D: Dut> ClockDriver<D> {
    /// Polls `predicate` on the low phase of up to `budget` cycles.
    ///
    /// Returns the number of attempts made when the predicate held.
    pub fn poll_until<F>(
        &mut self,
        target: WaitTarget,
        budget: u32,
        mut predicate: F,
    ) -> Result<u32, Timeout>
    where
        F: FnMut(&DutOutputs) -> bool,
    {
        for attempt in 1..=budget {
            self.fall();
            let observed = predicate(self.outputs());
            self.rise();
            if observed {
                debug!(%target, attempt, time = %self.time(), "wait satisfied");
                return Ok(attempt);
            }
        }
        Err(Timeout { target, budget })
    }
}
