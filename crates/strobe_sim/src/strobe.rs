//! Pulse and level control of strobe inputs.

use tracing::trace;

use crate::clock::ClockDriver;
use crate::device::{Dut, Strobe};

impl<D: Dut> ClockDriver<D> {
    /// Asserts `strobe` for exactly one cycle.
    pub fn pulse(&mut self, strobe: Strobe) {
        self.hold(strobe, 1, 0);
    }

    /// Asserts `strobe` for `hold` cycles, releases it, then idles `settle` cycles.
    pub fn hold(&mut self, strobe: Strobe, hold: u32, settle: u32) {
        trace!(?strobe, hold, settle, "strobe");
        *self.inputs_mut().strobe_mut(strobe) = true;
        self.tick(hold);
        *self.inputs_mut().strobe_mut(strobe) = false;
        self.tick(settle);
    }
}
