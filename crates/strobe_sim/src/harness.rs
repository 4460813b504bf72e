//! The scenario-facing harness.
//!
//! [`Harness`] pairs a [`ClockDriver`] with the [`Oracle`] so that every
//! bounded wait that runs out of attempts is tallied as a failure at the
//! point where it happens. A run ends with [`Harness::finish`], which idles
//! the device, closes the trace and hands back the [`Report`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::ClockDriver;
use crate::device::{Channel, Dut, DutInputs, DutOutputs, Strobe, DEFAULT_PRESCALER};
use crate::error::{SimError, Timeout, WaitTarget};
use crate::oracle::{Finding, Oracle, ResultTally};
use crate::time::SimTime;
use crate::trace::TraceSink;

/// Budgets and fixed cycle counts used by the harness primitives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Attempts allowed to the status wait.
    pub status_budget: u32,
    /// Cycles a push may wait for `tx_ready`.
    pub push_budget: u32,
    /// Cycles a pop may wait for `rx_valid`.
    pub pop_budget: u32,
    /// Idle cycles after the status-clear pulse.
    pub clear_settle_cycles: u32,
    /// Cycles a flush strobe is held.
    pub flush_hold_cycles: u32,
    /// Idle cycles after a flush strobe is released.
    pub flush_settle_cycles: u32,
    /// Cycles reset is held asserted.
    pub reset_assert_cycles: u32,
    /// Cycles idled after reset is released.
    pub reset_release_cycles: u32,
    /// Idle cycles before the trace is closed.
    pub tail_cycles: u32,
    /// Prescaler restored with the other operation inputs.
    pub prescaler: u8,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            status_budget: 50_000,
            push_budget: 1_000,
            pop_budget: 2_000,
            clear_settle_cycles: 2,
            flush_hold_cycles: 2,
            flush_settle_cycles: 2,
            reset_assert_cycles: 10,
            reset_release_cycles: 10,
            tail_cycles: 20,
            prescaler: DEFAULT_PRESCALER,
        }
    }
}

/// Outcome of a finished run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Final pass/fail counters.
    pub tally: ResultTally,
    /// Every finding, in the order it was recorded.
    pub findings: Vec<Finding>,
    /// Simulation time when the run ended.
    pub final_time: SimTime,
    /// Trace samples taken during the run.
    pub samples: u64,
}

impl Report {
    /// Process exit code: 0 iff nothing failed.
    pub fn exit_code(&self) -> i32 {
        self.tally.exit_code()
    }
}

/// Drives one device through a verification run.
pub struct Harness<D: Dut> {
    clock: ClockDriver<D>,
    oracle: Oracle,
    config: HarnessConfig,
}

impl<D: Dut> Harness<D> {
    /// Takes ownership of the device and the trace sink for the whole run.
    pub fn new(dut: D, trace: TraceSink, config: HarnessConfig) -> Self {
        Self {
            clock: ClockDriver::new(dut, trace),
            oracle: Oracle::new(),
            config,
        }
    }

    /// The budgets this harness was built with.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Advances `cycles` full clock cycles.
    pub fn tick(&mut self, cycles: u32) {
        self.clock.tick(cycles);
    }

    /// The next sample index.
    pub fn time(&self) -> SimTime {
        self.clock.time()
    }

    /// Read access to the device.
    pub fn dut(&self) -> &D {
        self.clock.dut()
    }

    /// Device inputs for direct configuration.
    pub fn inputs_mut(&mut self) -> &mut DutInputs {
        self.clock.inputs_mut()
    }

    /// Outputs from the most recent evaluation.
    pub fn outputs(&self) -> &DutOutputs {
        self.clock.outputs()
    }

    /// Returns every operation input to idle, with the configured prescaler.
    pub fn restore_defaults(&mut self) {
        let prescaler = self.config.prescaler;
        let inputs = self.clock.inputs_mut();
        inputs.restore_defaults();
        inputs.prescaler = prescaler;
    }

    /// Holds reset, releases it, and lets the device settle.
    pub fn reset(&mut self) {
        self.restore_defaults();
        self.clock.inputs_mut().rstn = false;
        self.clock.tick(self.config.reset_assert_cycles);
        self.clock.inputs_mut().rstn = true;
        self.clock.tick(self.config.reset_release_cycles);
        debug!(time = %self.time(), "reset released");
    }

    /// Waits for the status flag with the configured budget.
    ///
    /// Returns whether the flag was observed; a timeout is already tallied.
    pub fn wait_status(&mut self) -> bool {
        self.wait_status_within(self.config.status_budget)
    }

    /// Waits for the status flag for at most `budget` cycles.
    pub fn wait_status_within(&mut self, budget: u32) -> bool {
        self.wait_until(WaitTarget::Status, budget, |o| o.status).is_ok()
    }

    /// Waits for `busy` to drop, using the status budget.
    pub fn wait_idle(&mut self) -> bool {
        self.wait_idle_within(self.config.status_budget)
    }

    /// Waits at most `budget` cycles for `busy` to drop.
    pub fn wait_idle_within(&mut self, budget: u32) -> bool {
        self.wait_until(WaitTarget::Idle, budget, |o| !o.busy).is_ok()
    }

    /// Polls an arbitrary output condition on the low phase of each cycle.
    ///
    /// A timeout is recorded as a failure before it is returned.
    pub fn wait_until<F>(
        &mut self,
        target: WaitTarget,
        budget: u32,
        predicate: F,
    ) -> Result<u32, Timeout>
    where
        F: FnMut(&DutOutputs) -> bool,
    {
        let outcome = self.clock.poll_until(target, budget, predicate);
        self.tally_timeout(outcome)
    }

    /// Pushes one word with the configured budget. Returns whether it was accepted.
    pub fn push_tx(&mut self, word: u32) -> bool {
        self.push_tx_within(word, self.config.push_budget)
    }

    /// Pushes one word, waiting at most `budget` cycles for `tx_ready`.
    pub fn push_tx_within(&mut self, word: u32, budget: u32) -> bool {
        let outcome = self.clock.push_word(word, budget);
        self.tally_timeout(outcome).is_ok()
    }

    /// Pops one word with the configured budget.
    pub fn pop_rx(&mut self) -> Result<u32, Timeout> {
        self.pop_rx_within(self.config.pop_budget)
    }

    /// Pops one word, waiting at most `budget` cycles for `rx_valid`.
    pub fn pop_rx_within(&mut self, budget: u32) -> Result<u32, Timeout> {
        let outcome = self.clock.pop_word(budget);
        self.tally_timeout(outcome)
    }

    fn tally_timeout<T>(&mut self, outcome: Result<T, Timeout>) -> Result<T, Timeout> {
        if let Err(timeout) = &outcome {
            self.oracle.record_timeout(self.clock.time(), *timeout);
        }
        outcome
    }

    /// Asserts `strobe` for exactly one cycle.
    pub fn pulse(&mut self, strobe: Strobe) {
        self.clock.pulse(strobe);
    }

    /// Pulses `strobe`, then idles `settle` cycles.
    pub fn pulse_and_settle(&mut self, strobe: Strobe, settle: u32) {
        self.clock.hold(strobe, 1, settle);
    }

    /// Holds `strobe` for `hold` cycles, then idles `settle` cycles.
    pub fn hold(&mut self, strobe: Strobe, hold: u32, settle: u32) {
        self.clock.hold(strobe, hold, settle);
    }

    /// Starts the operation currently on the descriptor inputs.
    pub fn start_transfer(&mut self) {
        self.pulse(Strobe::Start);
    }

    /// Clears the sticky status flag and lets it settle.
    pub fn clear_status(&mut self) {
        self.pulse_and_settle(Strobe::ClearStatus, self.config.clear_settle_cycles);
    }

    /// Empties one FIFO.
    pub fn flush(&mut self, channel: Channel) {
        self.hold(
            channel.flush_strobe(),
            self.config.flush_hold_cycles,
            self.config.flush_settle_cycles,
        );
    }

    /// Checks two words for equality.
    pub fn check(&mut self, name: &str, actual: u32, expected: u32) -> bool {
        self.oracle.check(self.clock.time(), name, actual, expected)
    }

    /// Checks two flags for equality.
    pub fn check_bool(&mut self, name: &str, actual: bool, expected: bool) -> bool {
        self.oracle.check_bool(self.clock.time(), name, actual, expected)
    }

    /// Current pass/fail counters.
    pub fn tally(&self) -> ResultTally {
        self.oracle.tally()
    }

    /// Findings recorded so far.
    pub fn findings(&self) -> &[Finding] {
        self.oracle.findings()
    }

    /// Idles the tail period, closes the trace and produces the report.
    ///
    /// A trace failure anywhere in the run is returned here; it never
    /// changes the tally.
    pub fn finish(mut self) -> Result<Report, SimError> {
        self.clock.tick(self.config.tail_cycles);
        self.clock.shutdown()?;
        let final_time = self.clock.time();
        let samples = self.clock.samples();
        let (tally, findings) = self.oracle.into_parts();
        Ok(Report {
            tally,
            findings,
            final_time,
            samples,
        })
    }
}
