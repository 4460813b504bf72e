//! The two-phase clock driver.
//!
//! [`ClockDriver`] exclusively owns the device, the simulation clock and the
//! trace sink. Every other primitive advances the device through it, so the
//! clock input only ever changes here and every half-cycle leaves exactly
//! one trace sample behind.

use tracing::error;

use crate::device::{snapshot, Dut, DutInputs, DutOutputs};
use crate::error::SimError;
use crate::time::SimTime;
use crate::trace::TraceSink;

/// Drives a device one half-cycle at a time.
pub struct ClockDriver<D: Dut> {
    dut: D,
    time: SimTime,
    trace: TraceSink,
    trace_error: Option<SimError>,
}

impl<D: Dut> ClockDriver<D> {
    /// Takes ownership of `dut` and records its samples into `trace`.
    pub fn new(dut: D, trace: TraceSink) -> Self {
        Self {
            dut,
            time: SimTime::ZERO,
            trace,
            trace_error: None,
        }
    }

    /// The next sample index to be recorded.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Number of samples accepted by the trace sink.
    pub fn samples(&self) -> u64 {
        self.trace.samples()
    }

    /// Read access to the device.
    pub fn dut(&self) -> &D {
        &self.dut
    }

    /// Device inputs for modification. The clock level is not among them.
    pub fn inputs_mut(&mut self) -> &mut DutInputs {
        self.dut.inputs_mut()
    }

    /// Outputs from the most recent evaluation.
    pub fn outputs(&self) -> &DutOutputs {
        self.dut.outputs()
    }

    /// Advances `cycles` full clock cycles: low, eval, sample; high, eval, sample.
    pub fn tick(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.fall();
            self.rise();
        }
    }

    /// Low phase of a cycle.
    pub(crate) fn fall(&mut self) {
        self.half_cycle(false);
    }

    /// High phase of a cycle; registered device state commits here.
    pub(crate) fn rise(&mut self) {
        self.half_cycle(true);
    }

    fn half_cycle(&mut self, level: bool) {
        self.dut.inputs_mut().set_clk(level);
        self.dut.eval();
        self.sample();
    }

    fn sample(&mut self) {
        let values = snapshot(self.dut.inputs(), self.dut.outputs());
        if let Err(err) = self.trace.record(self.time, values) {
            if self.trace_error.is_none() {
                error!(%err, time = %self.time, "trace disabled for the rest of the run");
                self.trace_error = Some(err);
            }
        }
        self.time = self.time.next();
    }

    /// Finalizes the device and closes the trace.
    ///
    /// Returns the first trace failure seen during the run, if any.
    pub(crate) fn shutdown(&mut self) -> Result<(), SimError> {
        self.dut.finalize();
        let closed = self.trace.close();
        match self.trace_error.take() {
            Some(err) => Err(err),
            None => closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDut;
    use proptest::prelude::*;

    fn driver() -> ClockDriver<ScriptedDut> {
        ClockDriver::new(ScriptedDut::new(), TraceSink::disabled())
    }

    #[test]
    fn starts_at_zero() {
        let clock = driver();
        assert_eq!(clock.time(), SimTime::ZERO);
        assert_eq!(clock.samples(), 0);
    }

    #[test]
    fn tick_ends_on_high_phase() {
        let mut clock = driver();
        clock.tick(1);
        assert!(clock.dut().inputs().clk());
        assert_eq!(clock.dut().rising_edges(), 1);
    }

    #[test]
    fn tick_zero_is_a_no_op() {
        let mut clock = driver();
        clock.tick(0);
        assert_eq!(clock.time(), SimTime::ZERO);
        assert_eq!(clock.dut().evaluations(), 0);
    }

    #[test]
    fn every_half_cycle_evaluates_once() {
        let mut clock = driver();
        clock.tick(5);
        assert_eq!(clock.dut().evaluations(), 10);
        assert_eq!(clock.dut().rising_edges(), 5);
    }

    #[test]
    fn trace_failure_is_reported_at_shutdown() {
        use crate::device::PortId;
        use crate::waveform::WaveformRecorder;

        struct Broken;
        impl WaveformRecorder for Broken {
            fn register_signal(&mut self, _: PortId, _: &str, _: u32) -> Result<(), SimError> {
                Ok(())
            }
            fn begin_scope(&mut self, _: &str) -> Result<(), SimError> {
                Ok(())
            }
            fn end_scope(&mut self) -> Result<(), SimError> {
                Ok(())
            }
            fn record_change(&mut self, _: SimTime, id: PortId, _: u64) -> Result<(), SimError> {
                Err(SimError::UnregisteredPort(id))
            }
            fn finalize(&mut self) -> Result<(), SimError> {
                Ok(())
            }
        }

        let sink = TraceSink::with_recorder(Box::new(Broken)).unwrap();
        let mut clock = ClockDriver::new(ScriptedDut::new(), sink);
        clock.tick(3);
        assert_eq!(clock.samples(), 6);
        let err = clock.shutdown().unwrap_err();
        assert!(matches!(err, SimError::UnregisteredPort(_)));
    }

    #[test]
    fn shutdown_finalizes_the_device() {
        let mut clock = driver();
        clock.tick(2);
        clock.shutdown().unwrap();
        assert!(clock.dut().finalized());
    }

    proptest! {
        #[test]
        fn tick_records_two_samples_per_cycle(n in 0u32..500) {
            let mut clock = driver();
            clock.tick(n);
            prop_assert_eq!(clock.samples(), 2 * u64::from(n));
            prop_assert_eq!(clock.time().samples(), 2 * u64::from(n));
        }

        #[test]
        fn ticks_accumulate(a in 0u32..100, b in 0u32..100) {
            let mut clock = driver();
            clock.tick(a);
            let mid = clock.time();
            clock.tick(b);
            prop_assert_eq!(clock.time().since(mid), 2 * u64::from(b));
        }
    }
}
