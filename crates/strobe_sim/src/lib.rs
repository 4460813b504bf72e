//! Cycle-accurate verification harness for clocked devices.
//!
//! This crate drives a device under test through a raw two-phase clock,
//! builds timeout-bounded waits and ready/valid handshakes on top of it, and
//! checks what the device produces against expected values. The device is
//! opaque: the harness only sees the signal contract in [`device`].
//!
//! # Architecture
//!
//! [`ClockDriver`] exclusively owns the device, the half-cycle sample counter
//! ([`SimTime`]) and the [`TraceSink`]. Every other primitive advances the
//! device through it, so the clock input is toggled in exactly one place and
//! each half-cycle leaves exactly one trace sample. [`Harness`] pairs the
//! driver with the [`Oracle`], which owns the pass/fail tally; exhausted waits
//! are tallied as failures without aborting the run.
//!
//! # Usage
//!
//! ```ignore
//! use strobe_sim::{Harness, HarnessConfig, TraceSink, Transfer};
//!
//! let mut h = Harness::new(dut, TraceSink::create(path)?, HarnessConfig::default());
//! h.reset();
//! Transfer::command(0x06).apply(h.inputs_mut());
//! h.start_transfer();
//! h.wait_status();
//! h.clear_status();
//! let report = h.finish()?;
//! std::process::exit(report.exit_code());
//! ```
//!
//! # Modules
//!
//! - `time` — Half-cycle sample counter
//! - `error` — Trace errors and wait timeouts
//! - `device` — Device signal contract and operation descriptors
//! - `waveform` — Waveform recording (VCD format)
//! - `trace` — Scoped change-only trace sink
//! - `clock` — Two-phase clock driver
//! - `wait` — Bounded polling on a device output, sampled before the rising edge
//! - `handshake` — Ready/valid push into TX and valid/ready pop from RX
//! - `strobe` — Single-cycle pulses and held strobes with settle time
//! - `oracle` — Exact-match checks and the result tally
//! - `harness` — Scenario-facing harness and run report

#![warn(missing_docs)]

pub mod clock;
pub mod device;
pub mod error;
mod handshake;
pub mod harness;
pub mod oracle;
mod strobe;
pub mod time;
pub mod trace;
mod wait;
pub mod waveform;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::ClockDriver;
pub use device::{
    Channel, DataMode, Direction, Dut, DutInputs, DutOutputs, PortId, PortInfo, Strobe, Transfer,
    PORTS,
};
pub use error::{SimError, Timeout, WaitTarget};
pub use harness::{Harness, HarnessConfig, Report};
pub use oracle::{Finding, Observed, Oracle, ResultTally};
pub use time::SimTime;
pub use trace::TraceSink;
pub use waveform::{VcdRecorder, WaveformRecorder};
