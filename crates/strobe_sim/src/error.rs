//! Error types for the harness.
//!
//! [`SimError`] covers infrastructure faults (trace output, misuse of the
//! recorder). [`Timeout`] is the run-level failure returned by bounded waits;
//! it is a value the caller may inspect, never a reason to abort a run.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

use crate::device::PortId;

/// Errors that can occur while recording or closing a trace.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),

    /// A value change referenced a port that was never registered.
    #[error("unregistered trace port {0}")]
    UnregisteredPort(PortId),

    /// The trace was already closed when a sample was recorded.
    #[error("trace already closed at sample {sample}")]
    TraceClosed {
        /// Sample index of the rejected record.
        sample: u64,
    },
}

/// The device output a bounded wait was polling for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitTarget {
    /// The operation-complete status flag.
    Status,
    /// The transmit FIFO accepting a word.
    TxReady,
    /// The receive FIFO offering a word.
    RxValid,
    /// The busy flag dropping.
    Idle,
}

impl fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitTarget::Status => "status",
            WaitTarget::TxReady => "tx_ready",
            WaitTarget::RxValid => "rx_valid",
            WaitTarget::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// A bounded wait exhausted its attempt budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{target} never asserted within {budget} cycles")]
pub struct Timeout {
    /// What the wait was polling for.
    pub target: WaitTarget,
    /// The attempt budget that was exhausted.
    pub budget: u32,
}
