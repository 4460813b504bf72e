//! Scripted device for harness timing tests.
//!
//! [`ScriptedDut`] is a loopback FIFO: words pushed on the transmit side come
//! back out of the receive side. Status and readiness follow a script keyed
//! on the number of rising edges seen since construction.

use std::collections::VecDeque;

use crate::device::{Dut, DutInputs, DutOutputs};

/// When the status output is asserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusScript {
    /// Never asserted.
    Never,
    /// Asserted from the given rising edge on, until cleared by `clr_status`.
    From(u64),
    /// Asserted only during the low phase that follows the given rising edge.
    LowPhaseAfter(u64),
}

/// Test device with a scripted response.
pub struct ScriptedDut {
    inputs: DutInputs,
    outputs: DutOutputs,
    prev_clk: bool,
    edges: u64,
    evaluations: u64,
    finalized: bool,
    queue: VecDeque<u32>,
    capacity: usize,
    status: StatusScript,
    status_cleared: bool,
    tx_ready_from: u64,
    rx_valid_from: u64,
    busy_until: u64,
}

impl ScriptedDut {
    /// Always-ready loopback with room for eight words and no status.
    pub fn new() -> Self {
        let mut dut = Self {
            inputs: DutInputs::default(),
            outputs: DutOutputs::default(),
            prev_clk: false,
            edges: 0,
            evaluations: 0,
            finalized: false,
            queue: VecDeque::new(),
            capacity: 8,
            status: StatusScript::Never,
            status_cleared: false,
            tx_ready_from: 0,
            rx_valid_from: 0,
            busy_until: 0,
        };
        dut.refresh();
        dut
    }

    pub fn with_status(mut self, status: StatusScript) -> Self {
        self.status = status;
        self.refresh();
        self
    }

    pub fn with_tx_ready_from(mut self, edge: u64) -> Self {
        self.tx_ready_from = edge;
        self.refresh();
        self
    }

    pub fn with_rx_valid_from(mut self, edge: u64) -> Self {
        self.rx_valid_from = edge;
        self.refresh();
        self
    }

    pub fn with_busy_until(mut self, edge: u64) -> Self {
        self.busy_until = edge;
        self.refresh();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self.refresh();
        self
    }

    /// Preloads words as if they had been pushed.
    pub fn with_words(mut self, words: &[u32]) -> Self {
        self.queue.extend(words);
        self.refresh();
        self
    }

    pub fn rising_edges(&self) -> u64 {
        self.edges
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn finalized(&self) -> bool {
        self.finalized
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn on_rising_edge(&mut self) {
        self.edges += 1;
        if self.inputs.flush_tx || self.inputs.flush_rx {
            self.queue.clear();
            return;
        }
        if self.inputs.clr_status {
            self.status_cleared = true;
        }
        if self.inputs.rx_ready && self.outputs.rx_valid {
            self.queue.pop_front();
        }
        if self.inputs.tx_valid && self.outputs.tx_ready {
            self.queue.push_back(self.inputs.tx_data);
        }
    }

    fn refresh(&mut self) {
        let clk = self.inputs.clk();
        self.outputs.status = match self.status {
            StatusScript::Never => false,
            StatusScript::From(edge) => self.edges >= edge && !self.status_cleared,
            StatusScript::LowPhaseAfter(edge) => self.edges == edge && !clk,
        };
        self.outputs.busy = self.edges < self.busy_until;
        self.outputs.tx_ready = self.edges >= self.tx_ready_from && self.queue.len() < self.capacity;
        self.outputs.tx_empty = self.queue.is_empty();
        self.outputs.rx_valid = self.edges >= self.rx_valid_from && !self.queue.is_empty();
        self.outputs.rx_data = self.queue.front().copied().unwrap_or(0);
    }
}

impl Dut for ScriptedDut {
    fn inputs(&self) -> &DutInputs {
        &self.inputs
    }

    fn inputs_mut(&mut self) -> &mut DutInputs {
        &mut self.inputs
    }

    fn outputs(&self) -> &DutOutputs {
        &self.outputs
    }

    fn eval(&mut self) {
        self.evaluations += 1;
        let clk = self.inputs.clk();
        if clk && !self.prev_clk {
            self.on_rising_edge();
        }
        self.prev_clk = clk;
        self.refresh();
    }

    fn finalize(&mut self) {
        self.finalized = true;
    }
}
