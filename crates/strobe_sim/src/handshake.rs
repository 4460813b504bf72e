//! Ready/valid handshakes on the two FIFO channels.
//!
//! Both directions advance one full cycle per polling attempt and hold their
//! own side of the handshake constant while waiting. A budget of `n` allows
//! `n` advances; success is decided only by having observed the other side.

use tracing::debug;

use crate::clock::ClockDriver;
use crate::device::Dut;
use crate::error::{Timeout, WaitTarget};

impl<D: Dut> ClockDriver<D> {
    /// Offers `word` to the transmit FIFO until it is accepted.
    ///
    /// Whether or not `tx_ready` was seen, one more cycle is advanced with the
    /// word still offered before `tx_valid` drops.
    pub fn push_word(&mut self, word: u32, budget: u32) -> Result<u32, Timeout> {
        let inputs = self.inputs_mut();
        inputs.tx_data = word;
        inputs.tx_valid = true;

        let mut waited = 0;
        let outcome = loop {
            if self.outputs().tx_ready {
                break Ok(waited);
            }
            if waited == budget {
                break Err(Timeout {
                    target: WaitTarget::TxReady,
                    budget,
                });
            }
            self.tick(1);
            waited += 1;
        };

        self.tick(1);
        self.inputs_mut().tx_valid = false;
        debug!(waited, accepted = outcome.is_ok(), "push {word:#010x}");
        outcome
    }

    /// Accepts one word from the receive FIFO.
    ///
    /// The word is captured before the consuming edge. On exhaustion
    /// `rx_ready` is dropped without advancing further.
    pub fn pop_word(&mut self, budget: u32) -> Result<u32, Timeout> {
        self.inputs_mut().rx_ready = true;

        let mut waited = 0;
        while !self.outputs().rx_valid {
            if waited == budget {
                self.inputs_mut().rx_ready = false;
                debug!(waited, "pop starved");
                return Err(Timeout {
                    target: WaitTarget::RxValid,
                    budget,
                });
            }
            self.tick(1);
            waited += 1;
        }

        let word = self.outputs().rx_data;
        self.tick(1);
        self.inputs_mut().rx_ready = false;
        debug!(waited, "pop {word:#010x}");
        Ok(word)
    }
}
