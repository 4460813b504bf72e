//! Reference device for the Strobe harness: an SPI flash controller with an
//! attached serial NOR flash.
//!
//! The model stands in for the RTL device under test so scenarios can run
//! end to end. Its only contract with the harness is [`strobe_sim::Dut`].
//!
//! # Modules
//!
//! - `opcodes` — Flash command set and geometry
//! - `fifo` — Bounded word FIFO
//! - `nor` — Bit-serial NOR flash chip
//! - `controller` — Controller state machine implementing `Dut`

#![warn(missing_docs)]

pub mod controller;
pub mod fifo;
pub mod nor;
pub mod opcodes;

pub use controller::{FlashConfig, SpiFlashTop};
pub use fifo::WordFifo;
pub use nor::NorFlash;
