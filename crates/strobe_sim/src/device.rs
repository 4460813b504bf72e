//! The device-under-test signal contract.
//!
//! The harness only ever talks to a device through [`DutInputs`] (written by
//! the harness), [`DutOutputs`] (read by the harness) and [`Dut::eval`]. The
//! device's internal state is opaque. The clock input is not publicly
//! writable: only the clock driver may toggle it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prescaler value applied by [`DutInputs::restore_defaults`].
pub const DEFAULT_PRESCALER: u8 = 4;

/// A clocked device the harness can drive.
///
/// `eval` recomputes every output from the current inputs and the device's
/// internal state. Implementations detect clock edges themselves by comparing
/// [`DutInputs::clk`] against the level seen on the previous evaluation.
pub trait Dut {
    /// Returns the current input levels.
    fn inputs(&self) -> &DutInputs;

    /// Returns the input levels for modification.
    fn inputs_mut(&mut self) -> &mut DutInputs;

    /// Returns the outputs computed by the most recent evaluation.
    fn outputs(&self) -> &DutOutputs;

    /// Re-evaluates the device after an input change.
    fn eval(&mut self);

    /// Called once when the run ends.
    fn finalize(&mut self) {}
}

/// Input signals driven by the harness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DutInputs {
    clk: bool,
    /// Active-low reset.
    pub rstn: bool,
    /// Operation start strobe.
    pub start: bool,
    /// Status-clear strobe.
    pub clr_status: bool,
    /// SPI opcode to issue.
    pub command: u8,
    /// Data-phase lane mode (0 = no data phase).
    pub data_mode: u8,
    /// Data direction: `true` reads from the flash, `false` writes to it.
    pub rd_wr: bool,
    /// Dummy SCLK cycles between address and data phases.
    pub dummy_cycles: u8,
    /// Data length code: number of bytes minus one.
    pub data_count: u8,
    /// Whether the operation carries an address phase.
    pub has_addr: bool,
    /// 24-bit flash address.
    pub addr: u32,
    /// SCLK half-period in system clock cycles.
    pub prescaler: u8,
    /// Word offered to the transmit FIFO.
    pub tx_data: u32,
    /// Producer side of the transmit handshake.
    pub tx_valid: bool,
    /// Consumer side of the receive handshake.
    pub rx_ready: bool,
    /// Clears the transmit FIFO while asserted.
    pub flush_tx: bool,
    /// Clears the receive FIFO while asserted.
    pub flush_rx: bool,
}

impl DutInputs {
    /// Returns the current clock level.
    pub fn clk(&self) -> bool {
        self.clk
    }

    pub(crate) fn set_clk(&mut self, level: bool) {
        self.clk = level;
    }

    /// Returns every operation input to its idle value.
    ///
    /// The clock and reset lines are left untouched.
    pub fn restore_defaults(&mut self) {
        *self = DutInputs {
            clk: self.clk,
            rstn: self.rstn,
            ..DutInputs::default()
        };
    }

    /// Returns the level of a strobe input.
    pub fn strobe(&self, strobe: Strobe) -> bool {
        match strobe {
            Strobe::Start => self.start,
            Strobe::ClearStatus => self.clr_status,
            Strobe::FlushTx => self.flush_tx,
            Strobe::FlushRx => self.flush_rx,
        }
    }

    /// Returns the strobe input for modification.
    pub fn strobe_mut(&mut self, strobe: Strobe) -> &mut bool {
        match strobe {
            Strobe::Start => &mut self.start,
            Strobe::ClearStatus => &mut self.clr_status,
            Strobe::FlushTx => &mut self.flush_tx,
            Strobe::FlushRx => &mut self.flush_rx,
        }
    }
}

impl Default for DutInputs {
    /// Power-on levels: clock low, reset asserted, operation inputs idle.
    fn default() -> Self {
        Self {
            clk: false,
            rstn: false,
            start: false,
            clr_status: false,
            command: 0,
            data_mode: 0,
            rd_wr: false,
            dummy_cycles: 0,
            data_count: 0,
            has_addr: false,
            addr: 0,
            prescaler: DEFAULT_PRESCALER,
            tx_data: 0,
            tx_valid: false,
            rx_ready: false,
            flush_tx: false,
            flush_rx: false,
        }
    }
}

/// Output signals read by the harness.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DutOutputs {
    /// Operation-complete flag.
    pub status: bool,
    /// Operation in progress.
    pub busy: bool,
    /// The transmit FIFO can accept a word.
    pub tx_ready: bool,
    /// The transmit FIFO holds no words.
    pub tx_empty: bool,
    /// Word at the head of the receive FIFO.
    pub rx_data: u32,
    /// The receive FIFO holds at least one word.
    pub rx_valid: bool,
}

/// Pulse-style inputs that the strobe helpers assert and release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strobe {
    /// Starts the configured operation.
    Start,
    /// Clears the status flag.
    ClearStatus,
    /// Empties the transmit FIFO.
    FlushTx,
    /// Empties the receive FIFO.
    FlushRx,
}

/// One of the two byte-stream FIFOs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Harness to device.
    Tx,
    /// Device to harness.
    Rx,
}

impl Channel {
    /// Returns the strobe that empties this channel.
    pub fn flush_strobe(self) -> Strobe {
        match self {
            Channel::Tx => Strobe::FlushTx,
            Channel::Rx => Strobe::FlushRx,
        }
    }
}

/// Data-phase lane configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataMode {
    /// Command and address only.
    #[default]
    None,
    /// Single-lane SPI.
    Single,
    /// Dual-lane SPI.
    Dual,
    /// Quad-lane SPI.
    Quad,
}

impl DataMode {
    /// Returns the two-bit encoding driven onto `data_mode`.
    pub fn bits(self) -> u8 {
        match self {
            DataMode::None => 0b00,
            DataMode::Single => 0b01,
            DataMode::Dual => 0b10,
            DataMode::Quad => 0b11,
        }
    }

    /// Decodes the low two bits of a `data_mode` value.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => DataMode::None,
            0b01 => DataMode::Single,
            0b10 => DataMode::Dual,
            _ => DataMode::Quad,
        }
    }
}

/// Direction of the data phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Harness to flash.
    #[default]
    Write,
    /// Flash to harness.
    Read,
}

/// Descriptor for one flash operation, applied to the descriptor inputs.
///
/// ```
/// use strobe_sim::{DutInputs, Transfer};
///
/// let mut inputs = DutInputs::default();
/// Transfer::command(0x0B).with_address(0x10).with_dummy_cycles(8).read(4).apply(&mut inputs);
/// assert!(inputs.rd_wr);
/// assert_eq!(inputs.data_count, 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// SPI opcode.
    pub command: u8,
    /// Data-phase lane mode.
    pub data_mode: DataMode,
    /// Data-phase direction.
    pub direction: Direction,
    /// Dummy SCLK cycles before the data phase.
    pub dummy_cycles: u8,
    /// Data length code (bytes minus one).
    pub data_count: u8,
    /// Address, if the operation has an address phase.
    pub address: Option<u32>,
}

impl Transfer {
    /// An opcode-only operation: no address, no data phase.
    pub fn command(command: u8) -> Self {
        Self {
            command,
            data_mode: DataMode::None,
            direction: Direction::Write,
            dummy_cycles: 0,
            data_count: 0,
            address: None,
        }
    }

    /// Adds a 24-bit address phase.
    pub fn with_address(mut self, address: u32) -> Self {
        self.address = Some(address & 0x00FF_FFFF);
        self
    }

    /// Sets the number of dummy SCLK cycles.
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Adds a single-lane read data phase of `bytes` bytes (at least one).
    pub fn read(self, bytes: u16) -> Self {
        self.with_data(Direction::Read, bytes)
    }

    /// Adds a single-lane write data phase of `bytes` bytes (at least one).
    pub fn write(self, bytes: u16) -> Self {
        self.with_data(Direction::Write, bytes)
    }

    fn with_data(mut self, direction: Direction, bytes: u16) -> Self {
        self.data_mode = DataMode::Single;
        self.direction = direction;
        self.data_count = bytes.clamp(1, 256).saturating_sub(1) as u8;
        self
    }

    /// Drives this descriptor onto the device inputs.
    pub fn apply(&self, inputs: &mut DutInputs) {
        inputs.command = self.command;
        inputs.data_mode = self.data_mode.bits();
        inputs.rd_wr = self.direction == Direction::Read;
        inputs.dummy_cycles = self.dummy_cycles;
        inputs.data_count = self.data_count;
        inputs.has_addr = self.address.is_some();
        inputs.addr = self.address.unwrap_or(0);
    }
}

/// Identifies one traced port of the device interface.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct PortId(u32);

impl PortId {
    /// Creates a `PortId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name and width of a traced port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortInfo {
    /// Signal name as it appears in the trace.
    pub name: &'static str,
    /// Width in bits.
    pub width: u32,
}

const fn port(name: &'static str, width: u32) -> PortInfo {
    PortInfo { name, width }
}

/// Number of ports in the traced interface.
pub const PORT_COUNT: usize = 23;

/// Every traced port, inputs first, in [`snapshot`] order.
pub const PORTS: [PortInfo; PORT_COUNT] = [
    port("clk", 1),
    port("rstn", 1),
    port("start_i", 1),
    port("clr_status_i", 1),
    port("command_i", 8),
    port("data_mode_i", 2),
    port("rd_wr_i", 1),
    port("dummy_cycle_i", 8),
    port("data_count_i", 8),
    port("has_addr_i", 1),
    port("addr_i", 24),
    port("prescaler_i", 8),
    port("data_tx_i", 32),
    port("data_tx_valid_i", 1),
    port("data_rx_ready_i", 1),
    port("flush_tx_i", 1),
    port("flush_rx_i", 1),
    port("status_o", 1),
    port("busy_o", 1),
    port("data_tx_ready_o", 1),
    port("tx_fifo_empty_o", 1),
    port("data_rx_o", 32),
    port("data_rx_valid_o", 1),
];

/// Captures every traced port value in [`PORTS`] order.
pub fn snapshot(inputs: &DutInputs, outputs: &DutOutputs) -> [u64; PORT_COUNT] {
    [
        u64::from(inputs.clk),
        u64::from(inputs.rstn),
        u64::from(inputs.start),
        u64::from(inputs.clr_status),
        u64::from(inputs.command),
        u64::from(inputs.data_mode & 0b11),
        u64::from(inputs.rd_wr),
        u64::from(inputs.dummy_cycles),
        u64::from(inputs.data_count),
        u64::from(inputs.has_addr),
        u64::from(inputs.addr & 0x00FF_FFFF),
        u64::from(inputs.prescaler),
        u64::from(inputs.tx_data),
        u64::from(inputs.tx_valid),
        u64::from(inputs.rx_ready),
        u64::from(inputs.flush_tx),
        u64::from(inputs.flush_rx),
        u64::from(outputs.status),
        u64::from(outputs.busy),
        u64::from(outputs.tx_ready),
        u64::from(outputs.tx_empty),
        u64::from(outputs.rx_data),
        u64::from(outputs.rx_valid),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_holds_reset() {
        let inputs = DutInputs::default();
        assert!(!inputs.rstn);
        assert!(!inputs.clk());
        assert_eq!(inputs.prescaler, DEFAULT_PRESCALER);
    }

    #[test]
    fn restore_defaults_keeps_clock_and_reset() {
        let mut inputs = DutInputs::default();
        inputs.set_clk(true);
        inputs.rstn = true;
        inputs.command = 0x9F;
        inputs.tx_valid = true;
        inputs.prescaler = 1;
        inputs.restore_defaults();
        assert!(inputs.clk());
        assert!(inputs.rstn);
        assert_eq!(inputs.command, 0);
        assert!(!inputs.tx_valid);
        assert_eq!(inputs.prescaler, DEFAULT_PRESCALER);
    }

    #[test]
    fn strobe_mut_targets_the_right_line() {
        let mut inputs = DutInputs::default();
        *inputs.strobe_mut(Strobe::FlushRx) = true;
        assert!(inputs.flush_rx);
        assert!(!inputs.flush_tx);
        assert!(inputs.strobe(Strobe::FlushRx));
    }

    #[test]
    fn channel_flush_strobes() {
        assert_eq!(Channel::Tx.flush_strobe(), Strobe::FlushTx);
        assert_eq!(Channel::Rx.flush_strobe(), Strobe::FlushRx);
    }

    #[test]
    fn data_mode_encoding() {
        for mode in [DataMode::None, DataMode::Single, DataMode::Dual, DataMode::Quad] {
            assert_eq!(DataMode::from_bits(mode.bits()), mode);
        }
        assert_eq!(DataMode::from_bits(0b101), DataMode::Single);
    }

    #[test]
    fn command_only_transfer() {
        let mut inputs = DutInputs::default();
        inputs.has_addr = true;
        Transfer::command(0x06).apply(&mut inputs);
        assert_eq!(inputs.command, 0x06);
        assert_eq!(inputs.data_mode, 0);
        assert!(!inputs.has_addr);
        assert!(!inputs.rd_wr);
    }

    #[test]
    fn read_transfer_sets_length_code() {
        let mut inputs = DutInputs::default();
        Transfer::command(0x03)
            .with_address(0x1234_5678)
            .read(4)
            .apply(&mut inputs);
        assert_eq!(inputs.data_mode, 0b01);
        assert!(inputs.rd_wr);
        assert_eq!(inputs.data_count, 3);
        assert!(inputs.has_addr);
        assert_eq!(inputs.addr, 0x34_5678);
    }

    #[test]
    fn data_length_is_clamped() {
        assert_eq!(Transfer::command(0x02).write(0).data_count, 0);
        assert_eq!(Transfer::command(0x02).write(256).data_count, 255);
        assert_eq!(Transfer::command(0x02).write(1000).data_count, 255);
    }

    #[test]
    fn snapshot_matches_port_table() {
        let mut inputs = DutInputs::default();
        inputs.command = 0xD8;
        inputs.tx_data = 0xDEAD_BEEF;
        let outputs = DutOutputs {
            busy: true,
            rx_data: 0xCAFE_BABE,
            ..DutOutputs::default()
        };
        let values = snapshot(&inputs, &outputs);
        let index = |name: &str| PORTS.iter().position(|p| p.name == name).unwrap();
        assert_eq!(values[index("command_i")], 0xD8);
        assert_eq!(values[index("data_tx_i")], 0xDEAD_BEEF);
        assert_eq!(values[index("busy_o")], 1);
        assert_eq!(values[index("data_rx_o")], 0xCAFE_BABE);
        assert_eq!(values[index("prescaler_i")], u64::from(DEFAULT_PRESCALER));
    }

    #[test]
    fn port_values_fit_their_widths() {
        let mut inputs = DutInputs::default();
        inputs.addr = u32::MAX;
        inputs.data_mode = u8::MAX;
        let values = snapshot(&inputs, &DutOutputs::default());
        for (info, value) in PORTS.iter().zip(values) {
            assert!(value < (1u64 << info.width), "{} overflows", info.name);
        }
    }
}
