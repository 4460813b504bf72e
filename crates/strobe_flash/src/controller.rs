//! Behavioral SPI flash controller.
//!
//! [`SpiFlashTop`] implements the harness [`Dut`] contract. All state is
//! registered on the rising edge of `clk`; reset is asynchronous and active
//! low. A started operation drops chip-select, shifts the command, address,
//! dummy and data phases MSB first in SPI mode 0, raises chip-select again and
//! sets the sticky `status` flag.

use strobe_sim::{Dut, DutInputs, DutOutputs};
use tracing::{debug, trace};

use crate::fifo::WordFifo;
use crate::nor::NorFlash;
use crate::opcodes::{MAX_FLASH_SIZE, SECTOR_SIZE};

/// Build-time parameters of the reference device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashConfig {
    /// Transmit FIFO depth in words.
    pub tx_fifo_depth: usize,
    /// Receive FIFO depth in words.
    pub rx_fifo_depth: usize,
    /// Flash capacity in bytes (power of two).
    pub flash_size: u32,
}

impl FlashConfig {
    /// Capacity actually built: clamped to one sector up to the 24-bit
    /// address space and rounded up to a power of two.
    pub fn effective_flash_size(&self) -> u32 {
        let size = self.flash_size.clamp(SECTOR_SIZE, MAX_FLASH_SIZE);
        size.checked_next_power_of_two().unwrap_or(MAX_FLASH_SIZE)
    }
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            tx_fifo_depth: 8,
            rx_fifo_depth: 8,
            flash_size: 16 * 1024 * 1024,
        }
    }
}

/// Descriptor latched when an operation starts.
#[derive(Clone, Copy, Debug)]
struct Operation {
    command: u8,
    address: Option<u32>,
    dummy_cycles: u32,
    data_bits: u32,
    read: bool,
    prescaler: u32,
}

impl Operation {
    fn latch(inputs: &DutInputs) -> Self {
        let data_bits = if inputs.data_mode & 0b11 != 0 {
            (u32::from(inputs.data_count) + 1) * 8
        } else {
            0
        };
        Self {
            command: inputs.command,
            address: inputs.has_addr.then_some(inputs.addr & 0x00FF_FFFF),
            dummy_cycles: u32::from(inputs.dummy_cycles),
            data_bits,
            read: inputs.rd_wr,
            prescaler: u32::from(inputs.prescaler.max(1)),
        }
    }

    fn address_bits(&self) -> u32 {
        if self.address.is_some() {
            24
        } else {
            0
        }
    }

    fn data_start(&self) -> u32 {
        8 + self.address_bits() + self.dummy_cycles
    }

    fn total_bits(&self) -> u32 {
        self.data_start() + self.data_bits
    }
}

/// An operation in flight.
#[derive(Clone, Copy, Debug)]
struct Transaction {
    op: Operation,
    bit: u32,
    divider: u32,
    sclk: bool,
    tx_word: u32,
    rx_word: u32,
    rx_bits: u32,
    rx_pending: Option<u32>,
}

impl Transaction {
    fn new(op: Operation) -> Self {
        Self {
            op,
            bit: 0,
            divider: 0,
            sclk: false,
            tx_word: 0,
            rx_word: 0,
            rx_bits: 0,
            rx_pending: None,
        }
    }

    /// Position within the data phase, if the next bit belongs to it.
    fn data_bit(&self) -> Option<u32> {
        self.bit.checked_sub(self.op.data_start())
    }

    /// MOSI level for the next bit outside the data phase.
    fn header_bit(&self) -> bool {
        let bit = self.bit;
        if bit < 8 {
            return (self.op.command >> (7 - bit)) & 1 == 1;
        }
        match self.op.address {
            Some(address) if bit < 32 => (address >> (31 - bit)) & 1 == 1,
            _ => false,
        }
    }
}

/// SPI flash controller with TX/RX word FIFOs and an attached NOR flash.
pub struct SpiFlashTop {
    inputs: DutInputs,
    outputs: DutOutputs,
    prev_clk: bool,
    tx: WordFifo,
    rx: WordFifo,
    flash: NorFlash,
    active: Option<Transaction>,
    status: bool,
}

impl SpiFlashTop {
    /// Builds the device in its power-on state with reset asserted.
    pub fn new(config: &FlashConfig) -> Self {
        let flash_size = config.effective_flash_size();
        if flash_size != config.flash_size {
            debug!(
                requested = config.flash_size,
                "flash size adjusted to {flash_size:#x}"
            );
        }
        let mut dut = Self {
            inputs: DutInputs::default(),
            outputs: DutOutputs::default(),
            prev_clk: false,
            tx: WordFifo::new(config.tx_fifo_depth),
            rx: WordFifo::new(config.rx_fifo_depth),
            flash: NorFlash::new(flash_size),
            active: None,
            status: false,
        };
        dut.update_outputs();
        dut
    }

    /// The attached flash chip.
    pub fn flash(&self) -> &NorFlash {
        &self.flash
    }

    /// Words waiting in the transmit FIFO.
    pub fn tx_level(&self) -> usize {
        self.tx.len()
    }

    /// Words waiting in the receive FIFO.
    pub fn rx_level(&self) -> usize {
        self.rx.len()
    }

    fn reset_registers(&mut self) {
        if self.active.take().is_some() {
            self.flash.deselect();
        }
        self.tx.clear();
        self.rx.clear();
        self.status = false;
    }

    fn on_rising_edge(&mut self) {
        // Handshakes see the outputs as they were before this edge.
        let tx_accept = self.inputs.tx_valid && self.outputs.tx_ready;
        let rx_consume = self.inputs.rx_ready && self.outputs.rx_valid;

        if self.inputs.clr_status {
            self.status = false;
        }

        if self.inputs.flush_rx {
            self.rx.clear();
        } else if rx_consume {
            self.rx.pop();
        }

        match self.active.take() {
            Some(mut txn) => {
                if !self.step(&mut txn) {
                    self.active = Some(txn);
                }
            }
            None if self.inputs.start => self.start(),
            None => {}
        }

        if self.inputs.flush_tx {
            self.tx.clear();
        } else if tx_accept {
            self.tx.push(self.inputs.tx_data);
        }
    }

    fn start(&mut self) {
        let op = Operation::latch(&self.inputs);
        debug!(
            address = ?op.address,
            data_bits = op.data_bits,
            read = op.read,
            "transfer {:#04x} started",
            op.command
        );
        self.status = false;
        self.flash.select();
        self.active = Some(Transaction::new(op));
    }

    /// Advances an operation by one system cycle. Returns `true` once it has
    /// completed and chip-select is raised.
    fn step(&mut self, txn: &mut Transaction) -> bool {
        // A finished read word waits for room in the receive FIFO.
        if let Some(word) = txn.rx_pending {
            if !self.rx.push(word) {
                return false;
            }
            txn.rx_pending = None;
        }

        if txn.bit == txn.op.total_bits() && !txn.sclk {
            if txn.rx_bits > 0 {
                txn.rx_pending = Some(txn.rx_word << (32 - txn.rx_bits));
                txn.rx_bits = 0;
                return false;
            }
            self.flash.deselect();
            self.status = true;
            debug!("transfer {:#04x} complete", txn.op.command);
            return true;
        }

        // Each write word is fetched at the start of its first bit; SCLK
        // holds low while the transmit FIFO is empty.
        let word_start = txn.data_bit().is_some_and(|offset| offset % 32 == 0);
        if !txn.op.read && word_start && !txn.sclk && txn.divider == 0 {
            match self.tx.pop() {
                Some(word) => txn.tx_word = word,
                None => return false,
            }
        }

        txn.divider += 1;
        if txn.divider < txn.op.prescaler {
            return false;
        }
        txn.divider = 0;
        txn.sclk = !txn.sclk;
        if txn.sclk {
            self.shift_bit(txn);
        }
        false
    }

    fn shift_bit(&mut self, txn: &mut Transaction) {
        let in_data = txn.data_bit().is_some();
        let mosi = if !in_data {
            txn.header_bit()
        } else if txn.op.read {
            false
        } else {
            let bit = txn.tx_word & 0x8000_0000 != 0;
            txn.tx_word <<= 1;
            bit
        };
        let miso = self.flash.exchange_bit(mosi);

        if in_data && txn.op.read {
            txn.rx_word = (txn.rx_word << 1) | u32::from(miso);
            txn.rx_bits += 1;
            if txn.rx_bits == 32 {
                txn.rx_pending = Some(txn.rx_word);
                txn.rx_word = 0;
                txn.rx_bits = 0;
            }
        }
        txn.bit += 1;
        trace!(bit = txn.bit, mosi, miso, "sclk");
    }

    fn update_outputs(&mut self) {
        self.outputs = DutOutputs {
            status: self.status,
            busy: self.active.is_some(),
            tx_ready: !self.tx.is_full(),
            tx_empty: self.tx.is_empty(),
            rx_data: self.rx.front().unwrap_or(0),
            rx_valid: !self.rx.is_empty(),
        };
    }
}

impl Default for SpiFlashTop {
    fn default() -> Self {
        Self::new(&FlashConfig::default())
    }
}

impl Dut for SpiFlashTop {
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
        let clk = self.inputs.clk();
        if !self.inputs.rstn {
            self.reset_registers();
        } else if clk && !self.prev_clk {
            self.on_rising_edge();
        }
        self.prev_clk = clk;
        self.update_outputs();
    }

    fn finalize(&mut self) {
        if self.active.take().is_some() {
            self.flash.deselect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes;
    use strobe_sim::{Harness, HarnessConfig, TraceSink, Transfer};

    fn bench(config: &FlashConfig) -> Harness<SpiFlashTop> {
        let mut h = Harness::new(
            SpiFlashTop::new(config),
            TraceSink::disabled(),
            HarnessConfig::default(),
        );
        h.reset();
        h
    }

    #[test]
    fn flash_size_is_clamped_and_rounded() {
        let sized = |flash_size| {
            let config = FlashConfig {
                flash_size,
                ..FlashConfig::default()
            };
            SpiFlashTop::new(&config).flash().size()
        };
        assert_eq!(sized(0), 64 * 1024);
        assert_eq!(sized(4096), 64 * 1024);
        assert_eq!(sized(100_000), 128 * 1024);
        assert_eq!(sized(1 << 20), 1 << 20);
        assert_eq!(sized(u32::MAX), 16 * 1024 * 1024);
    }

    #[test]
    fn zero_size_config_still_addresses_within_the_chip() {
        let mut h = bench(&FlashConfig {
            flash_size: 0,
            ..FlashConfig::default()
        });
        program_word(&mut h, 0x01_0004, 0x1234_5678);
        assert_eq!(h.dut().flash().peek(0x0004), 0x12);
        assert_eq!(h.dut().flash().peek(0x0007), 0x78);
    }

    fn run(h: &mut Harness<SpiFlashTop>, transfer: Transfer) {
        h.restore_defaults();
        transfer.apply(h.inputs_mut());
        h.start_transfer();
        assert!(h.wait_status());
        h.clear_status();
    }

    fn program_word(h: &mut Harness<SpiFlashTop>, address: u32, word: u32) {
        run(h, Transfer::command(opcodes::WREN));
        h.restore_defaults();
        Transfer::command(opcodes::PP)
            .with_address(address)
            .write(4)
            .apply(h.inputs_mut());
        assert!(h.push_tx(word));
        h.start_transfer();
        assert!(h.wait_status());
        h.clear_status();
    }

    fn read_word(h: &mut Harness<SpiFlashTop>, transfer: Transfer) -> u32 {
        run(h, transfer);
        h.pop_rx().unwrap()
    }

    #[test]
    fn power_on_outputs() {
        let dut = SpiFlashTop::default();
        let out = dut.outputs();
        assert!(!out.status);
        assert!(!out.busy);
        assert!(out.tx_ready);
        assert!(out.tx_empty);
        assert!(!out.rx_valid);
    }

    #[test]
    fn write_enable_reaches_the_flash() {
        let mut h = bench(&FlashConfig::default());
        run(&mut h, Transfer::command(opcodes::WREN));
        assert!(h.dut().flash().write_enabled());
        assert!(!h.outputs().status);
        assert_eq!(h.tally().failed, 0);
    }

    #[test]
    fn status_is_sticky_until_cleared() {
        let mut h = bench(&FlashConfig::default());
        Transfer::command(opcodes::WRDI).apply(h.inputs_mut());
        h.start_transfer();
        assert!(h.wait_status());
        h.tick(50);
        assert!(h.outputs().status);
        assert!(!h.outputs().busy);
        h.clear_status();
        assert!(!h.outputs().status);
    }

    #[test]
    fn busy_during_transfer() {
        let mut h = bench(&FlashConfig::default());
        Transfer::command(opcodes::WREN).apply(h.inputs_mut());
        h.start_transfer();
        h.tick(2);
        assert!(h.outputs().busy);
        assert!(h.wait_status());
        h.tick(2);
        assert!(!h.outputs().busy);
    }

    #[test]
    fn jedec_id_word() {
        let mut h = bench(&FlashConfig::default());
        let id = read_word(&mut h, Transfer::command(opcodes::RDID).read(4));
        assert_eq!(id, 0x20BA_1910);
    }

    #[test]
    fn short_read_is_left_aligned() {
        let mut h = bench(&FlashConfig::default());
        let id = read_word(&mut h, Transfer::command(opcodes::RDID).read(1));
        assert_eq!(id, 0x2000_0000);
    }

    #[test]
    fn program_and_read_back() {
        let mut h = bench(&FlashConfig::default());
        program_word(&mut h, 0, 0xDEAD_BEEF);
        assert_eq!(h.dut().flash().peek(0), 0xDE);
        assert_eq!(h.dut().flash().peek(3), 0xEF);
        let normal = read_word(&mut h, Transfer::command(opcodes::READ).with_address(0).read(4));
        assert_eq!(normal, 0xDEAD_BEEF);
        let fast = read_word(
            &mut h,
            Transfer::command(opcodes::FAST_READ)
                .with_address(0)
                .with_dummy_cycles(8)
                .read(4),
        );
        assert_eq!(fast, 0xDEAD_BEEF);
    }

    #[test]
    fn multi_word_read() {
        let mut h = bench(&FlashConfig::default());
        program_word(&mut h, 0x20, 0x0102_0304);
        program_word(&mut h, 0x24, 0x0506_0708);
        run(&mut h, Transfer::command(opcodes::READ).with_address(0x20).read(8));
        assert_eq!(h.pop_rx(), Ok(0x0102_0304));
        assert_eq!(h.pop_rx(), Ok(0x0506_0708));
    }

    #[test]
    fn read_stalls_on_full_rx_fifo() {
        let config = FlashConfig {
            rx_fifo_depth: 1,
            ..FlashConfig::default()
        };
        let mut h = bench(&config);
        h.restore_defaults();
        Transfer::command(opcodes::READ)
            .with_address(0)
            .read(8)
            .apply(h.inputs_mut());
        h.start_transfer();
        assert!(!h.wait_status_within(2_000));
        assert!(h.outputs().busy);
        assert_eq!(h.pop_rx(), Ok(0xFFFF_FFFF));
        assert!(h.wait_status());
        assert_eq!(h.pop_rx(), Ok(0xFFFF_FFFF));
    }

    #[test]
    fn write_stalls_until_word_arrives() {
        let mut h = bench(&FlashConfig::default());
        run(&mut h, Transfer::command(opcodes::WREN));
        h.restore_defaults();
        Transfer::command(opcodes::PP)
            .with_address(0x100)
            .write(4)
            .apply(h.inputs_mut());
        h.start_transfer();
        h.tick(1_000);
        assert!(h.outputs().busy);
        assert!(h.push_tx(0x1234_5678));
        assert!(h.wait_status());
        assert_eq!(h.dut().flash().peek(0x100), 0x12);
    }

    #[test]
    fn flush_tx_discards_words() {
        let mut h = bench(&FlashConfig::default());
        h.push_tx(1);
        h.push_tx(2);
        assert_eq!(h.dut().tx_level(), 2);
        h.flush(strobe_sim::Channel::Tx);
        assert!(h.outputs().tx_empty);
    }

    #[test]
    fn tx_ready_drops_when_full() {
        let config = FlashConfig {
            tx_fifo_depth: 2,
            ..FlashConfig::default()
        };
        let mut h = bench(&config);
        assert!(h.push_tx(1));
        assert!(h.push_tx(2));
        assert!(!h.outputs().tx_ready);
        assert!(!h.push_tx_within(3, 10));
        assert_eq!(h.dut().tx_level(), 2);
    }

    #[test]
    fn reset_aborts_transfer() {
        let mut h = bench(&FlashConfig::default());
        h.push_tx(7);
        Transfer::command(opcodes::WREN).apply(h.inputs_mut());
        h.start_transfer();
        h.tick(3);
        h.reset();
        assert!(!h.outputs().busy);
        assert!(h.outputs().tx_empty);
        assert!(!h.dut().flash().is_selected());
        assert!(!h.dut().flash().write_enabled());
    }
}
