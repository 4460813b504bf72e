//! Bit-serial model of a single-lane SPI NOR flash chip.
//!
//! The chip sees one call to [`NorFlash::exchange_bit`] per SCLK rising edge
//! while selected. The bit it returns is the MISO level set up on the
//! preceding falling edge, so read data follows the last address (or dummy)
//! bit with no gap. Program and erase take effect when chip-select rises.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::opcodes::{self, ERASED, JEDEC_ID, SR_WEL};

/// What the chip is doing with incoming bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Shifting in the opcode.
    Opcode,
    /// Shifting in the 24-bit address.
    Address,
    /// Counting dummy clocks.
    Dummy(u8),
    /// Shifting out bytes from `source`.
    ReadOut,
    /// Shifting in page-program data.
    ProgramIn,
    /// Command complete; further clocks are ignored.
    Ignore,
}

/// Where read-out bytes come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Id(usize),
    Status,
    FlagStatus,
    Memory(u32),
}

/// A serial NOR flash with sparse storage.
#[derive(Clone, Debug)]
pub struct NorFlash {
    memory: BTreeMap<u32, u8>,
    size: u32,
    wel: bool,
    reset_armed: bool,
    selected: bool,
    phase: Phase,
    opcode: Option<u8>,
    shift: u32,
    shift_bits: u8,
    address: Option<u32>,
    source: Source,
    out_byte: u8,
    out_bits: u8,
    program: Vec<(u32, u8)>,
    program_offset: u32,
}

impl NorFlash {
    /// Creates an erased chip of `size` bytes. `size` must be a power of two.
    pub fn new(size: u32) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            memory: BTreeMap::new(),
            size,
            wel: false,
            reset_armed: false,
            selected: false,
            phase: Phase::Opcode,
            opcode: None,
            shift: 0,
            shift_bits: 0,
            address: None,
            source: Source::Status,
            out_byte: 0,
            out_bits: 0,
            program: Vec::new(),
            program_offset: 0,
        }
    }

    /// Capacity in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Reads one byte of the array directly.
    pub fn peek(&self, address: u32) -> u8 {
        self.memory
            .get(&(address & (self.size - 1)))
            .copied()
            .unwrap_or(ERASED)
    }

    /// Whether the write enable latch is set.
    pub fn write_enabled(&self) -> bool {
        self.wel
    }

    /// Current status register value.
    pub fn status_register(&self) -> u8 {
        if self.wel {
            SR_WEL
        } else {
            0
        }
    }

    /// Whether chip-select is currently asserted.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Chip-select falls: a new command begins.
    pub fn select(&mut self) {
        self.selected = true;
        self.phase = Phase::Opcode;
        self.opcode = None;
        self.shift = 0;
        self.shift_bits = 0;
        self.address = None;
        self.out_bits = 0;
        self.program.clear();
    }

    /// One SCLK rising edge: samples `mosi` and returns the MISO level.
    pub fn exchange_bit(&mut self, mosi: bool) -> bool {
        if !self.selected {
            return false;
        }
        let miso = self.phase == Phase::ReadOut && self.out_byte & 0x80 != 0;

        match self.phase {
            Phase::Opcode => {
                if let Some(byte) = self.shift_in(mosi, 8) {
                    self.on_opcode(byte as u8);
                }
            }
            Phase::Address => {
                if let Some(address) = self.shift_in(mosi, 24) {
                    self.on_address(address & (self.size - 1));
                }
            }
            Phase::Dummy(left) => {
                if left <= 1 {
                    self.begin_read(Source::Memory(self.address.unwrap_or(0)));
                } else {
                    self.phase = Phase::Dummy(left - 1);
                }
            }
            Phase::ReadOut => {
                self.out_byte <<= 1;
                self.out_bits -= 1;
                if self.out_bits == 0 {
                    self.load_next_byte();
                }
            }
            Phase::ProgramIn => {
                if let Some(byte) = self.shift_in(mosi, 8) {
                    self.buffer_program_byte(byte as u8);
                }
            }
            Phase::Ignore => {}
        }
        miso
    }

    /// Chip-select rises: the command executes or is discarded.
    pub fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;

        let Some(opcode) = self.opcode else {
            return;
        };
        if opcode != opcodes::RSTEN && opcode != opcodes::RST {
            self.reset_armed = false;
        }

        match opcode {
            opcodes::WREN => self.wel = true,
            opcodes::WRDI => self.wel = false,
            opcodes::RSTEN => self.reset_armed = true,
            opcodes::RST => {
                if self.reset_armed {
                    debug!("software reset");
                    self.wel = false;
                }
                self.reset_armed = false;
            }
            opcodes::PP => self.commit_program(),
            opcodes::SE => self.commit_erase(opcodes::SECTOR_SIZE),
            opcodes::SSE => self.commit_erase(opcodes::SUBSECTOR_SIZE),
            _ => {}
        }
        self.program.clear();
    }

    fn shift_in(&mut self, bit: bool, width: u8) -> Option<u32> {
        self.shift = (self.shift << 1) | u32::from(bit);
        self.shift_bits += 1;
        if self.shift_bits < width {
            return None;
        }
        let value = self.shift;
        self.shift = 0;
        self.shift_bits = 0;
        Some(value)
    }

    fn on_opcode(&mut self, opcode: u8) {
        trace!("flash command {opcode:#04x}");
        self.opcode = Some(opcode);
        match opcode {
            opcodes::RDID => self.begin_read(Source::Id(0)),
            opcodes::RDSR => self.begin_read(Source::Status),
            opcodes::RDFSR => self.begin_read(Source::FlagStatus),
            opcodes::READ | opcodes::FAST_READ | opcodes::PP | opcodes::SE | opcodes::SSE => {
                self.phase = Phase::Address;
            }
            _ => self.phase = Phase::Ignore,
        }
    }

    fn on_address(&mut self, address: u32) {
        self.address = Some(address);
        match self.opcode {
            Some(opcodes::READ) => self.begin_read(Source::Memory(address)),
            Some(opcodes::FAST_READ) => {
                self.phase = Phase::Dummy(opcodes::FAST_READ_DUMMY_CLOCKS);
            }
            Some(opcodes::PP) => {
                self.program_offset = 0;
                self.phase = Phase::ProgramIn;
            }
            _ => self.phase = Phase::Ignore,
        }
    }

    fn begin_read(&mut self, source: Source) {
        self.phase = Phase::ReadOut;
        self.source = source;
        self.load_next_byte();
    }

    fn load_next_byte(&mut self) {
        let (byte, next) = match self.source {
            Source::Id(index) => (
                JEDEC_ID.get(index).copied().unwrap_or(0),
                Source::Id(index + 1),
            ),
            Source::Status => (self.status_register(), Source::Status),
            Source::FlagStatus => (0, Source::FlagStatus),
            Source::Memory(address) => (
                self.peek(address),
                Source::Memory(address.wrapping_add(1) & (self.size - 1)),
            ),
        };
        self.out_byte = byte;
        self.out_bits = 8;
        self.source = next;
    }

    fn buffer_program_byte(&mut self, byte: u8) {
        let Some(base) = self.address else {
            return;
        };
        let page = base & !(opcodes::PAGE_SIZE - 1);
        let column = (base + self.program_offset) & (opcodes::PAGE_SIZE - 1);
        self.program_offset += 1;
        self.program.push((page | column, byte));
    }

    fn commit_program(&mut self) {
        if !self.wel {
            debug!("page program ignored: write enable latch clear");
            return;
        }
        self.wel = false;
        for &(address, byte) in &self.program {
            let cell = self.memory.get(&address).copied().unwrap_or(ERASED) & byte;
            if cell == ERASED {
                self.memory.remove(&address);
            } else {
                self.memory.insert(address, cell);
            }
        }
        debug!(
            bytes = self.program.len(),
            "page program at {:#08x}",
            self.address.unwrap_or(0)
        );
    }

    fn commit_erase(&mut self, block: u32) {
        if !self.wel {
            debug!("erase ignored: write enable latch clear");
            return;
        }
        let Some(address) = self.address else {
            return;
        };
        self.wel = false;
        let base = address & !(block - 1);
        let end = base + block;
        self.memory.retain(|&a, _| a < base || a >= end);
        debug!(len = block, "erase at {base:#08x}");
    }
}
