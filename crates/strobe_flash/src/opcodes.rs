//! Serial NOR flash command opcodes understood by [`NorFlash`](crate::NorFlash).
//!
//! Opcodes follow the common JEDEC single-lane command set with 3-byte
//! addressing.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - sets the WEL bit, required before program/erase
pub const WREN: u8 = 0x06;
/// Write Disable - clears the WEL bit
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status and identification
// ============================================================================

/// Read JEDEC ID (manufacturer, memory type, capacity, extended info)
pub const RDID: u8 = 0x9F;
/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Read Flag Status Register
pub const RDFSR: u8 = 0x70;

// ============================================================================
// Read
// ============================================================================

/// Read Data
pub const READ: u8 = 0x03;
/// Fast Read (eight dummy clocks after the address)
pub const FAST_READ: u8 = 0x0B;

// ============================================================================
// Program / erase
// ============================================================================

/// Page Program (up to 256 bytes, wraps within the page)
pub const PP: u8 = 0x02;
/// Sector Erase (64 KiB)
pub const SE: u8 = 0xD8;
/// Subsector Erase (4 KiB)
pub const SSE: u8 = 0x20;

// ============================================================================
// Reset
// ============================================================================

/// Reset Enable - arms the following RST
pub const RSTEN: u8 = 0x66;
/// Reset Memory - software reset, only after RSTEN
pub const RST: u8 = 0x99;

// ============================================================================
// Geometry and register bits
// ============================================================================

/// Program page size in bytes
pub const PAGE_SIZE: u32 = 256;
/// Sector size in bytes (SE)
pub const SECTOR_SIZE: u32 = 64 * 1024;
/// Subsector size in bytes (SSE)
pub const SUBSECTOR_SIZE: u32 = 4 * 1024;
/// Largest capacity reachable with 24-bit addressing
pub const MAX_FLASH_SIZE: u32 = 1 << 24;
/// Dummy clocks inserted by FAST_READ
pub const FAST_READ_DUMMY_CLOCKS: u8 = 8;

/// Status register: write in progress
pub const SR_WIP: u8 = 1 << 0;
/// Status register: write enable latch
pub const SR_WEL: u8 = 1 << 1;

/// JEDEC ID bytes returned by RDID, in shift order
pub const JEDEC_ID: [u8; 4] = [0x20, 0xBA, 0x19, 0x10];

/// Value of an erased byte
pub const ERASED: u8 = 0xFF;
