//! The scenario bodies.

use strobe_flash::opcodes::{
    FAST_READ, FAST_READ_DUMMY_CLOCKS, PP, RDFSR, RDID, RDSR, READ, RST, RSTEN, SE, WRDI, WREN,
};
use strobe_sim::{Channel, Transfer};

use crate::{issue, FlashHarness, Scenario};

/// Idle cycles between scenarios.
const IDLE: u32 = 20;
/// Idle cycles between the steps of one scenario.
const STEP_IDLE: u32 = 10;
/// Cycles left for the last read word to reach the receive FIFO.
const DRAIN: u32 = 10;

pub(crate) static CATALOG: &[Scenario] = &[
    Scenario {
        number: 1,
        id: "write_enable",
        title: "Write Enable (0x06)",
        run: write_enable,
    },
    Scenario {
        number: 2,
        id: "write_disable",
        title: "Write Disable (0x04)",
        run: write_disable,
    },
    Scenario {
        number: 3,
        id: "read_jedec_id",
        title: "Read JEDEC ID (0x9F)",
        run: read_jedec_id,
    },
    Scenario {
        number: 4,
        id: "read_status_register",
        title: "Read Status Register (0x05)",
        run: read_status_register,
    },
    Scenario {
        number: 5,
        id: "read_flag_status_register",
        title: "Read Flag Status Register (0x70)",
        run: read_flag_status_register,
    },
    Scenario {
        number: 6,
        id: "page_program",
        title: "Page Program (0x02) of one word at 0x000000",
        run: page_program,
    },
    Scenario {
        number: 7,
        id: "fast_read",
        title: "Fast Read (0x0B) of one word at 0x000000",
        run: fast_read,
    },
    Scenario {
        number: 8,
        id: "normal_read",
        title: "Normal Read (0x03) of one word at 0x000004",
        run: normal_read,
    },
    Scenario {
        number: 9,
        id: "sector_erase",
        title: "Sector Erase (0xD8) at 0x000000 and verify",
        run: sector_erase,
    },
    Scenario {
        number: 10,
        id: "software_reset",
        title: "Software Reset (0x66 + 0x99)",
        run: software_reset,
    },
    Scenario {
        number: 11,
        id: "tx_fifo_flush",
        title: "TX FIFO flush",
        run: tx_fifo_flush,
    },
    Scenario {
        number: 12,
        id: "back_to_back",
        title: "Back-to-back writes and reads at 0x000010 and 0x000014",
        run: back_to_back,
    },
    Scenario {
        number: 13,
        id: "busy_during_transfer",
        title: "Busy signal during transfer",
        run: busy_during_transfer,
    },
    Scenario {
        number: 14,
        id: "clear_status",
        title: "clr_status clears status",
        run: clear_status,
    },
];

/// Issues `transfer`, starts it and waits for completion.
fn start_and_wait(h: &mut FlashHarness, transfer: Transfer) -> bool {
    issue(h, transfer);
    h.start_transfer();
    h.wait_status()
}

fn check_status(h: &mut FlashHarness, name: &str) {
    let status = h.outputs().status;
    h.check_bool(name, status, true);
}

/// Write Enable with no checks, as a preamble to program and erase.
fn enable_writes(h: &mut FlashHarness, settle: u32) {
    start_and_wait(h, Transfer::command(WREN));
    h.clear_status();
    h.tick(settle);
}

/// Programs one word at `address`, preloading it into the transmit FIFO.
fn program_word(h: &mut FlashHarness, address: u32, word: u32) -> bool {
    issue(h, Transfer::command(PP).with_address(address).write(4));
    h.push_tx(word);
    h.start_transfer();
    h.wait_status()
}

/// Runs a one-word read and pops the result.
///
/// `None` means the pop timed out; the timeout is already tallied.
fn read_word(h: &mut FlashHarness, transfer: Transfer) -> Option<u32> {
    start_and_wait(h, transfer);
    h.tick(DRAIN);
    h.pop_rx().ok()
}

fn check_word(h: &mut FlashHarness, name: &str, word: Option<u32>, expected: u32) {
    if let Some(word) = word {
        h.check(name, word, expected);
    }
}

fn write_enable(h: &mut FlashHarness) {
    start_and_wait(h, Transfer::command(WREN));
    check_status(h, "status high after write enable");
    h.clear_status();
    h.tick(IDLE);
}

fn write_disable(h: &mut FlashHarness) {
    start_and_wait(h, Transfer::command(WRDI));
    check_status(h, "status high after write disable");
    h.clear_status();
    h.tick(IDLE);
}

fn read_jedec_id(h: &mut FlashHarness) {
    let id = read_word(h, Transfer::command(RDID).read(4));
    check_word(h, "JEDEC manufacturer byte", id.map(|w| w >> 24), 0x20);
    h.clear_status();
    h.tick(IDLE);
}

fn read_status_register(h: &mut FlashHarness) {
    let sr = read_word(h, Transfer::command(RDSR).read(4));
    check_word(h, "status register byte", sr.map(|w| w >> 24), 0x00);
    h.clear_status();
    h.tick(IDLE);
}

fn read_flag_status_register(h: &mut FlashHarness) {
    let fsr = read_word(h, Transfer::command(RDFSR).read(4));
    check_word(h, "flag status register byte", fsr.map(|w| w >> 24), 0x00);
    h.clear_status();
    h.tick(IDLE);
}

fn page_program(h: &mut FlashHarness) {
    enable_writes(h, STEP_IDLE);
    program_word(h, 0x00_0000, 0xDEAD_BEEF);
    check_status(h, "page program completed");
    h.clear_status();
    h.tick(IDLE);
}

fn fast_read(h: &mut FlashHarness) {
    let transfer = Transfer::command(FAST_READ)
        .with_address(0x00_0000)
        .with_dummy_cycles(FAST_READ_DUMMY_CLOCKS)
        .read(4);
    let word = read_word(h, transfer);
    check_word(h, "fast read returns programmed word", word, 0xDEAD_BEEF);
    h.clear_status();
    h.tick(IDLE);
}

fn normal_read(h: &mut FlashHarness) {
    enable_writes(h, STEP_IDLE);
    program_word(h, 0x00_0004, 0xCAFE_BABE);
    h.clear_status();
    h.tick(STEP_IDLE);

    let word = read_word(h, Transfer::command(READ).with_address(0x00_0004).read(4));
    check_word(h, "normal read returns programmed word", word, 0xCAFE_BABE);
    h.clear_status();
    h.tick(IDLE);
}

fn sector_erase(h: &mut FlashHarness) {
    enable_writes(h, STEP_IDLE);
    start_and_wait(h, Transfer::command(SE).with_address(0x00_0000));
    check_status(h, "sector erase completed");
    h.clear_status();
    h.tick(IDLE);

    let word = read_word(h, Transfer::command(READ).with_address(0x00_0000).read(4));
    check_word(h, "erased region reads 0xffffffff", word, 0xFFFF_FFFF);
    h.clear_status();
    h.tick(IDLE);
}

fn software_reset(h: &mut FlashHarness) {
    start_and_wait(h, Transfer::command(RSTEN));
    h.clear_status();
    h.tick(STEP_IDLE);

    start_and_wait(h, Transfer::command(RST));
    check_status(h, "software reset completed");
    h.clear_status();
    h.tick(IDLE);
}

fn tx_fifo_flush(h: &mut FlashHarness) {
    h.restore_defaults();
    h.push_tx(0x1122_3344);
    h.push_tx(0x5566_7788);
    let empty = h.outputs().tx_empty;
    h.check_bool("TX FIFO holds words before flush", !empty, true);

    h.flush(Channel::Tx);
    let empty = h.outputs().tx_empty;
    h.check_bool("TX FIFO empty after flush", empty, true);
    h.tick(STEP_IDLE);
}

fn back_to_back(h: &mut FlashHarness) {
    const WORDS: [(u32, u32); 2] = [(0x00_0010, 0xAABB_CCDD), (0x00_0014, 0x1122_3344)];

    for (address, word) in WORDS {
        enable_writes(h, 5);
        program_word(h, address, word);
        h.clear_status();
        h.tick(5);
    }

    for (i, (address, expected)) in WORDS.into_iter().enumerate() {
        let word = read_word(h, Transfer::command(READ).with_address(address).read(4));
        check_word(h, &format!("back-to-back read word {i}"), word, expected);
        h.clear_status();
        h.tick(5);
    }
}

fn busy_during_transfer(h: &mut FlashHarness) {
    issue(h, Transfer::command(WREN));
    h.start_transfer();
    h.tick(2);
    let busy = h.outputs().busy;
    h.check_bool("busy high during transfer", busy, true);

    h.wait_status();
    h.tick(2);
    let busy = h.outputs().busy;
    h.check_bool("busy low after transfer", busy, false);
    h.clear_status();
    h.tick(STEP_IDLE);
}

fn clear_status(h: &mut FlashHarness) {
    start_and_wait(h, Transfer::command(WREN));
    check_status(h, "status high before clear");

    h.clear_status();
    let status = h.outputs().status;
    h.check_bool("status low after clear", status, false);
    h.tick(STEP_IDLE);
}
