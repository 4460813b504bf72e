//! Conformance scenarios for the SPI flash controller.
//!
//! Each scenario is a plain function written against the [`Harness`] API
//! only: it configures an operation, starts it, synchronizes on the status
//! flag, streams data through the FIFOs and records checks. The catalog is
//! run in order against one device so later scenarios observe the flash
//! contents left by earlier ones.

#![warn(missing_docs)]

mod scenarios;

use strobe_config::StrobeConfig;
use strobe_flash::SpiFlashTop;
use strobe_sim::{Harness, ResultTally, TraceSink, Transfer};
use tracing::info;

/// The harness type every scenario runs against.
pub type FlashHarness = Harness<SpiFlashTop>;

/// A named, numbered end-to-end scenario.
#[derive(Clone, Copy)]
pub struct Scenario {
    /// Position in the catalog, starting at 1.
    pub number: u8,
    /// Short machine-friendly name.
    pub id: &'static str,
    /// Human-readable title.
    pub title: &'static str,
    /// The scenario body.
    pub run: fn(&mut FlashHarness),
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("number", &self.number)
            .field("id", &self.id)
            .field("title", &self.title)
            .finish()
    }
}

/// Every scenario, in run order.
pub fn catalog() -> &'static [Scenario] {
    scenarios::CATALOG
}

/// Scenarios whose id or title contains `filter`, ignoring case.
///
/// An empty filter selects the whole catalog.
pub fn select(filter: &str) -> Vec<&'static Scenario> {
    let needle = filter.to_ascii_lowercase();
    catalog()
        .iter()
        .filter(|s| {
            s.id.contains(needle.as_str()) || s.title.to_ascii_lowercase().contains(&needle)
        })
        .collect()
}

/// Looks a scenario up by exact id or catalog number.
pub fn find(name: &str) -> Option<&'static Scenario> {
    let number = name.parse::<u8>().ok();
    catalog()
        .iter()
        .find(|s| s.id == name || Some(s.number) == number)
}

/// Builds the reference device from `config`, wraps it in a harness and
/// takes it through reset.
pub fn reference_harness(config: &StrobeConfig, trace: TraceSink) -> FlashHarness {
    let dut = SpiFlashTop::new(&config.flash_config());
    let mut harness = Harness::new(dut, trace, config.harness_config());
    harness.reset();
    harness
}

/// Runs `scenarios` in order and returns the tally afterwards.
pub fn run_suite<'a, I>(harness: &mut FlashHarness, scenarios: I) -> ResultTally
where
    I: IntoIterator<Item = &'a Scenario>,
{
    for scenario in scenarios {
        info!(
            number = scenario.number,
            id = scenario.id,
            "[TEST {}] {}",
            scenario.number,
            scenario.title
        );
        let before = harness.tally();
        (scenario.run)(harness);
        let after = harness.tally();
        info!(
            id = scenario.id,
            passed = after.passed - before.passed,
            failed = after.failed - before.failed,
            "scenario finished"
        );
    }
    harness.tally()
}

/// Restores the idle input levels and drives `transfer` onto the device.
pub fn issue(harness: &mut FlashHarness, transfer: Transfer) {
    harness.restore_defaults();
    transfer.apply(harness.inputs_mut());
}
