//! Configuration types deserialized from `strobe.toml`.

use serde::Deserialize;
use std::path::PathBuf;
use strobe_flash::FlashConfig;
use strobe_sim::HarnessConfig;

/// The top-level run configuration parsed from `strobe.toml`.
///
/// Every table may be omitted; missing keys take their defaults.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StrobeConfig {
    /// Wait budgets and settle counts for the harness primitives.
    #[serde(default)]
    pub harness: BudgetConfig,
    /// Reset sequencing and end-of-run idle.
    #[serde(default)]
    pub reset: ResetConfig,
    /// Reference device parameters.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Waveform trace output.
    #[serde(default)]
    pub trace: TraceConfig,
}

impl StrobeConfig {
    /// Harness budgets assembled from the `[harness]`, `[reset]` and `[device]` tables.
    pub fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            status_budget: self.harness.status_budget,
            push_budget: self.harness.push_budget,
            pop_budget: self.harness.pop_budget,
            clear_settle_cycles: self.harness.clear_settle_cycles,
            flush_hold_cycles: self.harness.flush_hold_cycles,
            flush_settle_cycles: self.harness.flush_settle_cycles,
            reset_assert_cycles: self.reset.assert_cycles,
            reset_release_cycles: self.reset.release_cycles,
            tail_cycles: self.reset.tail_cycles,
            prescaler: self.device.prescaler,
        }
    }

    /// Reference device parameters from the `[device]` table.
    pub fn flash_config(&self) -> FlashConfig {
        FlashConfig {
            tx_fifo_depth: self.device.tx_fifo_depth,
            rx_fifo_depth: self.device.rx_fifo_depth,
            flash_size: self.device.flash_size,
        }
    }
}

/// The `[harness]` table.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BudgetConfig {
    /// Attempts allowed to the status wait, in cycles.
    pub status_budget: u32,
    /// Cycles a push may wait for `tx_ready`.
    pub push_budget: u32,
    /// Cycles a pop may wait for `rx_valid`.
    pub pop_budget: u32,
    /// Idle cycles after a status-clear pulse.
    pub clear_settle_cycles: u32,
    /// Cycles a flush strobe is held.
    pub flush_hold_cycles: u32,
    /// Idle cycles after a flush strobe is released.
    pub flush_settle_cycles: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        let defaults = HarnessConfig::default();
        Self {
            status_budget: defaults.status_budget,
            push_budget: defaults.push_budget,
            pop_budget: defaults.pop_budget,
            clear_settle_cycles: defaults.clear_settle_cycles,
            flush_hold_cycles: defaults.flush_hold_cycles,
            flush_settle_cycles: defaults.flush_settle_cycles,
        }
    }
}

/// The `[reset]` table.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ResetConfig {
    /// Cycles reset is held asserted.
    pub assert_cycles: u32,
    /// Cycles idled after reset is released.
    pub release_cycles: u32,
    /// Idle cycles before the trace is closed.
    pub tail_cycles: u32,
}

impl Default for ResetConfig {
    fn default() -> Self {
        let defaults = HarnessConfig::default();
        Self {
            assert_cycles: defaults.reset_assert_cycles,
            release_cycles: defaults.reset_release_cycles,
            tail_cycles: defaults.tail_cycles,
        }
    }
}

/// The `[device]` table.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// SCLK half-period in system cycles.
    pub prescaler: u8,
    /// Transmit FIFO depth in words.
    pub tx_fifo_depth: usize,
    /// Receive FIFO depth in words.
    pub rx_fifo_depth: usize,
    /// Flash capacity in bytes.
    pub flash_size: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let flash = FlashConfig::default();
        Self {
            prescaler: HarnessConfig::default().prescaler,
            tx_fifo_depth: flash.tx_fifo_depth,
            rx_fifo_depth: flash.rx_fifo_depth,
            flash_size: flash.flash_size,
        }
    }
}

/// The `[trace]` table.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Whether a waveform is written at all.
    pub enabled: bool,
    /// Destination of the VCD file.
    pub path: PathBuf,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("waveform.vcd"),
        }
    }
}
