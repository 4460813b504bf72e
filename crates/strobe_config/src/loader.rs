//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::StrobeConfig;
use std::io::ErrorKind;
use std::path::Path;

/// File name looked up when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "strobe.toml";

const MIN_FLASH_SIZE: u32 = 64 * 1024;
const MAX_FLASH_SIZE: u32 = 16 * 1024 * 1024;

/// Loads and validates a `strobe.toml` configuration.
///
/// A missing file is not an error: the defaults are returned instead.
pub fn load_config(path: &Path) -> Result<StrobeConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StrobeConfig::default()),
        Err(e) => return Err(e.into()),
    };
    load_config_from_str(&content)
}

/// Parses and validates a `strobe.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<StrobeConfig, ConfigError> {
    let config: StrobeConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn at_least_one(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be at least 1"
        )));
    }
    Ok(())
}

/// Checks budgets, device geometry and the trace destination.
fn validate_config(config: &StrobeConfig) -> Result<(), ConfigError> {
    let harness = &config.harness;
    at_least_one("harness.status_budget", harness.status_budget.into())?;
    at_least_one("harness.push_budget", harness.push_budget.into())?;
    at_least_one("harness.pop_budget", harness.pop_budget.into())?;

    let device = &config.device;
    at_least_one("device.prescaler", device.prescaler.into())?;
    at_least_one("device.tx_fifo_depth", device.tx_fifo_depth as u64)?;
    at_least_one("device.rx_fifo_depth", device.rx_fifo_depth as u64)?;

    let size = device.flash_size;
    if !size.is_power_of_two() || !(MIN_FLASH_SIZE..=MAX_FLASH_SIZE).contains(&size) {
        return Err(ConfigError::ValidationError(format!(
            "device.flash_size must be a power of two between {MIN_FLASH_SIZE} and {MAX_FLASH_SIZE}, got {size}"
        )));
    }

    if config.trace.enabled && config.trace.path.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("trace.path".to_string()));
    }
    Ok(())
}
