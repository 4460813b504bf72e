//! Configuration loading and validation for `strobe.toml` run files.
//!
//! Every section is optional; a missing file or a missing key falls back to
//! the defaults the harness and the reference device ship with.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::{BudgetConfig, DeviceConfig, ResetConfig, StrobeConfig, TraceConfig};
