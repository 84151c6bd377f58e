//! signalkit Settings Crate
//!
//! Loads, validates and saves the runtime configuration: event bus policy
//! and history, worker-pool sizing and logging.

pub mod config;
pub mod error;

pub use config::{Config, LoggingSettings, LOG_LEVELS};
pub use error::{SettingsError, SettingsResult};
