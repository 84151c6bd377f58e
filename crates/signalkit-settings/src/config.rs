//! Configuration for signalkit
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats, chosen by file extension.
//!
//! Configuration is organized into logical sections:
//! - Event bus (failure policy, lifecycle history)
//! - Work bridge (worker-pool sizing)
//! - Logging (level, output format)

use crate::error::{SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use signalkit_core::{ensure, BridgeConfig};
use signalkit_events::EventBusConfig;
use std::path::Path;

/// Log levels accepted as the default filter directive
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Logging preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Include thread ids in each record
    pub with_thread_ids: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            with_thread_ids: true,
        }
    }
}

/// Complete runtime configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Event bus settings
    pub event_bus: EventBusConfig,
    /// Worker-pool settings
    pub work_bridge: BridgeConfig,
    /// Logging preferences
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)?;
        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        ensure::<SettingsError>(
            self.event_bus.max_history_size > 0,
            "Event bus history size must be > 0",
        )?;

        ensure::<SettingsError>(
            self.work_bridge.worker_threads > 0,
            "Work bridge worker threads must be > 0",
        )?;
        ensure::<SettingsError>(
            self.work_bridge.max_blocking_threads > 0,
            "Work bridge blocking threads must be > 0",
        )?;
        ensure::<SettingsError>(
            !self.work_bridge.thread_name.is_empty(),
            "Work bridge thread name must not be empty",
        )?;

        let level = self.logging.level.to_ascii_lowercase();
        ensure::<SettingsError>(
            LOG_LEVELS.contains(&level.as_str()),
            format!("Unknown log level '{}'", self.logging.level),
        )?;

        Ok(())
    }
}
