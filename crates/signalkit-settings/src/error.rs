//! Error types for the settings crate.

use signalkit_core::AssertionError;
use std::io;
use thiserror::Error;

/// Errors that can occur while loading, saving or validating settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The file extension names no supported format.
    #[error("Unsupported config format: {0} (expected .json or .toml)")]
    UnsupportedFormat(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}

impl AssertionError for SettingsError {
    fn from_assertion(message: String) -> Self {
        SettingsError::Validation(message)
    }
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_error_display() {
        let err = SettingsError::UnsupportedFormat("yaml".to_string());
        assert_eq!(
            err.to_string(),
            "Unsupported config format: yaml (expected .json or .toml)"
        );

        let err = SettingsError::Validation("history size must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: history size must be > 0"
        );
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let settings_err: SettingsError = io_err.into();
        assert!(matches!(settings_err, SettingsError::IoError(_)));

        let settings_err = signalkit_core::ensure::<SettingsError>(false, "bad").unwrap_err();
        assert!(matches!(settings_err, SettingsError::Validation(m) if m == "bad"));
    }
}
