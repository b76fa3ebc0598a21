//! Error handling module for the installer
//!
//! Provides the installer's error type using thiserror. Library code returns
//! `InstallError`; file loading and CLI glue layer `anyhow` context on top.

use crate::config::ConfigField;
use crate::install_state::InstallTransitionError;
use thiserror::Error;

/// Main error type for the installer
#[derive(Error, Debug)]
pub enum InstallError {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Process lacks root privileges and no sudo credential was supplied
    #[error("Must be run as root (or with --sudo)")]
    NotRoot,

    /// Host was not booted through UEFI firmware
    #[error("UEFI required: {path} does not exist")]
    NotUefi { path: String },

    /// Tools the pipeline shells out to are not installed
    #[error("Required binaries not found in PATH: {}", .0.join(", "))]
    MissingBinaries(Vec<String>),

    /// A privileged command exited non-zero
    #[error("Command failed with exit code {exit_code}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// A command could not be started at all
    #[error("Failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// `blkid` produced no UUID for a partition
    #[error("No filesystem UUID reported for {device}")]
    MissingUuid { device: String },

    /// Required configuration fields are still empty after resolution
    #[error("Configuration incomplete, missing: {}", join_fields(.0))]
    MissingFields(Vec<ConfigField>),

    /// Configuration errors (loading, parsing)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (user input, config values)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A catalog field received a value outside its catalog
    #[error("Unknown {field} value: '{value}'")]
    UnknownValue { field: ConfigField, value: String },

    /// Interactive prompt failed (closed terminal, etc.)
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// User declined a destructive confirmation
    #[error("Installation cancelled: {0}")]
    Cancelled(String),

    /// Install state machine transition errors
    #[error("Install transition error: {0}")]
    Transition(#[from] InstallTransitionError),
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallError>;

fn join_fields(fields: &[ConfigField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// Convenient error constructors
impl InstallError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a prompt error
    pub fn prompt(msg: impl Into<String>) -> Self {
        Self::Prompt(msg.into())
    }

    /// True for failures detected before any destructive action
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotRoot | Self::NotUefi { .. } | Self::MissingBinaries(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InstallError::config("invalid key");
        assert_eq!(err.to_string(), "Configuration error: invalid key");

        let err = InstallError::validation("hostname too long");
        assert_eq!(err.to_string(), "Validation error: hostname too long");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: InstallError = io_err.into();
        assert!(matches!(err, InstallError::Io(_)));
    }

    #[test]
    fn test_command_failed_mentions_command_and_stderr() {
        let err = InstallError::CommandFailed {
            command: "mkfs.btrfs -f /dev/sda2".into(),
            exit_code: 1,
            stderr: "device busy".into(),
        };
        let text = err.to_string();
        assert!(text.contains("mkfs.btrfs -f /dev/sda2"));
        assert!(text.contains("device busy"));
        assert!(text.contains("exit code 1"));
    }

    #[test]
    fn test_missing_fields_lists_every_field() {
        let err = InstallError::MissingFields(vec![ConfigField::Hostname, ConfigField::Kernel]);
        assert_eq!(
            err.to_string(),
            "Configuration incomplete, missing: hostname, kernel"
        );
    }

    #[test]
    fn test_precondition_classification() {
        assert!(InstallError::NotRoot.is_precondition());
        assert!(
            InstallError::NotUefi {
                path: "/sys/firmware/efi".into()
            }
            .is_precondition()
        );
        assert!(!InstallError::validation("x").is_precondition());
    }
}
