//! Error types for generator management.

use pktgen_table::TableError;
use pktgen_types::{DevPort, PortRange};
use thiserror::Error;

use crate::types::AppId;

/// Result type alias for generator operations.
pub type PktgenResult<T> = Result<T, PktgenError>;

/// Errors raised while configuring or driving generator applications.
#[derive(Debug, Error)]
pub enum PktgenError {
    /// A configuration field was outside its domain.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// A trigger name outside the supported set.
    #[error("Unsupported trigger '{0}'")]
    UnsupportedTrigger(String),

    /// The port cannot host a packet generator.
    #[error("Port {port} is not a generator port (valid range {range})")]
    PortOutOfRange { port: DevPort, range: PortRange },

    #[error("Application {0} is not registered")]
    NotRegistered(AppId),

    #[error("Application {0} is already running")]
    AlreadyRunning(AppId),

    #[error("Application {0} is not running")]
    NotRunning(AppId),

    /// The device disagreed with a write that was just issued.
    #[error("Hardware mismatch in {table}:{key} field {field}: expected {expected}, got {actual}")]
    HardwareMismatch {
        table: String,
        key: String,
        field: String,
        expected: String,
        actual: String,
    },

    /// Failure reported by the table gateway, unmodified.
    #[error(transparent)]
    Gateway(#[from] TableError),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PktgenError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a hardware mismatch error.
    pub fn hardware_mismatch(
        table: impl Into<String>,
        key: impl ToString,
        field: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::HardwareMismatch {
            table: table.into(),
            key: key.to_string(),
            field: field.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Returns true if the current operation must be abandoned: the device
    /// state no longer matches what was programmed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PktgenError::HardwareMismatch { .. })
    }

    /// Returns true for start/stop issued in the wrong state.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            PktgenError::AlreadyRunning(_) | PktgenError::NotRunning(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PktgenError::PortOutOfRange {
            port: 72,
            range: PortRange::TOFINO,
        };
        assert_eq!(
            err.to_string(),
            "Port 72 is not a generator port (valid range 68-71)"
        );

        let err = PktgenError::hardware_mismatch("port_cfg", "dev_port=68", "pktgen_enable", true, false);
        assert_eq!(
            err.to_string(),
            "Hardware mismatch in port_cfg:dev_port=68 field pktgen_enable: expected true, got false"
        );
    }

    #[test]
    fn test_gateway_error_is_transparent() {
        let err: PktgenError = TableError::not_found("app_cfg", "app_id=1").into();
        assert_eq!(err.to_string(), "Table entry not found: app_cfg:app_id=1");
    }

    #[test]
    fn test_classification() {
        assert!(PktgenError::hardware_mismatch("t", "k", "f", 1, 2).is_fatal());
        assert!(!PktgenError::NotRegistered(1).is_fatal());
        assert!(PktgenError::AlreadyRunning(1).is_misuse());
        assert!(PktgenError::NotRunning(1).is_misuse());
        assert!(!PktgenError::UnsupportedTrigger("x".into()).is_misuse());
    }
}
