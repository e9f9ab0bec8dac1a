//! # Design
//!
//! - Centralize application-level errors for bootstrap and the console.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use pfs_config::ConfigError;
use pfs_settings::SettingsError;
use pfs_telemetry::TelemetryError;
use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Runtime parameter loading failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: TelemetryError,
    },
    /// A registry call failed where the caller cannot recover.
    #[error("settings operation failed")]
    Settings {
        /// Operation identifier.
        operation: &'static str,
        /// Source registry error.
        source: SettingsError,
    },
    /// Rendering console output failed.
    #[error("encoding failed")]
    Encode {
        /// Operation identifier.
        operation: &'static str,
        /// Source serialization error.
        source: serde_json::Error,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
    /// A command-line or console argument was invalid.
    #[error("invalid argument")]
    InvalidArgument {
        /// Argument that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional value associated with the failure.
        value: Option<String>,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: TelemetryError) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn settings(operation: &'static str, source: SettingsError) -> Self {
        Self::Settings { operation, source }
    }

    pub(crate) const fn encode(operation: &'static str, source: serde_json::Error) -> Self {
        Self::Encode { operation, source }
    }

    pub(crate) const fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }

    pub(crate) fn invalid_argument(
        field: &'static str,
        reason: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            field,
            reason,
            value: Some(value.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn constructors_keep_operation_context() {
        let err = AppError::io("console.write", io::Error::other("closed"));
        assert!(matches!(
            err,
            AppError::Io {
                operation: "console.write",
                ..
            }
        ));
        assert_eq!(err.to_string(), "io operation failed");
        assert!(err.source().is_some());
    }

    #[test]
    fn settings_errors_are_wrapped_with_source() {
        let err = AppError::settings(
            "bootstrap.apply_override",
            SettingsError::NotFound {
                name: "nope".into(),
            },
        );
        assert_eq!(err.to_string(), "settings operation failed");
        assert!(err.source().is_some());
    }

    #[test]
    fn invalid_argument_carries_value() {
        let err = AppError::invalid_argument("set", "missing_separator", "page_size");
        assert!(matches!(
            err,
            AppError::InvalidArgument {
                field: "set",
                reason: "missing_separator",
                value: Some(ref value),
            } if value == "page_size"
        ));
    }
}
