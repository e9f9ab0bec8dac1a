//! # Design
//!
//! - Two outcomes only: the name is unknown, or the value was refused.
//! - Keep messages constant; carry the setting, reason and value as fields so
//!   the filesystem adapter can map them onto its own failure codes.

use pfs_config::ConfigError;
use thiserror::Error;

const ENOENT: i32 = 2;
const EINVAL: i32 = 22;

/// Result alias for registry operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// No setting carries the requested name.
    #[error("setting not found")]
    NotFound {
        /// Name that failed to resolve.
        name: String,
    },
    /// The written value failed validation or the setting is read-only.
    #[error("invalid setting value")]
    InvalidValue {
        /// Setting that rejected the write.
        name: &'static str,
        /// Machine-readable reason for the rejection.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

/// Coarse classification of [`SettingsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown setting name.
    NotFound,
    /// Rejected value.
    InvalidValue,
}

impl SettingsError {
    /// Classification of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidValue { .. } => ErrorKind::InvalidValue,
        }
    }

    /// POSIX errno the filesystem adapter should report (`ENOENT` or `EINVAL`).
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self.kind() {
            ErrorKind::NotFound => ENOENT,
            ErrorKind::InvalidValue => EINVAL,
        }
    }

    /// Machine-readable reason (`not_found` for unknown names).
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidValue { reason, .. } => *reason,
        }
    }
}

impl From<ConfigError> for SettingsError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidField {
                field,
                reason,
                value,
            } => Self::InvalidValue {
                name: field,
                reason,
                value,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_errno() {
        let missing = SettingsError::NotFound {
            name: "nope".into(),
        };
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(missing.errno(), ENOENT);
        assert_eq!(missing.reason(), "not_found");
        assert_eq!(missing.to_string(), "setting not found");

        let invalid = SettingsError::InvalidValue {
            name: "events",
            reason: "read_only",
            value: None,
        };
        assert_eq!(invalid.kind(), ErrorKind::InvalidValue);
        assert_eq!(invalid.errno(), EINVAL);
        assert_eq!(invalid.reason(), "read_only");
    }

    #[test]
    fn config_errors_become_invalid_values() {
        let config = pfs_config::parse_unsigned("cache_size", "lots").unwrap_err();
        let err = SettingsError::from(config);
        assert_eq!(
            err,
            SettingsError::InvalidValue {
                name: "cache_size",
                reason: "not_a_number",
                value: Some("lots".into()),
            }
        );
    }
}
