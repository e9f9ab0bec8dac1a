//! Environment overrides for the startup parameter set.
//!
//! # Design
//! - Start from the documented defaults and overlay `PFS_*` variables.
//! - Parse with the same helpers used for file writes so malformed values
//!   fail the same way.

use crate::error::ConfigResult;
use crate::model::SettingsSnapshot;
use crate::validate::{parse_flag, parse_unsigned};

/// Environment variable overriding the page size.
pub const ENV_PAGE_SIZE: &str = "PFS_PAGE_SIZE";
/// Environment variable overriding the cache size.
pub const ENV_CACHE_SIZE: &str = "PFS_CACHE_SIZE";
/// Environment variable overriding the lower read-ahead bound.
pub const ENV_READAHEAD_MIN: &str = "PFS_READAHEAD_MIN";
/// Environment variable overriding the upper read-ahead bound.
pub const ENV_READAHEAD_MAX: &str = "PFS_READAHEAD_MAX";
/// Environment variable overriding the read-ahead bound in seconds.
pub const ENV_READAHEAD_MAX_SEC: &str = "PFS_READAHEAD_MAX_SEC";
/// Environment variable toggling TLS.
pub const ENV_USE_SSL: &str = "PFS_USE_SSL";

impl SettingsSnapshot {
    /// Load the startup parameters from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the resulting set breaks
    /// a parameter rule.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the startup parameters through an arbitrary lookup function.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is malformed or the resulting set breaks a
    /// parameter rule.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut snapshot = Self::default();
        let unsigned = |env: &str, field: &'static str, slot: &mut u64| -> ConfigResult<()> {
            if let Some(raw) = lookup(env) {
                *slot = parse_unsigned(field, &raw)?;
            }
            Ok(())
        };

        unsigned(ENV_PAGE_SIZE, "page_size", &mut snapshot.page_size)?;
        unsigned(ENV_CACHE_SIZE, "cache_size", &mut snapshot.cache_size)?;
        unsigned(ENV_READAHEAD_MIN, "readahead_min", &mut snapshot.readahead_min)?;
        unsigned(ENV_READAHEAD_MAX, "readahead_max", &mut snapshot.readahead_max)?;
        unsigned(
            ENV_READAHEAD_MAX_SEC,
            "readahead_max_sec",
            &mut snapshot.readahead_max_sec,
        )?;
        if let Some(raw) = lookup(ENV_USE_SSL) {
            snapshot.use_ssl = parse_flag(&raw);
        }

        snapshot.validate()?;
        Ok(snapshot)
    }
}
