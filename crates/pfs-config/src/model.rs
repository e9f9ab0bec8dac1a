//! Runtime parameter models.
//!
//! # Design
//! - `FsSettings` is the single owned home of the live parameters; consumers
//!   hold it behind an `Arc` and read plain machine words without locking.
//! - Every mutation goes through a validated setter; a check-then-store pair
//!   is not atomic across fields, which is acceptable for a single
//!   administrative writer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_CACHE_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_READAHEAD_MAX, DEFAULT_READAHEAD_MAX_SEC,
    DEFAULT_READAHEAD_MIN, DEFAULT_USE_SSL,
};
use crate::error::ConfigResult;
use crate::validate::{
    validate_cache_size, validate_page_size, validate_readahead_max, validate_readahead_min,
};

/// Point-in-time copy of every runtime parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    /// Cache page size in bytes.
    pub page_size: u64,
    /// Total cache size in bytes.
    pub cache_size: u64,
    /// Lower read-ahead bound in bytes.
    pub readahead_min: u64,
    /// Upper read-ahead bound in bytes.
    pub readahead_max: u64,
    /// Upper read-ahead bound expressed in seconds of streaming.
    pub readahead_max_sec: u64,
    /// Whether the transport uses TLS.
    pub use_ssl: bool,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cache_size: DEFAULT_CACHE_SIZE,
            readahead_min: DEFAULT_READAHEAD_MIN,
            readahead_max: DEFAULT_READAHEAD_MAX,
            readahead_max_sec: DEFAULT_READAHEAD_MAX_SEC,
            use_ssl: DEFAULT_USE_SSL,
        }
    }
}

impl SettingsSnapshot {
    /// Check the snapshot against every cross-field rule.
    ///
    /// # Errors
    ///
    /// Returns the first rule violation found.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_page_size(self.page_size, self.cache_size)?;
        validate_cache_size(self.cache_size, self.page_size)?;
        validate_readahead_min(self.readahead_min, self.readahead_max)?;
        Ok(())
    }
}

/// Live parameters shared with the cache, read-ahead and transport layers.
#[derive(Debug)]
pub struct FsSettings {
    page_size: AtomicU64,
    cache_size: AtomicU64,
    readahead_min: AtomicU64,
    readahead_max: AtomicU64,
    readahead_max_sec: AtomicU64,
    use_ssl: AtomicBool,
}

impl Default for FsSettings {
    fn default() -> Self {
        Self::from_valid(SettingsSnapshot::default())
    }
}

impl FsSettings {
    /// Build live settings from a snapshot after validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot breaks any parameter rule.
    pub fn from_snapshot(snapshot: SettingsSnapshot) -> ConfigResult<Self> {
        snapshot.validate()?;
        Ok(Self::from_valid(snapshot))
    }

    fn from_valid(snapshot: SettingsSnapshot) -> Self {
        Self {
            page_size: AtomicU64::new(snapshot.page_size),
            cache_size: AtomicU64::new(snapshot.cache_size),
            readahead_min: AtomicU64::new(snapshot.readahead_min),
            readahead_max: AtomicU64::new(snapshot.readahead_max),
            readahead_max_sec: AtomicU64::new(snapshot.readahead_max_sec),
            use_ssl: AtomicBool::new(snapshot.use_ssl),
        }
    }

    /// Copy every current value.
    #[must_use]
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            page_size: self.page_size(),
            cache_size: self.cache_size(),
            readahead_min: self.readahead_min(),
            readahead_max: self.readahead_max(),
            readahead_max_sec: self.readahead_max_sec(),
            use_ssl: self.use_ssl(),
        }
    }

    /// Current cache page size in bytes.
    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size.load(Ordering::Relaxed)
    }

    /// Current cache size in bytes.
    #[must_use]
    pub fn cache_size(&self) -> u64 {
        self.cache_size.load(Ordering::Relaxed)
    }

    /// Current lower read-ahead bound.
    #[must_use]
    pub fn readahead_min(&self) -> u64 {
        self.readahead_min.load(Ordering::Relaxed)
    }

    /// Current upper read-ahead bound.
    #[must_use]
    pub fn readahead_max(&self) -> u64 {
        self.readahead_max.load(Ordering::Relaxed)
    }

    /// Current read-ahead bound in seconds.
    #[must_use]
    pub fn readahead_max_sec(&self) -> u64 {
        self.readahead_max_sec.load(Ordering::Relaxed)
    }

    /// Whether the transport should use TLS.
    #[must_use]
    pub fn use_ssl(&self) -> bool {
        self.use_ssl.load(Ordering::Relaxed)
    }

    /// Update the page size. It must be a power of two within
    /// `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]` and the current cache must still hold
    /// `CACHE_PAGES_FLOOR` pages of the new size.
    ///
    /// # Errors
    ///
    /// Returns an error when the value breaks a rule; nothing is stored.
    pub fn set_page_size(&self, value: u64) -> ConfigResult<()> {
        validate_page_size(value, self.cache_size())?;
        self.page_size.store(value, Ordering::Relaxed);
        Ok(())
    }

    /// Update the cache size, checked against the current page size.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is below the page floor or above
    /// `MAX_CACHE_SIZE`; nothing is stored.
    pub fn set_cache_size(&self, value: u64) -> ConfigResult<()> {
        validate_cache_size(value, self.page_size())?;
        self.cache_size.store(value, Ordering::Relaxed);
        Ok(())
    }

    /// Update the lower read-ahead bound.
    ///
    /// # Errors
    ///
    /// Returns an error when the value exceeds the current upper bound.
    pub fn set_readahead_min(&self, value: u64) -> ConfigResult<()> {
        validate_readahead_min(value, self.readahead_max())?;
        self.readahead_min.store(value, Ordering::Relaxed);
        Ok(())
    }

    /// Update the upper read-ahead bound.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is below the current lower bound.
    pub fn set_readahead_max(&self, value: u64) -> ConfigResult<()> {
        validate_readahead_max(value, self.readahead_min())?;
        self.readahead_max.store(value, Ordering::Relaxed);
        Ok(())
    }

    /// Update the read-ahead bound in seconds. Any value is accepted.
    pub fn set_readahead_max_sec(&self, value: u64) {
        self.readahead_max_sec.store(value, Ordering::Relaxed);
    }

    /// Toggle TLS for the transport.
    pub fn set_use_ssl(&self, enabled: bool) {
        self.use_ssl.store(enabled, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let snapshot = SettingsSnapshot::default();
        assert!(snapshot.validate().is_ok());
        assert_eq!(FsSettings::default().snapshot(), snapshot);
    }

    #[test]
    fn from_snapshot_rejects_inverted_readahead() {
        let snapshot = SettingsSnapshot {
            readahead_min: 100,
            readahead_max: 10,
            ..SettingsSnapshot::default()
        };
        let err = FsSettings::from_snapshot(snapshot).unwrap_err();
        assert_eq!(err.field(), "readahead_min");
    }

    #[test]
    fn page_size_change_respects_cache_floor() {
        let settings = FsSettings::default();
        settings.set_page_size(2048).unwrap();
        settings.set_cache_size(8192).unwrap();

        let err = settings.set_page_size(4096).unwrap_err();
        assert_eq!(err.reason(), "cache_below_page_floor");
        assert_eq!(settings.page_size(), 2048);
    }

    #[test]
    fn rejected_writes_leave_values_untouched() {
        let settings = FsSettings::default();
        let before = settings.snapshot();
        assert!(settings.set_page_size(3000).is_err());
        assert!(settings.set_cache_size(1).is_err());
        assert!(settings.set_readahead_min(u64::MAX).is_err());
        assert!(settings.set_readahead_max(0).is_err());
        assert_eq!(settings.snapshot(), before);
    }

    #[test]
    fn readahead_bounds_can_widen_in_either_order() {
        let settings = FsSettings::default();
        settings.set_readahead_min(10).unwrap();
        settings.set_readahead_max(20).unwrap();
        assert!(settings.set_readahead_min(25).is_err());
        assert!(settings.set_readahead_max(5).is_err());
        settings.set_readahead_max(50).unwrap();
        settings.set_readahead_min(30).unwrap();
        assert_eq!((settings.readahead_min(), settings.readahead_max()), (30, 50));
    }

    #[test]
    fn snapshot_serialises_with_field_names() {
        let json = serde_json::to_value(SettingsSnapshot::default()).unwrap();
        assert_eq!(json["page_size"], 65_536);
        assert_eq!(json["use_ssl"], true);
    }
}
