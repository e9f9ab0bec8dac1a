//! Recording doubles for registry collaborators.

use std::sync::{Mutex, PoisonError};

use pfs_settings::{CacheInvalidator, CacheReset};

/// Invalidator that records every reset it receives.
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    resets: Mutex<Vec<CacheReset>>,
}

impl RecordingInvalidator {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets received so far, oldest first.
    #[must_use]
    pub fn resets(&self) -> Vec<CacheReset> {
        self.resets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of resets received so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.resets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl CacheInvalidator for RecordingInvalidator {
    fn reset_cache(&self, reset: CacheReset) {
        self.resets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reset);
    }
}
