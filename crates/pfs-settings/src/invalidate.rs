//! Cache reset collaborator.
//!
//! Changing the page or cache size invalidates size-dependent cache state. The
//! registry signals that synchronously through [`CacheInvalidator`]; the cache
//! engine itself lives outside this crate.

use serde::Serialize;
use tokio::sync::broadcast;

/// Default number of buffered reset notices per subscriber.
const DEFAULT_RESET_CAPACITY: usize = 16;

/// Notice that cache geometry changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheReset {
    /// Setting whose write triggered the reset.
    pub setting: &'static str,
    /// Page size in effect after the write.
    pub page_size: u64,
    /// Cache size in effect after the write.
    pub cache_size: u64,
}

/// Receiver of cache reset signals.
pub trait CacheInvalidator: Send + Sync {
    /// Drop any cache state that depends on the previous geometry.
    fn reset_cache(&self, reset: CacheReset);
}

/// Invalidator that ignores every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn reset_cache(&self, _reset: CacheReset) {}
}

/// Invalidator fanning resets out over a `tokio::broadcast` channel.
///
/// Sending never blocks; with no subscriber the notice is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastInvalidator {
    sender: broadcast::Sender<CacheReset>,
}

impl BroadcastInvalidator {
    /// Channel buffering `capacity` notices per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Channel with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RESET_CAPACITY)
    }

    /// Subscribe to future reset notices.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheReset> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastInvalidator {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheInvalidator for BroadcastInvalidator {
    fn reset_cache(&self, reset: CacheReset) {
        let _ = self.sender.send(reset);
    }
}
