//! Limits and default values for runtime parameters.
//!
//! # Design
//! - Keep every numeric bound in one place so validation and docs agree.
//! - Defaults must satisfy the same rules enforced on writes.

/// Smallest accepted cache page size in bytes.
pub const MIN_PAGE_SIZE: u64 = 1024;
/// Largest accepted cache page size in bytes.
pub const MAX_PAGE_SIZE: u64 = 4 * 1024 * 1024;
/// Largest accepted cache size in bytes.
pub const MAX_CACHE_SIZE: u64 = 4 * 1024 * 1024 * 1024;
/// The cache must hold at least this many pages.
pub const CACHE_PAGES_FLOOR: u64 = 4;

pub(crate) const DEFAULT_PAGE_SIZE: u64 = 64 * 1024;
pub(crate) const DEFAULT_CACHE_SIZE: u64 = 256 * 1024 * 1024;
pub(crate) const DEFAULT_READAHEAD_MIN: u64 = 64 * 1024;
pub(crate) const DEFAULT_READAHEAD_MAX: u64 = 8 * 1024 * 1024;
pub(crate) const DEFAULT_READAHEAD_MAX_SEC: u64 = 8;
pub(crate) const DEFAULT_USE_SSL: bool = true;
