//! Validation helpers and parsing utilities for runtime parameters.

use crate::defaults::{CACHE_PAGES_FLOOR, MAX_CACHE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::error::{ConfigError, ConfigResult};

/// Parse a base-10 unsigned integer written to a settings file.
///
/// Surrounding ASCII whitespace (including the newline `echo` appends) is
/// ignored. Empty or non-numeric text is rejected instead of being read as zero.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] with reason `not_a_number` when the
/// text is not an unsigned integer.
pub fn parse_unsigned(field: &'static str, text: &str) -> ConfigResult<u64> {
    let trimmed = text.trim_ascii();
    trimmed
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid(field, "not_a_number", trimmed))
}

/// Parse a boolean-ish token. Integers map to `true` when nonzero; the words
/// `true/yes/on` and `false/no/off` are also understood. Anything else is
/// `false`, so writing a flag never fails.
#[must_use]
pub fn parse_flag(text: &str) -> bool {
    let token = text.trim_ascii().to_ascii_lowercase();
    if let Ok(number) = token.parse::<i64>() {
        return number != 0;
    }
    matches!(token.as_str(), "true" | "yes" | "on")
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn validate_page_size(page_size: u64, cache_size: u64) -> ConfigResult<()> {
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ConfigError::invalid("page_size", "out_of_range", page_size));
    }
    if !page_size.is_power_of_two() {
        return Err(ConfigError::invalid(
            "page_size",
            "not_power_of_two",
            page_size,
        ));
    }
    if cache_size < page_size.saturating_mul(CACHE_PAGES_FLOOR) {
        return Err(ConfigError::invalid(
            "page_size",
            "cache_below_page_floor",
            page_size,
        ));
    }
    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn validate_cache_size(cache_size: u64, page_size: u64) -> ConfigResult<()> {
    if cache_size < page_size.saturating_mul(CACHE_PAGES_FLOOR) {
        return Err(ConfigError::invalid(
            "cache_size",
            "below_page_floor",
            cache_size,
        ));
    }
    if cache_size > MAX_CACHE_SIZE {
        return Err(ConfigError::invalid(
            "cache_size",
            "above_maximum",
            cache_size,
        ));
    }
    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn validate_readahead_min(min: u64, current_max: u64) -> ConfigResult<()> {
    if min > current_max {
        return Err(ConfigError::invalid(
            "readahead_min",
            "exceeds_readahead_max",
            min,
        ));
    }
    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn validate_readahead_max(max: u64, current_min: u64) -> ConfigResult<()> {
    if max < current_min {
        return Err(ConfigError::invalid(
            "readahead_max",
            "below_readahead_min",
            max,
        ));
    }
    Ok(())
}
