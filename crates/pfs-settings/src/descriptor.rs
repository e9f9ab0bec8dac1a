//! Setting descriptor table.
//!
//! Each descriptor binds a file name to a getter that formats the live value
//! into a caller buffer and a setter that parses, validates and commits a new
//! value. The table is fixed at compile time; its order is the directory
//! listing order.

use std::sync::Arc;

use pfs_config::{FsSettings, parse_flag, parse_unsigned};
use pfs_events::EventQueue;
use pfs_telemetry::Metrics;

use crate::error::{SettingsError, SettingsResult};
use crate::invalidate::{CacheInvalidator, CacheReset};

/// Name of the read-only diagnostic event stream.
pub const EVENTS_SETTING: &str = "events";

type GetFn = fn(&SettingsContext, &mut [u8]) -> usize;
type SetFn = fn(&SettingsContext, &str) -> SettingsResult<()>;

/// Collaborators reachable from getters and setters.
pub(crate) struct SettingsContext {
    pub(crate) settings: Arc<FsSettings>,
    pub(crate) events: EventQueue,
    pub(crate) invalidator: Arc<dyn CacheInvalidator>,
    pub(crate) metrics: Metrics,
}

impl SettingsContext {
    fn reset_cache(&self, setting: &'static str) {
        self.metrics.inc_cache_reset(setting);
        self.invalidator.reset_cache(CacheReset {
            setting,
            page_size: self.settings.page_size(),
            cache_size: self.settings.cache_size(),
        });
    }
}

/// Immutable definition of one virtual settings file.
pub struct SettingDescriptor {
    name: &'static str,
    get: GetFn,
    set: SetFn,
    supports_stat: bool,
}

impl SettingDescriptor {
    /// File name of the setting.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the initial `stat` size is measured by calling the getter.
    ///
    /// Reading the event stream consumes it, so `events` is sized from the
    /// queue's head gauge instead.
    #[must_use]
    pub const fn supports_stat(&self) -> bool {
        self.supports_stat
    }

    pub(crate) fn read(&self, context: &SettingsContext, buf: &mut [u8]) -> usize {
        (self.get)(context, buf)
    }

    pub(crate) fn write(&self, context: &SettingsContext, text: &str) -> SettingsResult<()> {
        (self.set)(context, text)
    }
}

static DESCRIPTORS: [SettingDescriptor; 7] = [
    SettingDescriptor {
        name: "page_size",
        get: get_page_size,
        set: set_page_size,
        supports_stat: true,
    },
    SettingDescriptor {
        name: "cache_size",
        get: get_cache_size,
        set: set_cache_size,
        supports_stat: true,
    },
    SettingDescriptor {
        name: "readahead_min",
        get: get_readahead_min,
        set: set_readahead_min,
        supports_stat: true,
    },
    SettingDescriptor {
        name: "readahead_max",
        get: get_readahead_max,
        set: set_readahead_max,
        supports_stat: true,
    },
    SettingDescriptor {
        name: "readahead_max_sec",
        get: get_readahead_max_sec,
        set: set_readahead_max_sec,
        supports_stat: true,
    },
    SettingDescriptor {
        name: "use_ssl",
        get: get_use_ssl,
        set: set_use_ssl,
        supports_stat: true,
    },
    SettingDescriptor {
        name: EVENTS_SETTING,
        get: get_events,
        set: set_events,
        supports_stat: false,
    },
];

/// Every descriptor in listing order.
#[must_use]
pub fn descriptors() -> &'static [SettingDescriptor] {
    &DESCRIPTORS
}

pub(crate) fn find(name: &str) -> Option<(usize, &'static SettingDescriptor)> {
    DESCRIPTORS
        .iter()
        .enumerate()
        .find(|(_, descriptor)| descriptor.name == name)
}

fn copy_truncated(text: &[u8], buf: &mut [u8]) -> usize {
    let len = text.len().min(buf.len());
    buf[..len].copy_from_slice(&text[..len]);
    len
}

fn write_unsigned(buf: &mut [u8], value: u64) -> usize {
    copy_truncated(format!("{value}\n").as_bytes(), buf)
}

fn write_flag(buf: &mut [u8], flag: bool) -> usize {
    copy_truncated(if flag { b"1\n" } else { b"0\n" }, buf)
}

fn get_page_size(context: &SettingsContext, buf: &mut [u8]) -> usize {
    write_unsigned(buf, context.settings.page_size())
}

fn set_page_size(context: &SettingsContext, text: &str) -> SettingsResult<()> {
    let value = parse_unsigned("page_size", text)?;
    context.settings.set_page_size(value)?;
    context.reset_cache("page_size");
    Ok(())
}

fn get_cache_size(context: &SettingsContext, buf: &mut [u8]) -> usize {
    write_unsigned(buf, context.settings.cache_size())
}

fn set_cache_size(context: &SettingsContext, text: &str) -> SettingsResult<()> {
    let value = parse_unsigned("cache_size", text)?;
    context.settings.set_cache_size(value)?;
    context.reset_cache("cache_size");
    Ok(())
}

fn get_readahead_min(context: &SettingsContext, buf: &mut [u8]) -> usize {
    write_unsigned(buf, context.settings.readahead_min())
}

fn set_readahead_min(context: &SettingsContext, text: &str) -> SettingsResult<()> {
    let value = parse_unsigned("readahead_min", text)?;
    context.settings.set_readahead_min(value)?;
    Ok(())
}

fn get_readahead_max(context: &SettingsContext, buf: &mut [u8]) -> usize {
    write_unsigned(buf, context.settings.readahead_max())
}

fn set_readahead_max(context: &SettingsContext, text: &str) -> SettingsResult<()> {
    let value = parse_unsigned("readahead_max", text)?;
    context.settings.set_readahead_max(value)?;
    Ok(())
}

fn get_readahead_max_sec(context: &SettingsContext, buf: &mut [u8]) -> usize {
    write_unsigned(buf, context.settings.readahead_max_sec())
}

fn set_readahead_max_sec(context: &SettingsContext, text: &str) -> SettingsResult<()> {
    let value = parse_unsigned("readahead_max_sec", text)?;
    context.settings.set_readahead_max_sec(value);
    Ok(())
}

fn get_use_ssl(context: &SettingsContext, buf: &mut [u8]) -> usize {
    write_flag(buf, context.settings.use_ssl())
}

fn set_use_ssl(context: &SettingsContext, text: &str) -> SettingsResult<()> {
    context.settings.set_use_ssl(parse_flag(text));
    Ok(())
}

fn get_events(context: &SettingsContext, buf: &mut [u8]) -> usize {
    let written = context.events.read_into(buf);
    context.metrics.add_event_bytes_read(written);
    context.metrics.set_queue_depth(context.events.len());
    written
}

fn set_events(_context: &SettingsContext, _text: &str) -> SettingsResult<()> {
    Err(SettingsError::InvalidValue {
        name: EVENTS_SETTING,
        reason: "read_only",
        value: None,
    })
}
