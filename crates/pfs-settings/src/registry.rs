//! Public facade consumed by the filesystem adapter.
//!
//! # Design
//! - Construction is the one-time initialisation step: the metadata table is
//!   built before the registry value exists, so no call can observe it
//!   half-built.
//! - Names resolve by exact match against the descriptor table; the root
//!   sentinel (`""` or `"/"`) resolves to the directory itself.
//! - Only the event stream takes a lock. Scalar reads and writes go straight
//!   to the shared atomics.

use std::sync::Arc;

use pfs_config::{FsSettings, SettingsSnapshot};
use pfs_events::{AppendReceipt, Clock, EventQueue, SystemClock};
use pfs_telemetry::Metrics;
use tracing::info;

use crate::descriptor::{SettingDescriptor, SettingsContext, descriptors, find};
use crate::error::{SettingsError, SettingsResult};
use crate::invalidate::CacheInvalidator;
use crate::metadata::{FileAttr, MetadataStore, OwnerIdentity, SCRATCH_LEN};

/// Registry of virtual settings files.
pub struct SettingsRegistry {
    context: SettingsContext,
    metadata: MetadataStore,
    clock: Arc<dyn Clock>,
}

impl SettingsRegistry {
    /// Build the registry and its metadata table.
    #[must_use]
    pub fn new(
        settings: Arc<FsSettings>,
        events: EventQueue,
        invalidator: Arc<dyn CacheInvalidator>,
        metrics: Metrics,
    ) -> Self {
        Self::with_clock(settings, events, invalidator, metrics, Arc::new(SystemClock))
    }

    /// Build the registry with a custom clock for metadata timestamps.
    #[must_use]
    pub fn with_clock(
        settings: Arc<FsSettings>,
        events: EventQueue,
        invalidator: Arc<dyn CacheInvalidator>,
        metrics: Metrics,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let context = SettingsContext {
            settings,
            events,
            invalidator,
            metrics,
        };
        let metadata = MetadataStore::build(&context, OwnerIdentity::current(), clock.now());
        Self {
            context,
            metadata,
            clock,
        }
    }

    /// Setting names in listing order.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        descriptors().iter().map(SettingDescriptor::name).collect()
    }

    /// Attributes of `name`, or of the settings directory for the root sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NotFound`] for an unknown name.
    pub fn stat_for(&self, name: &str) -> SettingsResult<FileAttr> {
        if is_root(name) {
            return Ok(self.metadata.directory());
        }
        let (index, _) = lookup(name)?;
        Ok(self.metadata.stat(index))
    }

    /// Render `name` into `buf`, returning the number of bytes written.
    ///
    /// Reading `events` consumes the stream: call repeatedly until it returns 0
    /// to drain the log.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NotFound`] for an unknown name.
    pub fn get(&self, name: &str, buf: &mut [u8]) -> SettingsResult<usize> {
        let (_, descriptor) = lookup(name)?;
        Ok(descriptor.read(&self.context, buf))
    }

    /// Read `name` once through a scratch buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NotFound`] for an unknown name.
    pub fn read_value(&self, name: &str) -> SettingsResult<Vec<u8>> {
        let mut buf = vec![0_u8; SCRATCH_LEN];
        let written = self.get(name, &mut buf)?;
        buf.truncate(written);
        Ok(buf)
    }

    /// Validate and commit `value` to `name`, then resync its `stat` size with
    /// what the getter now renders.
    ///
    /// Rejections are returned and counted, never logged, so a refused write
    /// leaves the `events` stream untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NotFound`] for an unknown name and
    /// [`SettingsError::InvalidValue`] when the value is refused or the setting
    /// is read-only.
    pub fn set(&self, name: &str, value: &[u8]) -> SettingsResult<()> {
        let (index, descriptor) = lookup(name)?;
        let outcome = std::str::from_utf8(value)
            .map_err(|_| SettingsError::InvalidValue {
                name: descriptor.name(),
                reason: "not_utf8",
                value: None,
            })
            .and_then(|text| descriptor.write(&self.context, text));

        match outcome {
            Ok(()) => {
                let mut scratch = vec![0_u8; SCRATCH_LEN];
                let size = descriptor.read(&self.context, &mut scratch) as u64;
                self.metadata.resync(index, size, self.clock.now());
                self.context
                    .metrics
                    .inc_setting_write(descriptor.name(), "ok");
                info!(setting = descriptor.name(), size, "setting updated");
                Ok(())
            }
            Err(err) => {
                self.context
                    .metrics
                    .inc_setting_write(descriptor.name(), "invalid");
                Err(err)
            }
        }
    }

    /// Publish a diagnostic event assembled from `parts`.
    pub fn append_event<I, B>(&self, parts: I) -> AppendReceipt
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let receipt = self.context.events.append(parts);
        self.context.metrics.observe_append(&receipt);
        receipt
    }

    /// Copy of every live parameter.
    #[must_use]
    pub fn snapshot(&self) -> SettingsSnapshot {
        self.context.settings.snapshot()
    }

    /// Shared live parameters.
    #[must_use]
    pub const fn settings(&self) -> &Arc<FsSettings> {
        &self.context.settings
    }

    /// Event queue behind the `events` file.
    #[must_use]
    pub const fn events(&self) -> &EventQueue {
        &self.context.events
    }

    /// Metrics recorded by the registry.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.context.metrics
    }
}

fn is_root(name: &str) -> bool {
    name.is_empty() || name == "/"
}

fn lookup(name: &str) -> SettingsResult<(usize, &'static SettingDescriptor)> {
    let bare = name.strip_prefix('/').unwrap_or(name);
    find(bare).ok_or_else(|| SettingsError::NotFound {
        name: bare.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::EVENTS_SETTING;
    use crate::invalidate::NoopInvalidator;
    use crate::metadata::FileKind;

    fn registry() -> SettingsRegistry {
        SettingsRegistry::new(
            Arc::new(FsSettings::default()),
            EventQueue::new(),
            Arc::new(NoopInvalidator),
            Metrics::new().unwrap(),
        )
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SettingsRegistry>();
    }

    #[test]
    fn root_sentinels_resolve_to_the_directory() {
        let registry = registry();
        for root in ["", "/"] {
            let attr = registry.stat_for(root).unwrap();
            assert_eq!(attr.kind, FileKind::Directory);
            assert_eq!(attr.nlink, 2);
            assert_eq!(attr.size, registry.list().len() as u64);
        }
    }

    #[test]
    fn leading_slash_is_ignored_on_names() {
        let registry = registry();
        assert_eq!(
            registry.stat_for("/page_size").unwrap(),
            registry.stat_for("page_size").unwrap()
        );
        assert_eq!(registry.read_value("/page_size").unwrap(), b"65536\n");
    }

    #[test]
    fn initial_sizes_match_rendered_values() {
        let registry = registry();
        for name in registry.list() {
            if name == EVENTS_SETTING {
                continue;
            }
            let rendered = registry.read_value(name).unwrap();
            assert_eq!(registry.stat_for(name).unwrap().size, rendered.len() as u64);
        }
        assert_eq!(registry.stat_for(EVENTS_SETTING).unwrap().size, 0);
    }

    #[test]
    fn events_stat_follows_the_head_entry() {
        let registry = registry();
        let _ = registry.append_event([b"first event\n".as_slice()]);
        let _ = registry.append_event([b"second\n".as_slice()]);
        assert_eq!(registry.stat_for(EVENTS_SETTING).unwrap().size, 12);

        let mut buf = [0_u8; 4];
        assert_eq!(registry.get(EVENTS_SETTING, &mut buf).unwrap(), 4);
        assert_eq!(registry.stat_for(EVENTS_SETTING).unwrap().size, 8);

        let mut buf = [0_u8; 64];
        assert_eq!(registry.get(EVENTS_SETTING, &mut buf).unwrap(), 8);
        assert_eq!(registry.stat_for(EVENTS_SETTING).unwrap().size, 7);
    }

    #[test]
    fn non_utf8_writes_are_invalid() {
        let registry = registry();
        let err = registry.set("page_size", &[0xff, 0xfe]).unwrap_err();
        assert_eq!(err.reason(), "not_utf8");
    }

    #[test]
    fn writes_are_counted_by_outcome() {
        let registry = registry();
        registry.set("readahead_max_sec", b"12").unwrap();
        let _ = registry.set("page_size", b"3000");
        assert_eq!(
            registry.metrics().setting_writes("readahead_max_sec", "ok"),
            1
        );
        assert_eq!(registry.metrics().setting_writes("page_size", "invalid"), 1);
    }
}
