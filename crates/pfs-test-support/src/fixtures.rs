//! Registry harness with a manual clock and a recording invalidator.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use pfs_config::{FsSettings, SettingsSnapshot};
use pfs_events::{EVENT_RETENTION_SECS, EventQueue, ManualClock};
use pfs_settings::SettingsRegistry;
use pfs_telemetry::Metrics;

use crate::mocks::RecordingInvalidator;

/// Fixed instant the harness clock starts at.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0)
        .single()
        .unwrap_or_default()
}

/// Registry wired to test doubles.
pub struct TestRegistry {
    /// Registry under test.
    pub registry: SettingsRegistry,
    /// Clock shared by the registry and its event queue.
    pub clock: Arc<ManualClock>,
    /// Invalidator receiving cache resets.
    pub invalidator: Arc<RecordingInvalidator>,
    /// Live parameters behind the registry.
    pub settings: Arc<FsSettings>,
}

impl TestRegistry {
    /// Harness over the built-in defaults.
    ///
    /// # Panics
    ///
    /// Panics when the metrics registry cannot be built.
    #[must_use]
    pub fn new() -> Self {
        Self::with_snapshot(SettingsSnapshot::default())
    }

    /// Harness over `snapshot`, with the default retention window.
    ///
    /// # Panics
    ///
    /// Panics when `snapshot` breaks a parameter rule or the metrics registry
    /// cannot be built.
    #[must_use]
    pub fn with_snapshot(snapshot: SettingsSnapshot) -> Self {
        Self::build(snapshot, TimeDelta::seconds(EVENT_RETENTION_SECS))
    }

    /// Harness over the defaults with a custom retention window.
    ///
    /// # Panics
    ///
    /// Panics when the metrics registry cannot be built.
    #[must_use]
    pub fn with_retention(retention: TimeDelta) -> Self {
        Self::build(SettingsSnapshot::default(), retention)
    }

    fn build(snapshot: SettingsSnapshot, retention: TimeDelta) -> Self {
        let clock = Arc::new(ManualClock::new(epoch()));
        let invalidator = Arc::new(RecordingInvalidator::new());
        let settings = Arc::new(FsSettings::from_snapshot(snapshot).expect("valid snapshot"));
        let events = EventQueue::with_clock(clock.clone(), retention);
        let metrics = Metrics::new().expect("metrics registry");
        let registry = SettingsRegistry::with_clock(
            settings.clone(),
            events,
            invalidator.clone(),
            metrics,
            clock.clone(),
        );
        Self {
            registry,
            clock,
            invalidator,
            settings,
        }
    }

    /// Read `name` through a buffer of `len` bytes.
    ///
    /// # Panics
    ///
    /// Panics when `name` is not a registered setting.
    #[must_use]
    pub fn read_with(&self, name: &str, len: usize) -> Vec<u8> {
        let mut buf = vec![0_u8; len];
        let written = self.registry.get(name, &mut buf).expect("known setting");
        buf.truncate(written);
        buf
    }

    /// Read `name` once as UTF-8 text.
    ///
    /// # Panics
    ///
    /// Panics when `name` is unknown or renders invalid UTF-8.
    #[must_use]
    pub fn read_text(&self, name: &str) -> String {
        let bytes = self.registry.read_value(name).expect("known setting");
        String::from_utf8(bytes).expect("utf-8 setting value")
    }
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_shares_the_clock_with_the_queue() {
        let harness = TestRegistry::new();
        let _ = harness.registry.append_event([b"old\n".as_slice()]);
        harness
            .clock
            .advance(TimeDelta::seconds(EVENT_RETENTION_SECS + 1));
        assert_eq!(harness.registry.events().sweep(), 1);
    }

    #[test]
    fn read_text_renders_defaults() {
        let harness = TestRegistry::new();
        assert_eq!(harness.read_text("use_ssl"), "1\n");
    }
}
