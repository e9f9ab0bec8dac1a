//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters relevant to the settings filesystem: setting writes
//!   by outcome, event queue traffic and cache resets.

use std::sync::Arc;

use pfs_events::AppendReceipt;
use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    setting_writes_total: IntCounterVec,
    cache_resets_total: IntCounterVec,
    events_appended_total: IntCounter,
    events_expired_total: IntCounter,
    events_read_bytes_total: IntCounter,
    event_queue_depth: IntGauge,
}

/// Snapshot of selected gauges and counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Events published into the queue.
    pub events_appended_total: u64,
    /// Events dropped by retention sweeps.
    pub events_expired_total: u64,
    /// Bytes handed to readers of the events file.
    pub events_read_bytes_total: u64,
    /// Entries currently queued.
    pub event_queue_depth: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let setting_writes_total = collector(
            "setting_writes_total",
            IntCounterVec::new(
                Opts::new("setting_writes_total", "Setting writes by outcome"),
                &["setting", "outcome"],
            ),
        )?;
        let cache_resets_total = collector(
            "cache_resets_total",
            IntCounterVec::new(
                Opts::new(
                    "cache_resets_total",
                    "Cache resets requested by setting changes",
                ),
                &["setting"],
            ),
        )?;
        let events_appended_total = collector(
            "events_appended_total",
            IntCounter::with_opts(Opts::new(
                "events_appended_total",
                "Diagnostic events appended to the queue",
            )),
        )?;
        let events_expired_total = collector(
            "events_expired_total",
            IntCounter::with_opts(Opts::new(
                "events_expired_total",
                "Diagnostic events dropped after the retention window",
            )),
        )?;
        let events_read_bytes_total = collector(
            "events_read_bytes_total",
            IntCounter::with_opts(Opts::new(
                "events_read_bytes_total",
                "Bytes consumed from the events file",
            )),
        )?;
        let event_queue_depth = collector(
            "event_queue_depth",
            IntGauge::with_opts(Opts::new(
                "event_queue_depth",
                "Diagnostic events currently queued",
            )),
        )?;

        register(&registry, "setting_writes_total", &setting_writes_total)?;
        register(&registry, "cache_resets_total", &cache_resets_total)?;
        register(&registry, "events_appended_total", &events_appended_total)?;
        register(&registry, "events_expired_total", &events_expired_total)?;
        register(
            &registry,
            "events_read_bytes_total",
            &events_read_bytes_total,
        )?;
        register(&registry, "event_queue_depth", &event_queue_depth)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                setting_writes_total,
                cache_resets_total,
                events_appended_total,
                events_expired_total,
                events_read_bytes_total,
                event_queue_depth,
            }),
        })
    }

    /// Count a setting write with its outcome (`ok`, `invalid`, ...).
    pub fn inc_setting_write(&self, setting: &str, outcome: &str) {
        self.inner
            .setting_writes_total
            .with_label_values(&[setting, outcome])
            .inc();
    }

    /// Count a cache reset triggered by `setting`.
    pub fn inc_cache_reset(&self, setting: &str) {
        self.inner
            .cache_resets_total
            .with_label_values(&[setting])
            .inc();
    }

    /// Record the outcome of an event queue append.
    pub fn observe_append(&self, receipt: &AppendReceipt) {
        if receipt.appended {
            self.inner.events_appended_total.inc();
        }
        self.inner
            .events_expired_total
            .inc_by(receipt.expired as u64);
        self.set_queue_depth(receipt.depth);
    }

    /// Record bytes handed to a reader of the events file.
    pub fn add_event_bytes_read(&self, bytes: usize) {
        self.inner.events_read_bytes_total.inc_by(bytes as u64);
    }

    /// Set the queue depth gauge.
    pub fn set_queue_depth(&self, depth: usize) {
        self.inner
            .event_queue_depth
            .set(i64::try_from(depth).unwrap_or(i64::MAX));
    }

    /// Current count of writes to `setting` with `outcome`.
    #[must_use]
    pub fn setting_writes(&self, setting: &str, outcome: &str) -> u64 {
        self.inner
            .setting_writes_total
            .with_label_values(&[setting, outcome])
            .get()
    }

    /// Current count of cache resets triggered by `setting`.
    #[must_use]
    pub fn cache_resets(&self, setting: &str) -> u64 {
        self.inner
            .cache_resets_total
            .with_label_values(&[setting])
            .get()
    }

    /// Render all registered metrics in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Capture the scalar counters for structured output.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_appended_total: self.inner.events_appended_total.get(),
            events_expired_total: self.inner.events_expired_total.get(),
            events_read_bytes_total: self.inner.events_read_bytes_total.get(),
            event_queue_depth: self.inner.event_queue_depth.get(),
        }
    }
}

fn collector<T>(name: &'static str, built: prometheus::Result<T>) -> Result<T> {
    built.map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
