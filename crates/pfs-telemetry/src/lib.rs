#![forbid(unsafe_code)]
#![deny(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Telemetry primitives shared across the PFS workspace.
//!
//! Layout: `init.rs` (subscriber installation), `event_sink.rs` (log lines
//! published into the diagnostic event queue), `metrics.rs` (Prometheus
//! counters), `error.rs`.

pub mod error;
pub mod event_sink;
pub mod init;
pub mod metrics;

pub use error::{Result, TelemetryError};
pub use event_sink::{EventSink, EventSinkWriter};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
pub use metrics::{Metrics, MetricsSnapshot};
