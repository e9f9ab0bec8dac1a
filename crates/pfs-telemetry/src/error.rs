//! # Design
//!
//! - Metric failures name the collector involved so a broken registration can
//!   be traced without re-logging.
//! - Messages stay constant; sources are preserved for callers that walk the
//!   error chain.

use prometheus::Error as PrometheusError;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while wiring logging or metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("tracing subscriber installation failed")]
    SubscriberInstall {
        /// Underlying installation error.
        source: TryInitError,
    },
    /// A collector was rejected at construction, usually for a bad name.
    #[error("metrics collector construction failed")]
    MetricsCollector {
        /// Metric the collector was built for.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// A collector clashed with one already in the registry.
    #[error("metrics collector registration failed")]
    MetricsRegister {
        /// Metric the collector was registered as.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Text exposition encoding failed.
    #[error("metrics encoding failed")]
    MetricsEncode {
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// Encoded exposition was not UTF-8.
    #[error("metrics exposition was not utf-8")]
    MetricsUtf8 {
        /// Underlying conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl TelemetryError {
    /// Metric tied to a collector failure, if any.
    #[must_use]
    pub const fn metric(&self) -> Option<&'static str> {
        match self {
            Self::MetricsCollector { name, .. } | Self::MetricsRegister { name, .. } => {
                Some(*name)
            }
            Self::SubscriberInstall { .. }
            | Self::MetricsEncode { .. }
            | Self::MetricsUtf8 { .. } => None,
        }
    }
}
