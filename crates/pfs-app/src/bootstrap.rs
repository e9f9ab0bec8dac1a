//! CLI parsing and service wiring for `pfsd`.
//!
//! # Design
//! - Parameters come from `PFS_*` environment variables; `--set` overrides are
//!   applied afterwards through the validated registry path so they obey the
//!   same rules as console writes.
//! - Log lines are mirrored into the `events` file through the event sink.
//! - Cache resets are observed on a broadcast channel by a background task.

use std::io;
use std::sync::Arc;

use chrono::TimeDelta;
use clap::Parser;
use pfs_config::{FsSettings, SettingsSnapshot};
use pfs_events::{EVENT_RETENTION_SECS, EventQueue, SystemClock};
use pfs_settings::{BroadcastInvalidator, CacheReset, SettingsRegistry};
use pfs_telemetry::{DEFAULT_LOG_LEVEL, EventSink, LogFormat, LoggingConfig, Metrics};
use tokio::io::BufReader;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::console::run_console;
use crate::error::{AppError, AppResult};

/// Command-line arguments for `pfsd`.
#[derive(Debug, Clone, Parser)]
#[command(name = "pfsd", about = "Virtual settings filesystem admin console")]
pub struct Cli {
    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, env = "PFS_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
    /// Console log format (`json` or `pretty`).
    #[arg(long, env = "PFS_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
    /// Seconds an event stays in the `events` stream before it expires.
    #[arg(
        long,
        env = "PFS_EVENT_RETENTION_SECS",
        default_value_t = EVENT_RETENTION_SECS,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub event_retention_secs: i64,
    /// Setting override applied after startup, as `name=value`. Repeatable.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub overrides: Vec<String>,
}

/// Services assembled at startup.
pub struct Services {
    /// Registry exposed by the console.
    pub registry: SettingsRegistry,
    /// Broadcast channel carrying cache reset notices.
    pub invalidator: Arc<BroadcastInvalidator>,
}

impl Services {
    /// Assemble the registry and its collaborators from `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot breaks a parameter rule or metrics
    /// cannot be registered.
    pub fn build(snapshot: SettingsSnapshot, retention_secs: i64) -> AppResult<Self> {
        let settings = Arc::new(
            FsSettings::from_snapshot(snapshot)
                .map_err(|err| AppError::config("settings.from_snapshot", err))?,
        );
        let events = EventQueue::with_clock(
            Arc::new(SystemClock),
            TimeDelta::seconds(retention_secs),
        );
        let invalidator = Arc::new(BroadcastInvalidator::new());
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let registry = SettingsRegistry::new(settings, events, invalidator.clone(), metrics);
        Ok(Self {
            registry,
            invalidator,
        })
    }

    /// Sink that mirrors log lines into the `events` stream.
    #[must_use]
    pub fn event_sink(&self) -> EventSink {
        EventSink::new(self.registry.events().clone())
            .with_metrics(self.registry.metrics().clone())
    }

    /// Apply `name=value` overrides in order.
    ///
    /// # Errors
    ///
    /// Returns an error on the first malformed or rejected override.
    pub fn apply_overrides(&self, overrides: &[String]) -> AppResult<()> {
        for entry in overrides {
            let (name, value) = parse_override(entry)?;
            self.registry
                .set(name, value.as_bytes())
                .map_err(|err| AppError::settings("bootstrap.apply_override", err))?;
        }
        Ok(())
    }
}

fn parse_override(entry: &str) -> AppResult<(&str, &str)> {
    let (name, value) = entry
        .split_once('=')
        .ok_or_else(|| AppError::invalid_argument("set", "missing_separator", entry))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::invalid_argument("set", "missing_name", entry));
    }
    Ok((name, value))
}

/// Log every cache reset notice until the channel closes.
#[must_use]
pub fn spawn_reset_listener(mut receiver: broadcast::Receiver<CacheReset>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(reset) => info!(
                    setting = reset.setting,
                    page_size = reset.page_size,
                    cache_size = reset.cache_size,
                    "block cache reset requested"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "cache reset notices dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Entry point for the `pfsd` boot sequence.
///
/// # Errors
///
/// Returns an error if startup fails or the console cannot read or write.
pub async fn run_app() -> AppResult<()> {
    let cli = Cli::parse();
    let snapshot =
        SettingsSnapshot::from_env().map_err(|err| AppError::config("settings.from_env", err))?;
    let services = Services::build(snapshot, cli.event_retention_secs)?;

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
    };
    pfs_telemetry::init_logging(&logging, Some(services.event_sink()))
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    let listener = spawn_reset_listener(services.invalidator.subscribe());
    info!(settings = ?services.registry.snapshot(), "pfsd starting");
    services.apply_overrides(&cli.overrides)?;

    let mut stdout = io::stdout();
    let result = run_console(
        &services.registry,
        BufReader::new(tokio::io::stdin()),
        &mut stdout,
    )
    .await;

    listener.abort();
    info!("pfsd stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["pfsd"]).unwrap();
        assert_eq!(cli.event_retention_secs, EVENT_RETENTION_SECS);
        assert!(cli.overrides.is_empty());
    }

    #[test]
    fn cli_collects_repeated_overrides() {
        let cli = Cli::try_parse_from([
            "pfsd",
            "--set",
            "page_size=2048",
            "--set",
            "use_ssl=0",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.overrides, ["page_size=2048", "use_ssl=0"]);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn cli_rejects_non_positive_retention() {
        assert!(Cli::try_parse_from(["pfsd", "--event-retention-secs", "0"]).is_err());
    }

    #[test]
    fn override_parsing() {
        assert_eq!(parse_override("page_size=2048").unwrap(), ("page_size", "2048"));
        assert_eq!(parse_override("use_ssl=").unwrap(), ("use_ssl", ""));
        assert!(matches!(
            parse_override("page_size"),
            Err(AppError::InvalidArgument {
                reason: "missing_separator",
                ..
            })
        ));
        assert!(matches!(
            parse_override("=1"),
            Err(AppError::InvalidArgument {
                reason: "missing_name",
                ..
            })
        ));
    }

    #[test]
    fn overrides_go_through_validation() {
        let services = Services::build(SettingsSnapshot::default(), 60).unwrap();
        services
            .apply_overrides(&["page_size=2048".to_string()])
            .unwrap();
        assert_eq!(services.registry.snapshot().page_size, 2048);

        let err = services
            .apply_overrides(&["page_size=3000".to_string()])
            .unwrap_err();
        assert!(matches!(err, AppError::Settings { .. }));
    }

    #[test]
    fn invalid_snapshot_fails_to_build() {
        let snapshot = SettingsSnapshot {
            page_size: 3000,
            ..SettingsSnapshot::default()
        };
        assert!(matches!(
            Services::build(snapshot, 60),
            Err(AppError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn reset_listener_stops_when_the_channel_closes() {
        let invalidator = BroadcastInvalidator::new();
        let handle = spawn_reset_listener(invalidator.subscribe());
        drop(invalidator);
        handle.await.unwrap();
    }
}
