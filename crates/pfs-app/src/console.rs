//! Line-oriented admin console over the settings registry.
//!
//! # Design
//! - One command per line; blank lines and `#` comments are skipped.
//! - Registry failures are printed and the session continues. Only IO and
//!   encoding failures end it.
//! - `cat events` drains the stream; `cat events <len>` performs a single
//!   read through a buffer of that size.

use std::io::Write;
use std::str::FromStr;

use pfs_settings::{EVENTS_SETTING, SettingsError, SettingsRegistry};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{AppError, AppResult};

const DRAIN_CHUNK: usize = 4096;
/// Largest buffer `cat <name> <len>` may request.
pub const MAX_READ_LEN: usize = 1024 * 1024;

const HELP: &str = "\
commands:
  ls                      list settings
  stat [name]             attributes of a setting, or of the directory
  cat <name> [len]        read a setting (events: drain, or one read of len bytes)
  write <name> <value>    write a setting
  snapshot                live parameters as JSON
  metrics                 Prometheus metrics
  help                    this text
  quit                    end the session
";

/// Parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// List setting names.
    List,
    /// Show attributes of a setting, or of the directory when absent.
    Stat(Option<String>),
    /// Read a setting.
    Cat {
        /// Setting name.
        name: String,
        /// Caller buffer length for a single read.
        buffer_len: Option<usize>,
    },
    /// Write a setting.
    Write {
        /// Setting name.
        name: String,
        /// Raw value text.
        value: String,
    },
    /// Print the live parameters.
    Snapshot,
    /// Print the metrics exposition.
    Metrics,
    /// Print usage.
    Help,
    /// End the session.
    Quit,
}

/// Whether the session continues after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// Stop reading commands.
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (verb, rest) = split_word(line.trim());
        match verb {
            "ls" => Ok(Self::List),
            "stat" => Ok(Self::Stat(
                (!rest.is_empty()).then(|| split_word(rest).0.to_string()),
            )),
            "cat" => {
                let (name, rest) = split_word(rest);
                let name = required("name", name)?;
                let buffer_len = match split_word(rest).0 {
                    "" => None,
                    len => Some(parse_buffer_len(len)?),
                };
                Ok(Self::Cat { name, buffer_len })
            }
            "write" => {
                let (name, value) = split_word(rest);
                Ok(Self::Write {
                    name: required("name", name)?,
                    value: required("value", value)?,
                })
            }
            "snapshot" => Ok(Self::Snapshot),
            "metrics" => Ok(Self::Metrics),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(AppError::invalid_argument(
                "command",
                "unknown_command",
                other,
            )),
        }
    }
}

fn split_word(text: &str) -> (&str, &str) {
    text.split_once(char::is_whitespace)
        .map_or((text, ""), |(word, rest)| (word, rest.trim_start()))
}

fn parse_buffer_len(text: &str) -> AppResult<usize> {
    let len = text
        .parse::<usize>()
        .map_err(|_| AppError::invalid_argument("buffer_len", "not_a_number", text))?;
    if len > MAX_READ_LEN {
        return Err(AppError::invalid_argument("buffer_len", "too_large", text));
    }
    Ok(len)
}

fn required(field: &'static str, text: &str) -> AppResult<String> {
    if text.is_empty() {
        return Err(AppError::InvalidArgument {
            field,
            reason: "missing",
            value: None,
        });
    }
    Ok(text.to_string())
}

/// Run `command` against `registry`, writing its output to `out`.
///
/// # Errors
///
/// Returns an error when output cannot be written or encoded. Registry
/// failures are reported on `out` instead.
pub fn execute<W: Write>(
    registry: &SettingsRegistry,
    command: &ConsoleCommand,
    out: &mut W,
) -> AppResult<Flow> {
    match command {
        ConsoleCommand::List => {
            for name in registry.list() {
                writeln!(out, "{name}").map_err(write_failed)?;
            }
        }
        ConsoleCommand::Stat(name) => {
            match registry.stat_for(name.as_deref().unwrap_or("/")) {
                Ok(attr) => {
                    let json = serde_json::to_string(&attr)
                        .map_err(|err| AppError::encode("console.stat", err))?;
                    writeln!(out, "{json}").map_err(write_failed)?;
                }
                Err(err) => report(out, &err)?,
            }
        }
        ConsoleCommand::Cat { name, buffer_len } => cat(registry, name, *buffer_len, out)?,
        ConsoleCommand::Write { name, value } => match registry.set(name, value.as_bytes()) {
            Ok(()) => writeln!(out, "ok").map_err(write_failed)?,
            Err(err) => report(out, &err)?,
        },
        ConsoleCommand::Snapshot => {
            let json = serde_json::to_string_pretty(&registry.snapshot())
                .map_err(|err| AppError::encode("console.snapshot", err))?;
            writeln!(out, "{json}").map_err(write_failed)?;
        }
        ConsoleCommand::Metrics => {
            let text = registry
                .metrics()
                .render()
                .map_err(|err| AppError::telemetry("console.metrics", err))?;
            out.write_all(text.as_bytes()).map_err(write_failed)?;
        }
        ConsoleCommand::Help => out.write_all(HELP.as_bytes()).map_err(write_failed)?,
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn cat<W: Write>(
    registry: &SettingsRegistry,
    name: &str,
    buffer_len: Option<usize>,
    out: &mut W,
) -> AppResult<()> {
    if let Some(len) = buffer_len {
        let mut buf = vec![0_u8; len];
        return match registry.get(name, &mut buf) {
            Ok(written) => out.write_all(&buf[..written]).map_err(write_failed),
            Err(err) => report(out, &err),
        };
    }

    if name.trim_start_matches('/') != EVENTS_SETTING {
        return match registry.read_value(name) {
            Ok(bytes) => out.write_all(&bytes).map_err(write_failed),
            Err(err) => report(out, &err),
        };
    }

    let mut buf = vec![0_u8; DRAIN_CHUNK];
    loop {
        match registry.get(name, &mut buf) {
            Ok(0) => return Ok(()),
            Ok(written) => out.write_all(&buf[..written]).map_err(write_failed)?,
            Err(err) => return report(out, &err),
        }
    }
}

fn report<W: Write>(out: &mut W, err: &SettingsError) -> AppResult<()> {
    let written = match err {
        SettingsError::NotFound { name } => {
            writeln!(out, "error: {err}: {name} (errno {})", err.errno())
        }
        SettingsError::InvalidValue { name, reason, .. } => {
            writeln!(out, "error: {err}: {name}: {reason} (errno {})", err.errno())
        }
    };
    written.map_err(write_failed)
}

fn report_usage<W: Write>(out: &mut W, err: &AppError) -> AppResult<()> {
    let written = match err {
        AppError::InvalidArgument {
            field,
            reason,
            value: Some(value),
        } => writeln!(out, "usage: {field}: {reason}: {value}"),
        AppError::InvalidArgument { field, reason, .. } => {
            writeln!(out, "usage: {field}: {reason}")
        }
        other => writeln!(out, "usage: {other}"),
    };
    written.map_err(write_failed)
}

fn write_failed(err: std::io::Error) -> AppError {
    AppError::io("console.write", err)
}

/// Read commands from `input` until EOF or `quit`, writing results to `out`.
///
/// # Errors
///
/// Returns an error when input cannot be read or output cannot be written.
pub async fn run_console<R, W>(
    registry: &SettingsRegistry,
    input: R,
    out: &mut W,
) -> AppResult<()>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    let mut lines = input.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|err| AppError::io("console.read", err))?
    {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let flow = match line.parse::<ConsoleCommand>() {
            Ok(command) => execute(registry, &command, out)?,
            Err(err) => {
                report_usage(out, &err)?;
                Flow::Continue
            }
        };
        out.flush().map_err(write_failed)?;
        if flow == Flow::Quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pfs_config::FsSettings;
    use pfs_events::EventQueue;
    use pfs_settings::NoopInvalidator;
    use pfs_telemetry::Metrics;

    fn registry() -> SettingsRegistry {
        SettingsRegistry::new(
            Arc::new(FsSettings::default()),
            EventQueue::new(),
            Arc::new(NoopInvalidator),
            Metrics::new().unwrap(),
        )
    }

    fn run(registry: &SettingsRegistry, command: &str) -> String {
        let command = command.parse::<ConsoleCommand>().unwrap();
        let mut out = Vec::new();
        let _ = execute(registry, &command, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_every_command() {
        assert_eq!("ls".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::List);
        assert_eq!(
            "stat".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Stat(None)
        );
        assert_eq!(
            " stat  page_size ".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Stat(Some("page_size".into()))
        );
        assert_eq!(
            "cat events 6".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Cat {
                name: "events".into(),
                buffer_len: Some(6),
            }
        );
        assert_eq!(
            "write use_ssl not really".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Write {
                name: "use_ssl".into(),
                value: "not really".into(),
            }
        );
        assert_eq!(
            "exit".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Quit
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        for (line, field, reason) in [
            ("frobnicate", "command", "unknown_command"),
            ("cat", "name", "missing"),
            ("cat events lots", "buffer_len", "not_a_number"),
            ("cat events 1048577", "buffer_len", "too_large"),
            ("write page_size", "value", "missing"),
        ] {
            let err = line.parse::<ConsoleCommand>().unwrap_err();
            assert!(
                matches!(
                    err,
                    AppError::InvalidArgument { field: f, reason: r, .. } if f == field && r == reason
                ),
                "{line}"
            );
        }
    }

    #[test]
    fn buffer_len_accepts_the_maximum() {
        assert_eq!(
            format!("cat events {MAX_READ_LEN}")
                .parse::<ConsoleCommand>()
                .unwrap(),
            ConsoleCommand::Cat {
                name: "events".into(),
                buffer_len: Some(MAX_READ_LEN),
            }
        );
    }

    #[test]
    fn write_then_cat_round_trips_through_the_registry() {
        let registry = registry();
        assert_eq!(run(&registry, "write page_size 2048"), "ok\n");
        assert_eq!(run(&registry, "cat page_size"), "2048\n");
        assert_eq!(run(&registry, "cat page_size 2"), "20");
    }

    #[test]
    fn registry_errors_are_reported_not_raised() {
        let registry = registry();
        assert_eq!(
            run(&registry, "write page_size 3000"),
            "error: invalid setting value: page_size: not_power_of_two (errno 22)\n"
        );
        assert_eq!(
            run(&registry, "cat nope"),
            "error: setting not found: nope (errno 2)\n"
        );
    }

    #[test]
    fn cat_events_drains_the_stream() {
        let registry = registry();
        let _ = registry.append_event(["one\n"]);
        let _ = registry.append_event(["two\n"]);
        assert_eq!(run(&registry, "cat events"), "one\ntwo\n");
        assert_eq!(run(&registry, "cat events"), "");
    }

    #[test]
    fn stat_prints_json_attributes() {
        let registry = registry();
        let output = run(&registry, "stat");
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["kind"], "directory");
        assert_eq!(value["nlink"], 2);
        assert_eq!(value["size"], 7);
    }

    #[test]
    fn quit_ends_the_session() {
        let registry = registry();
        let mut out = Vec::new();
        assert_eq!(
            execute(&registry, &ConsoleCommand::Quit, &mut out).unwrap(),
            Flow::Quit
        );
        assert!(out.is_empty());
    }
}
