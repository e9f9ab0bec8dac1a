//! Log sink that publishes formatted records into the diagnostic event queue.
//!
//! # Design
//! - Reuse the formatted subscriber output instead of formatting twice.
//! - Each complete line becomes one newline-terminated event, so a reader of
//!   the events file sees whole log lines in arrival order.
//! - Publishing never logs, which keeps the queue mutex free of re-entry.

use std::io::{self, Write};

use pfs_events::EventQueue;
use tracing_subscriber::fmt::MakeWriter;

use crate::metrics::Metrics;

/// `tracing_subscriber` writer factory feeding the event queue.
#[derive(Clone)]
pub struct EventSink {
    queue: EventQueue,
    metrics: Option<Metrics>,
}

impl EventSink {
    /// Sink publishing into `queue`.
    #[must_use]
    pub const fn new(queue: EventQueue) -> Self {
        Self {
            queue,
            metrics: None,
        }
    }

    /// Record appended and expired events on `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn publish(&self, line: &[u8]) {
        if line.is_empty() {
            return;
        }
        let receipt = self.queue.append([line, b"\n".as_slice()]);
        if let Some(metrics) = &self.metrics {
            metrics.observe_append(&receipt);
        }
    }
}

impl<'a> MakeWriter<'a> for EventSink {
    type Writer = EventSinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        EventSinkWriter {
            sink: self.clone(),
            buffer: LineBuffer::default(),
        }
    }
}

/// Per-record writer handed out by [`EventSink`].
pub struct EventSinkWriter {
    sink: EventSink,
    buffer: LineBuffer,
}

impl Write for EventSinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for line in self.buffer.push(buf) {
            self.sink.publish(&line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EventSinkWriter {
    fn drop(&mut self) {
        if let Some(line) = self.buffer.finish() {
            self.sink.publish(&line);
        }
    }
}

#[derive(Default)]
struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        self.drain_complete_lines()
    }

    fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = trim_line(&self.buffer).to_vec();
        self.buffer.clear();
        Some(line)
    }

    fn drain_complete_lines(&mut self) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        let mut start = 0usize;
        for (idx, byte) in self.buffer.iter().enumerate() {
            if *byte == b'\n' {
                lines.push(trim_line(&self.buffer[start..idx]).to_vec());
                start = idx + 1;
            }
        }
        if start > 0 {
            self.buffer.drain(0..start);
        }
        lines
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &line[..end]
}
