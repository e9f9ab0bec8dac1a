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

//! Diagnostic event queue behind the `events` settings file.
//!
//! The queue is a FIFO of timestamped byte payloads guarded by a single mutex.
//! Readers drain it front to back, possibly a few bytes at a time; every
//! append sweeps entries older than the retention window. The queue keeps a
//! gauge of the head entry's unread length so the synthetic `stat` size of the
//! events file can follow it without taking the lock.
//!
//! Nothing in this crate logs: the diagnostic log sink appends into the queue,
//! so a log call made while holding the queue mutex would re-enter it.

pub mod clock;
pub mod queue;

pub use clock::{Clock, ManualClock, SystemClock};
pub use queue::{AppendReceipt, EVENT_RETENTION_SECS, EventQueue, HeadSizeGauge};
