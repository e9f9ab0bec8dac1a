//! Mutex-guarded FIFO of diagnostic payloads with age-based expiry.
//!
//! # Design
//! - Entries live in an owned `VecDeque`; head and tail are positions, not
//!   pointers, so sweeping an emptied queue simply stops.
//! - Timestamps are taken while holding the lock so entries stay ordered by
//!   arrival even when producers race.
//! - Append, consume and sweep each run as one critical section and finish by
//!   republishing the head entry's unread length.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

use crate::clock::{Clock, SystemClock};

/// Age after which queued events are dropped by the next sweep.
pub const EVENT_RETENTION_SECS: i64 = 3_600;

/// Shared view of the head entry's unread length (0 when the queue is empty).
#[derive(Debug, Clone, Default)]
pub struct HeadSizeGauge(Arc<AtomicU64>);

impl HeadSizeGauge {
    /// Last published head length in bytes.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    fn publish(&self, value: u64) {
        self.0.store(value, Ordering::Release);
    }
}

/// Outcome of a single append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Whether a new entry was queued (empty payloads are not).
    pub appended: bool,
    /// Entries dropped by the sweep that followed the append.
    pub expired: usize,
    /// Entries left in the queue.
    pub depth: usize,
}

struct QueuedEvent {
    payload: Vec<u8>,
    offset: usize,
    timestamp: DateTime<Utc>,
}

impl QueuedEvent {
    fn remaining(&self) -> &[u8] {
        &self.payload[self.offset..]
    }
}

/// Cloneable handle to the shared event queue.
#[derive(Clone)]
pub struct EventQueue {
    entries: Arc<Mutex<VecDeque<QueuedEvent>>>,
    clock: Arc<dyn Clock>,
    retention: TimeDelta,
    head_size: HeadSizeGauge,
}

impl EventQueue {
    /// Queue stamped by the system clock with the default one hour retention.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(
            Arc::new(SystemClock),
            TimeDelta::seconds(EVENT_RETENTION_SECS),
        )
    }

    /// Queue driven by a custom clock and retention window.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>, retention: TimeDelta) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            clock,
            retention,
            head_size: HeadSizeGauge::default(),
        }
    }

    /// Retention window applied by sweeps.
    #[must_use]
    pub const fn retention(&self) -> TimeDelta {
        self.retention
    }

    /// Gauge tracking the unread length of the head entry.
    #[must_use]
    pub fn size_gauge(&self) -> HeadSizeGauge {
        self.head_size.clone()
    }

    /// Unread length of the head entry.
    #[must_use]
    pub fn head_len(&self) -> u64 {
        self.head_size.get()
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Concatenate `parts` into one event stamped now and queue it at the
    /// tail, then drop every entry older than the retention window.
    ///
    /// A payload with no bytes queues nothing, so a zero-length read keeps
    /// meaning "no more events"; the sweep still runs.
    pub fn append<I, B>(&self, parts: I) -> AppendReceipt
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut payload = Vec::new();
        for part in parts {
            payload.extend_from_slice(part.as_ref());
        }

        let mut entries = self.lock();
        let now = self.clock.now();
        let appended = !payload.is_empty();
        if appended {
            entries.push_back(QueuedEvent {
                payload,
                offset: 0,
                timestamp: now,
            });
        }
        let expired = self.expire(&mut entries, now);
        self.publish_head(&entries);
        AppendReceipt {
            appended,
            expired,
            depth: entries.len(),
        }
    }

    /// Copy the next bytes of the stream into `buf` and return how many were
    /// written.
    ///
    /// When the head entry fits in `buf` it is copied whole and removed.
    /// Otherwise `buf` is filled from the head's current offset and the rest
    /// stays queued for the next call. Returns 0 once the queue is empty.
    pub fn read_into(&self, buf: &mut [u8]) -> usize {
        let mut entries = self.lock();
        let written = match entries.front_mut() {
            None => 0,
            Some(head) if head.remaining().len() <= buf.len() => {
                let len = head.remaining().len();
                buf[..len].copy_from_slice(head.remaining());
                entries.pop_front();
                len
            }
            Some(head) => {
                let len = buf.len();
                buf.copy_from_slice(&head.remaining()[..len]);
                head.offset += len;
                len
            }
        };
        self.publish_head(&entries);
        written
    }

    /// Drop expired entries now and return how many were removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.lock();
        let now = self.clock.now();
        let expired = self.expire(&mut entries, now);
        self.publish_head(&entries);
        expired
    }

    fn expire(&self, entries: &mut VecDeque<QueuedEvent>, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return 0;
        };
        let mut expired = 0;
        while entries
            .front()
            .is_some_and(|head| head.timestamp < cutoff)
        {
            entries.pop_front();
            expired += 1;
        }
        expired
    }

    fn publish_head(&self, entries: &VecDeque<QueuedEvent>) {
        let len = entries
            .front()
            .map_or(0, |head| head.remaining().len() as u64);
        self.head_size.publish(len);
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueuedEvent>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::thread;

    fn manual_queue() -> (EventQueue, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let queue = EventQueue::with_clock(
            clock.clone(),
            TimeDelta::seconds(EVENT_RETENTION_SECS),
        );
        (queue, clock)
    }

    fn drain_with(queue: &EventQueue, capacity: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0_u8; capacity];
        loop {
            let n = queue.read_into(&mut buf);
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    #[test]
    fn partial_reads_stream_the_head_then_move_on() {
        let (queue, _) = manual_queue();
        let _ = queue.append([b"AAAAAAAAAA".as_slice()]);
        let _ = queue.append([b"BBBBB".as_slice()]);
        assert_eq!(queue.head_len(), 10);

        let mut small = [0_u8; 6];
        assert_eq!(queue.read_into(&mut small), 6);
        assert_eq!(&small, b"AAAAAA");
        assert_eq!(queue.head_len(), 4);
        assert_eq!(queue.len(), 2);

        let mut large = [0_u8; 4096];
        assert_eq!(queue.read_into(&mut large), 4);
        assert_eq!(&large[..4], b"AAAA");
        assert_eq!(queue.head_len(), 5);

        assert_eq!(queue.read_into(&mut large), 5);
        assert_eq!(&large[..5], b"BBBBB");
        assert_eq!(queue.head_len(), 0);

        assert_eq!(queue.read_into(&mut large), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn exact_fit_dequeues_the_head() {
        let (queue, _) = manual_queue();
        let _ = queue.append([b"12345".as_slice()]);
        let mut buf = [0_u8; 5];
        assert_eq!(queue.read_into(&mut buf), 5);
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_capacity_reads_do_not_consume() {
        let (queue, _) = manual_queue();
        let _ = queue.append([b"abc".as_slice()]);
        assert_eq!(queue.read_into(&mut []), 0);
        assert_eq!(queue.head_len(), 3);
    }

    #[test]
    fn parts_are_concatenated_into_one_event() {
        let (queue, _) = manual_queue();
        let receipt = queue.append([b"level=info ".as_slice(), b"msg=hello", b"\n"]);
        assert!(receipt.appended);
        assert_eq!(receipt.depth, 1);
        assert_eq!(drain_with(&queue, 4096), b"level=info msg=hello\n");
    }

    #[test]
    fn empty_payload_is_not_queued() {
        let (queue, _) = manual_queue();
        let receipt = queue.append(Vec::<&[u8]>::new());
        assert!(!receipt.appended);
        let receipt = queue.append([b"".as_slice()]);
        assert!(!receipt.appended);
        assert!(queue.is_empty());
    }

    #[test]
    fn append_sweeps_entries_past_retention() {
        let (queue, clock) = manual_queue();
        let _ = queue.append([b"stale".as_slice()]);
        clock.advance(TimeDelta::seconds(EVENT_RETENTION_SECS + 1));

        let receipt = queue.append([b"fresh".as_slice()]);
        assert_eq!(receipt.expired, 1);
        assert_eq!(receipt.depth, 1);
        assert_eq!(queue.head_len(), 5);
        assert_eq!(drain_with(&queue, 4096), b"fresh");
    }

    #[test]
    fn entries_exactly_at_retention_survive() {
        let (queue, clock) = manual_queue();
        let _ = queue.append([b"edge".as_slice()]);
        clock.advance(TimeDelta::seconds(EVENT_RETENTION_SECS));
        let receipt = queue.append([b"next".as_slice()]);
        assert_eq!(receipt.expired, 0);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn sweep_stops_on_empty_queue() {
        let (queue, clock) = manual_queue();
        let _ = queue.append([b"one".as_slice()]);
        let _ = queue.append([b"two".as_slice()]);
        clock.advance(TimeDelta::days(2));

        assert_eq!(queue.sweep(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.head_len(), 0);
        assert_eq!(queue.sweep(), 0);

        let receipt = queue.append(Vec::<&[u8]>::new());
        assert_eq!(receipt.expired, 0);
    }

    #[test]
    fn partially_read_head_still_expires() {
        let (queue, clock) = manual_queue();
        let _ = queue.append([b"0123456789".as_slice()]);
        let mut buf = [0_u8; 3];
        assert_eq!(queue.read_into(&mut buf), 3);

        clock.advance(TimeDelta::seconds(EVENT_RETENTION_SECS * 2));
        let _ = queue.append([b"later".as_slice()]);
        assert_eq!(drain_with(&queue, 64), b"later");
    }

    #[test]
    fn gauge_is_shared_between_clones() {
        let (queue, _) = manual_queue();
        let gauge = queue.size_gauge();
        let producer = queue.clone();
        let _ = producer.append([b"xyz".as_slice()]);
        assert_eq!(gauge.get(), 3);
    }

    #[test]
    fn concurrent_producers_and_consumer_see_every_byte_once() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 250;
        let queue = EventQueue::new();

        let consumed = thread::scope(|scope| {
            for producer in 0..PRODUCERS {
                let queue = queue.clone();
                scope.spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        let line = format!("p{producer}:{seq:04}\n");
                        let _ = queue.append([line.as_bytes()]);
                    }
                });
            }

            let reader = queue.clone();
            let handle = scope.spawn(move || {
                let mut out = Vec::new();
                let mut buf = [0_u8; 5];
                let mut lines = 0;
                while lines < PRODUCERS * PER_PRODUCER {
                    let n = reader.read_into(&mut buf);
                    out.extend_from_slice(&buf[..n]);
                    lines += buf[..n].iter().filter(|b| **b == b'\n').count();
                    if n == 0 {
                        thread::yield_now();
                    }
                }
                out
            });
            handle.join().unwrap()
        });

        let text = String::from_utf8(consumed).unwrap();
        let mut lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), PRODUCERS * PER_PRODUCER);
        for producer in 0..PRODUCERS {
            let own: Vec<&str> = lines
                .iter()
                .copied()
                .filter(|line| line.starts_with(&format!("p{producer}:")))
                .collect();
            let mut sorted = own.clone();
            sorted.sort_unstable();
            assert_eq!(own, sorted, "producer {producer} lines out of order");
        }
        lines.sort_unstable();
        lines.dedup();
        assert_eq!(lines.len(), PRODUCERS * PER_PRODUCER);
        assert!(queue.is_empty());
    }
}
