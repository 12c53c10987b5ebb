//! # Event Aggregator
//!
//! The mailbox between driver callbacks and the event thread.
//!
//! ## Architecture
//!
//! ```text
//!   Driver thread ──┐                     ┌──────────────────────────┐
//!   Driver thread ──┼── report_*() ─────▶ │ Mutex<Mailbox>           │
//!   Any thread ─────┘   request_disable() │  pending: {S, M, D}      │
//!                                         │  status:  latest value   │
//!                                         │  message: latest payload │
//!                                         └────────────┬─────────────┘
//!                                                      │ notify_one
//!                                                      ▼
//!                                         ┌──────────────────────────┐
//!                                         │ drain() on event thread  │
//!                                         │  wait, copy, clear, drop │
//!                                         └────────────┬─────────────┘
//!                                                      ▼
//!                                            DrainView (owned, unlocked)
//! ```
//!
//! ## Rules
//!
//! - A pending bit is set in the same critical section that copies its
//!   payload, so a bit is never observed without its data.
//! - One slot per kind. A newer value replaces an undrained older one.
//! - The lock is held for O(1) copies only. Dispatch happens on the
//!   [`DrainView`] after the lock is released.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::event::{EventKind, PendingEventSet, Status};
use crate::message::MessageSnapshot;

/// Shared state guarded by the aggregator lock.
struct Mailbox {
    pending: PendingEventSet,
    status: Status,
    message: MessageSnapshot,
}

/// Counters kept by the aggregator.
#[derive(Debug, Default)]
pub struct AggregatorStats {
    /// Total status reports received.
    pub status_reports: AtomicU64,
    /// Total message reports received.
    pub message_reports: AtomicU64,
    /// Total disable requests received.
    pub disable_requests: AtomicU64,
    /// Reports that replaced an undrained value of the same kind.
    pub superseded: AtomicU64,
    /// Messages cut down to capacity.
    pub truncated_messages: AtomicU64,
    /// Completed drains.
    pub drains: AtomicU64,
}

/// Point-in-time copy of [`AggregatorStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Total status reports received.
    pub status_reports: u64,
    /// Total message reports received.
    pub message_reports: u64,
    /// Total disable requests received.
    pub disable_requests: u64,
    /// Reports that replaced an undrained value of the same kind.
    pub superseded: u64,
    /// Messages cut down to capacity.
    pub truncated_messages: u64,
    /// Completed drains.
    pub drains: u64,
}

impl AggregatorStats {
    /// Reads every counter.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            status_reports: self.status_reports.load(Ordering::Relaxed),
            message_reports: self.message_reports.load(Ordering::Relaxed),
            disable_requests: self.disable_requests.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            truncated_messages: self.truncated_messages.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
        }
    }
}

/// Consumer-owned copy of whatever was pending at drain time.
///
/// Producers never write to a view. A handler reading from it cannot be
/// raced by a later report, which only touches the shared mailbox.
#[derive(Clone, Debug)]
pub struct DrainView {
    status: Option<Status>,
    message: MessageSnapshot,
    has_message: bool,
}

impl DrainView {
    /// Creates an empty view able to hold `capacity` message bytes.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            status: None,
            message: MessageSnapshot::with_capacity(capacity),
            has_message: false,
        }
    }

    /// Status captured by the drain, if a status was pending.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// Message captured by the drain, if a message was pending.
    #[inline]
    #[must_use]
    pub fn message(&self) -> Option<&MessageSnapshot> {
        self.has_message.then_some(&self.message)
    }

    /// Returns up to `max_length` bytes of the captured message.
    ///
    /// Empty if no message was pending at drain time.
    #[inline]
    #[must_use]
    pub fn read_latest_message(&self, max_length: usize) -> &[u8] {
        match self.message() {
            Some(message) => message.read_latest(max_length),
            None => &[],
        }
    }

    fn reset(&mut self) {
        self.status = None;
        self.has_message = false;
        self.message.clear();
    }
}

/// Clears the in-flight drain flag when the drain returns.
///
/// Builds abort on panic, so the unwind path only runs under the test harness.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Coalescing mailbox between driver callbacks and a single consumer.
///
/// Created once at hardware bring-up and shared by `Arc` between the
/// driver (through [`EventReporter`]), the event thread, and anything
/// holding a [`ControlChannel`](crate::ControlChannel).
///
/// ## Usage
///
/// ```rust,ignore
/// let aggregator = EventAggregator::new(1024);
/// let reporter = aggregator.reporter();
///
/// // Driver thread
/// reporter.report_status(Status(1));
/// reporter.report_message(b"PING");
///
/// // Event thread
/// let (pending, view) = aggregator.drain();
/// for kind in pending.iter() {
///     // dispatch without the lock
/// }
/// ```
pub struct EventAggregator {
    /// Pending set plus one snapshot per payload kind.
    mailbox: Mutex<Mailbox>,
    /// Signalled whenever a kind is added to the pending set.
    wake: Condvar,
    /// Whether a drain is in flight.
    draining: AtomicBool,
    /// Message capacity fixed at construction.
    capacity: usize,
    /// Counters.
    stats: AggregatorStats,
}

impl EventAggregator {
    /// Creates a new aggregator with an empty pending set.
    ///
    /// # Arguments
    ///
    /// * `message_capacity` - Maximum message payload kept, in bytes
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(message_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            mailbox: Mutex::new(Mailbox {
                pending: PendingEventSet::new(),
                status: Status::default(),
                message: MessageSnapshot::with_capacity(message_capacity),
            }),
            wake: Condvar::new(),
            draining: AtomicBool::new(false),
            capacity: message_capacity,
            stats: AggregatorStats::default(),
        })
    }

    /// Maximum message payload kept, in bytes.
    #[inline]
    #[must_use]
    pub fn message_capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a view sized for this aggregator's messages.
    #[must_use]
    pub fn new_view(&self) -> DrainView {
        DrainView::with_capacity(self.capacity)
    }

    /// Returns the producer handle to hand to a driver.
    #[must_use]
    pub fn reporter(self: &Arc<Self>) -> EventReporter {
        EventReporter {
            aggregator: Arc::clone(self),
        }
    }

    /// Returns the counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns true if a drain would return without waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.mailbox.lock().pending.is_empty()
    }

    /// Returns true if a drain is currently in flight.
    #[inline]
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Records a new status value. Latest value wins.
    ///
    /// Never waits on the consumer. Wakes at most one blocked drain.
    pub fn report_status(&self, status: Status) {
        let superseded = {
            let mut mailbox = self.mailbox.lock();
            mailbox.status = status;
            let superseded = mailbox.pending.insert(EventKind::Status);
            self.wake.notify_one();
            superseded
        };

        self.stats.status_reports.fetch_add(1, Ordering::Relaxed);
        if superseded {
            self.stats.superseded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a new message payload. Latest payload wins.
    ///
    /// The payload is copied. Bytes past the message capacity are dropped;
    /// truncation is not an error.
    pub fn report_message(&self, payload: &[u8]) {
        let (superseded, dropped) = {
            let mut mailbox = self.mailbox.lock();
            let dropped = mailbox.message.overwrite(payload);
            let superseded = mailbox.pending.insert(EventKind::Message);
            self.wake.notify_one();
            (superseded, dropped)
        };

        self.stats.message_reports.fetch_add(1, Ordering::Relaxed);
        if superseded {
            self.stats.superseded.fetch_add(1, Ordering::Relaxed);
        }
        if dropped > 0 {
            self.stats.truncated_messages.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                "Message truncated: {} bytes kept, {} dropped",
                self.capacity,
                dropped
            );
        }
    }

    /// Wakes the consumer without new data.
    ///
    /// The drain that observes it reports [`EventKind::Disable`].
    pub fn request_disable(&self) {
        {
            let mut mailbox = self.mailbox.lock();
            mailbox.pending.insert(EventKind::Disable);
            self.wake.notify_one();
        }
        self.stats.disable_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Blocks until something is pending, then takes it.
    ///
    /// Allocates a fresh view. Long-lived consumers should prefer
    /// [`drain_into`](Self::drain_into).
    ///
    /// # Panics
    ///
    /// Panics if another drain is in flight.
    #[must_use]
    pub fn drain(&self) -> (PendingEventSet, DrainView) {
        let mut view = self.new_view();
        let pending = self.drain_into(&mut view);
        (pending, view)
    }

    /// Blocks until something is pending, then copies it into `view`.
    ///
    /// Under a single lock acquisition: waits for a non-empty pending set,
    /// copies each pending kind's snapshot into `view`, and clears the set.
    /// The lock is released before returning. Kinds that were not pending
    /// are absent from `view`.
    ///
    /// There is no timeout. [`request_disable`](Self::request_disable) is
    /// the way to unblock a waiting drain.
    ///
    /// # Panics
    ///
    /// Panics if another drain is in flight.
    pub fn drain_into(&self, view: &mut DrainView) -> PendingEventSet {
        let was_draining = self.draining.swap(true, Ordering::AcqRel);
        assert!(
            !was_draining,
            "Concurrent drain! Only one consumer may drain at a time."
        );
        let _guard = DrainGuard(&self.draining);

        let pending = {
            let mut mailbox = self.mailbox.lock();
            while mailbox.pending.is_empty() {
                self.wake.wait(&mut mailbox);
            }

            let pending = mailbox.pending.take();
            view.reset();
            if pending.contains(EventKind::Status) {
                view.status = Some(mailbox.status);
            }
            if pending.contains(EventKind::Message) {
                view.message.copy_from(&mailbox.message);
                view.has_message = true;
            }
            pending
        };

        self.stats.drains.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Drained {:?}", pending);
        pending
    }
}

/// Producer handle given to a hardware driver.
///
/// Cheap to clone. Every call is non-blocking with respect to the consumer.
#[derive(Clone)]
pub struct EventReporter {
    aggregator: Arc<EventAggregator>,
}

impl EventReporter {
    /// Driver callback: the status changed.
    #[inline]
    pub fn report_status(&self, status: Status) {
        self.aggregator.report_status(status);
    }

    /// Driver callback: a message was received.
    #[inline]
    pub fn report_message(&self, payload: &[u8]) {
        self.aggregator.report_message(payload);
    }
}

impl std::fmt::Debug for EventReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventReporter")
            .field("message_capacity", &self.aggregator.capacity)
            .finish()
    }
}
