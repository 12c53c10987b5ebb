//! # Event Consumer
//!
//! The dispatch loop that runs on the event thread.
//!
//! Each cycle drains the mailbox into a consumer-owned [`DrainView`] and
//! then calls the handler for every pending kind, in dispatch order, with
//! the lock already released:
//!
//! ```text
//! loop {
//!     drain_into(view)          // lock, wait, copy, clear, unlock
//!     on_status(view.status)    // if pending
//!     on_message_available(..)  // if pending
//!     on_disable_requested()    // if pending
//! }
//! ```
//!
//! Handler errors stop the cycle and are returned to the loop's owner.
//! The mailbox is already clear by then, so the next drain is unaffected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::aggregator::{DrainView, EventAggregator};
use crate::event::{EventKind, PendingEventSet, Status};
use crate::message::MessageSnapshot;

/// Consumer-side callbacks, invoked only from the dispatch loop.
pub trait EventHandler {
    /// Error a handler may raise. Propagated unchanged to the loop's owner.
    type Error;

    /// The status changed. Receives the latest value before the drain.
    ///
    /// # Errors
    ///
    /// Any error stops the current dispatch cycle.
    fn on_status(&mut self, status: Status) -> Result<(), Self::Error>;

    /// A message is available.
    ///
    /// `message` is the drain-time copy; use
    /// [`MessageSnapshot::read_latest`] to read a bounded prefix.
    ///
    /// # Errors
    ///
    /// Any error stops the current dispatch cycle.
    fn on_message_available(&mut self, message: &MessageSnapshot) -> Result<(), Self::Error>;

    /// A disable request was observed.
    ///
    /// # Errors
    ///
    /// Any error stops the current dispatch cycle.
    fn on_disable_requested(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Single consumer of an [`EventAggregator`].
///
/// Owns the reusable [`DrainView`], so the steady-state loop does not
/// allocate.
pub struct EventConsumer {
    aggregator: Arc<EventAggregator>,
    view: DrainView,
    cycles: u64,
}

impl EventConsumer {
    /// Creates a consumer for `aggregator`.
    #[must_use]
    pub fn new(aggregator: Arc<EventAggregator>) -> Self {
        let view = aggregator.new_view();
        Self {
            aggregator,
            view,
            cycles: 0,
        }
    }

    /// Number of completed drains.
    #[inline]
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The view captured by the most recent drain.
    #[inline]
    #[must_use]
    pub fn last_view(&self) -> &DrainView {
        &self.view
    }

    /// Runs one drain and dispatch cycle.
    ///
    /// Blocks until at least one kind is pending. Returns the set that was
    /// dispatched.
    ///
    /// # Errors
    ///
    /// Returns the first handler error. Kinds after the failing one in
    /// dispatch order are not delivered for this cycle.
    ///
    /// # Panics
    ///
    /// Panics if another thread is draining the same aggregator.
    pub fn dispatch_once<H: EventHandler>(
        &mut self,
        handler: &mut H,
    ) -> Result<PendingEventSet, H::Error> {
        let pending = self.aggregator.drain_into(&mut self.view);
        self.cycles += 1;

        for kind in pending.iter() {
            match kind {
                EventKind::Status => {
                    if let Some(status) = self.view.status() {
                        handler.on_status(status)?;
                    }
                }
                EventKind::Message => {
                    if let Some(message) = self.view.message() {
                        handler.on_message_available(message)?;
                    }
                }
                EventKind::Disable => handler.on_disable_requested()?,
            }
        }

        Ok(pending)
    }

    /// Dispatches cycles until a disable request is observed with `enabled`
    /// cleared.
    ///
    /// To stop the loop, clear the flag and then send a disable request.
    /// Anything reported before the request is dispatched ahead of it, in
    /// the same or an earlier cycle. A disable request seen while the flag
    /// is still set is dispatched and the loop carries on.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; the loop stops there.
    pub fn run<H: EventHandler>(
        &mut self,
        handler: &mut H,
        enabled: &AtomicBool,
    ) -> Result<(), H::Error> {
        tracing::debug!("Event loop starting");
        loop {
            let pending = self.dispatch_once(handler)?;
            if pending.contains(EventKind::Disable) && !enabled.load(Ordering::Acquire) {
                break;
            }
        }
        tracing::debug!("Event loop exiting after {} cycles", self.cycles);
        Ok(())
    }
}
