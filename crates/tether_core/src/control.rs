//! # Control Channel
//!
//! Lets any thread wake the event thread when there is no hardware data.
//!
//! Without it, a drain with nothing pending blocks forever. Sending a
//! disable request turns that block into an observable [`EventKind::Disable`]
//! dispatch. Stopping the driver and leaving the loop are left to whoever
//! observes it.
//!
//! [`EventKind::Disable`]: crate::EventKind::Disable

use std::sync::Arc;

use crate::aggregator::EventAggregator;

/// Handle for injecting a disable request into the mailbox.
#[derive(Clone)]
pub struct ControlChannel {
    aggregator: Arc<EventAggregator>,
}

impl ControlChannel {
    /// Creates a control channel feeding `aggregator`.
    #[must_use]
    pub fn new(aggregator: Arc<EventAggregator>) -> Self {
        Self { aggregator }
    }

    /// Wakes the consumer with a disable request.
    #[inline]
    pub fn request_disable(&self) {
        self.aggregator.request_disable();
    }
}

impl EventAggregator {
    /// Returns a control channel for this aggregator.
    #[must_use]
    pub fn control_channel(self: &Arc<Self>) -> ControlChannel {
        ControlChannel::new(Arc::clone(self))
    }
}

impl std::fmt::Debug for ControlChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlChannel").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn test_request_disable_marks_pending() {
        let agg = EventAggregator::new(8);
        let control = agg.control_channel();
        control.request_disable();

        let (pending, _) = agg.drain();
        assert!(pending.contains(EventKind::Disable));
        assert_eq!(agg.stats().disable_requests, 1);
    }

    #[test]
    fn test_repeated_requests_coalesce() {
        let agg = EventAggregator::new(8);
        let control = agg.control_channel();
        control.request_disable();
        control.clone().request_disable();

        let (pending, _) = agg.drain();
        assert_eq!(pending.len(), 1);
        assert!(!agg.has_pending());
    }
}
