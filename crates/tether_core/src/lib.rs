//! # TETHER Core
//!
//! Moves event data from driver callback threads to exactly one consumer
//! thread without ever making the driver wait.
//!
//! ## Architecture Rules
//!
//! 1. **Producers never block on the consumer** - Reports take the lock for
//!    an O(1) copy and return
//! 2. **Latest value wins** - One slot per event kind, no backlog
//! 3. **No lock across dispatch** - Handlers run on a drained copy
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_core::{EventAggregator, EventConsumer, Status};
//!
//! let aggregator = EventAggregator::new(1024);
//! let reporter = aggregator.reporter();     // hand to the driver
//! let control = aggregator.control_channel(); // keep for shutdown
//!
//! let mut consumer = EventConsumer::new(aggregator);
//! consumer.run(&mut handler, &enabled)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod aggregator;
pub mod consumer;
pub mod control;
pub mod error;
pub mod event;
pub mod message;

pub use aggregator::{AggregatorStats, DrainView, EventAggregator, EventReporter, StatsSnapshot};
pub use consumer::{EventConsumer, EventHandler};
pub use control::ControlChannel;
pub use error::{BridgeError, BridgeResult, DriverError};
pub use event::{EventKind, PendingEventSet, Status};
pub use message::MessageSnapshot;
