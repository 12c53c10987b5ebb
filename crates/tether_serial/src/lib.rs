//! # TETHER Serial
//!
//! Serial hardware bring-up on top of the `tether_core` event bridge.
//!
//! The [`SerialManager`] discovers a [`HardwareInterface`], hands it an
//! [`EventReporter`](tether_core::EventReporter), and runs one event thread
//! that turns drained events into listener calls.
//!
//! ```text
//! driver thread ──report──▶ EventAggregator ──drain──▶ event thread ──▶ listeners
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod hardware;
pub mod listener;
pub mod loopback;
pub mod manager;
pub mod status;

pub use config::{LinkConfig, MailboxConfig, SerialConfig};
pub use hardware::{Discovery, HardwareInterface};
pub use listener::{ListenerRegistry, MessageListener, StatusListener};
pub use loopback::LoopbackInterface;
pub use manager::SerialManager;
pub use status::{
    SerialEvent, SERIAL_STATUS_ENGINE_OFF, SERIAL_STATUS_ENGINE_ON, SERIAL_STATUS_NONE,
};
