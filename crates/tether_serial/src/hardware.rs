//! # Hardware Interface
//!
//! The contract a serial driver fulfils for the bridge.
//!
//! ## Glass Walls
//!
//! ```text
//! Bridge calls:              Driver calls back:
//! ┌──────────────────┐       ┌───────────────────────────────┐
//! │ init(reporter)   │       │ reporter.report_status(..)    │
//! │ start(link)      │ ────▶ │ reporter.report_message(..)   │
//! │ stop()           │       │   from any thread, any time   │
//! │ send(bytes)      │       │   after init                  │
//! │ cleanup()        │       └───────────────────────────────┘
//! └──────────────────┘
//! ```
//!
//! The driver never sees the mailbox or the consumer. The reporter it gets
//! from `init` is its only way in, and every call on it returns without
//! waiting for the consumer.

use tether_core::{DriverError, EventReporter};

use crate::config::LinkConfig;

/// A serial hardware driver.
pub trait HardwareInterface: Send {
    /// Prepares the driver and hands it the callback entry points.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure code.
    fn init(&mut self, reporter: EventReporter) -> Result<(), DriverError>;

    /// Opens `link.device` at `link.baud` and starts the engine.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure code.
    fn start(&mut self, link: &LinkConfig) -> Result<(), DriverError>;

    /// Stops the engine.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure code.
    fn stop(&mut self) -> Result<(), DriverError>;

    /// Releases everything acquired by `init`. The reporter must be dropped.
    fn cleanup(&mut self);

    /// Writes bytes to the device.
    fn send(&mut self, bytes: &[u8]);
}

/// Finds the hardware interface at bring-up.
///
/// Returns `None` if the platform has no serial hardware.
pub type Discovery = Box<dyn Fn() -> Option<Box<dyn HardwareInterface>> + Send + Sync>;
