//! # Serial Status Codes
//!
//! Raw status codes a serial driver reports, and the listener-facing events
//! derived from them. The numeric values are part of the driver contract.

use tether_core::Status;

/// No status.
pub const SERIAL_STATUS_NONE: i32 = 0;
/// The serial engine is running.
pub const SERIAL_STATUS_ENGINE_ON: i32 = 1;
/// The serial engine has stopped.
pub const SERIAL_STATUS_ENGINE_OFF: i32 = 2;

/// Engine transition delivered to status listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SerialEvent {
    /// The serial engine has started.
    Started = 1,
    /// The serial engine has stopped.
    Stopped = 2,
}

impl SerialEvent {
    /// Maps a driver status to an engine transition.
    ///
    /// Returns `None` for codes that are not transitions.
    #[must_use]
    pub const fn from_status(status: Status) -> Option<Self> {
        match status.code() {
            SERIAL_STATUS_ENGINE_ON => Some(SerialEvent::Started),
            SERIAL_STATUS_ENGINE_OFF => Some(SerialEvent::Stopped),
            _ => None,
        }
    }

    /// Returns true if the engine is running after this event.
    #[inline]
    #[must_use]
    pub const fn engine_on(self) -> bool {
        matches!(self, SerialEvent::Started)
    }
}
