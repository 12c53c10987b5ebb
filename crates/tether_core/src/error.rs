//! # Bridge Error Types
//!
//! All errors that can surface from bringing up the bridge or running it.
//!
//! The mailbox itself has no error path: `parking_lot` locks cannot be
//! poisoned and `lock()` cannot fail, so a broken synchronization primitive
//! is not a recoverable condition this crate reports.

use thiserror::Error;

/// Failure code reported by a hardware driver.
///
/// Drivers follow the C convention of returning `0` on success and a
/// non-zero code otherwise. The code is carried through untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("driver returned code {code}")]
pub struct DriverError {
    /// Raw driver return code.
    pub code: i32,
}

impl DriverError {
    /// Wraps a raw driver return code.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self { code }
    }
}

/// Errors that can occur while operating the bridge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// No hardware interface could be discovered at bring-up.
    #[error("no hardware interface available")]
    InterfaceUnavailable,

    /// The hardware interface rejected `init`.
    #[error("hardware interface init failed with code {code}")]
    InitializationFailed {
        /// Driver return code.
        code: i32,
    },

    /// The hardware interface rejected `start`.
    #[error("failed to start device {device}: code {code}")]
    StartFailed {
        /// Device the caller asked to start.
        device: String,
        /// Driver return code.
        code: i32,
    },

    /// The hardware interface rejected `stop`.
    #[error("failed to stop device: code {code}")]
    StopFailed {
        /// Driver return code.
        code: i32,
    },

    /// An operation that needs an enabled bridge was called while disabled.
    #[error("bridge is not enabled")]
    NotEnabled,

    /// The event thread could not be spawned.
    #[error("failed to spawn event thread: {0}")]
    EventThreadSpawn(String),

    /// The event thread panicked instead of exiting cleanly.
    #[error("event thread panicked")]
    EventThreadPanicked,

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A listener is gone and should be unregistered.
    #[error("listener disconnected")]
    ListenerDisconnected,
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
