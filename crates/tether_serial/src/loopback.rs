//! # Loopback Interface
//!
//! An in-process serial driver for tests and demos.
//!
//! `start` spawns a device thread. Everything passed to `send` is fed to
//! that thread over a channel and echoed back through the reporter as a
//! received message, so callbacks really do arrive from a thread the
//! bridge does not own.
//!
//! ```text
//! send(bytes) ──▶ [crossbeam channel] ──▶ device thread ──▶ report_message(bytes)
//! ```

use crossbeam_channel::{unbounded, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tether_core::{DriverError, EventReporter, Status};

use crate::config::LinkConfig;
use crate::hardware::{Discovery, HardwareInterface};
use crate::status::{SERIAL_STATUS_ENGINE_OFF, SERIAL_STATUS_ENGINE_ON};

/// Returned by `start` when `init` was never called.
pub const ERR_NOT_INITIALIZED: i32 = -1;
/// Returned by `start` when the device is already running.
pub const ERR_BUSY: i32 = -16;
/// Returned by `stop` when the device is not running.
pub const ERR_NOT_RUNNING: i32 = -19;

/// Work for the device thread.
enum Command {
    Bytes(Vec<u8>),
    Shutdown,
}

/// A running device thread.
struct Device {
    commands: Sender<Command>,
    handle: JoinHandle<()>,
}

/// Codes the loopback returns instead of succeeding.
#[derive(Clone, Copy, Debug, Default)]
struct Failures {
    init: Option<i32>,
    start: Option<i32>,
    stop: Option<i32>,
}

/// Simulated serial driver that echoes every write.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut manager = SerialManager::new(
///     SerialConfig::default(),
///     LoopbackInterface::discovery(),
/// )?;
/// manager.begin("loop0", 9600)?;
/// manager.print("PING")?; // comes back as a received message
/// ```
#[derive(Default)]
pub struct LoopbackInterface {
    reporter: Option<EventReporter>,
    device: Option<Device>,
    failures: Failures,
    bytes_echoed: Arc<AtomicU64>,
}

impl LoopbackInterface {
    /// Creates a loopback that succeeds at everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `init` fail with `code`.
    #[must_use]
    pub fn failing_init(mut self, code: i32) -> Self {
        self.failures.init = Some(code);
        self
    }

    /// Makes `start` fail with `code`.
    #[must_use]
    pub fn failing_start(mut self, code: i32) -> Self {
        self.failures.start = Some(code);
        self
    }

    /// Makes `stop` fail with `code`.
    #[must_use]
    pub fn failing_stop(mut self, code: i32) -> Self {
        self.failures.stop = Some(code);
        self
    }

    /// Discovery that finds a fresh, well-behaved loopback.
    #[must_use]
    pub fn discovery() -> Discovery {
        Box::new(|| Some(Box::new(LoopbackInterface::new()) as Box<dyn HardwareInterface>))
    }

    /// Returns true while the device thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.device.is_some()
    }

    /// Shared counter of bytes echoed back so far.
    #[must_use]
    pub fn bytes_echoed(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.bytes_echoed)
    }

    fn spawn_device(&self, reporter: EventReporter, name: String) -> Result<Device, DriverError> {
        let (commands, rx) = unbounded();
        let echoed = Arc::clone(&self.bytes_echoed);

        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                reporter.report_status(Status(SERIAL_STATUS_ENGINE_ON));
                while let Ok(Command::Bytes(bytes)) = rx.recv() {
                    echoed.fetch_add(bytes.len() as u64, Ordering::Relaxed);
                    reporter.report_message(&bytes);
                }
                reporter.report_status(Status(SERIAL_STATUS_ENGINE_OFF));
            })
            .map_err(|e| {
                tracing::warn!("Loopback device thread failed to spawn: {}", e);
                DriverError::new(ERR_BUSY)
            })?;

        Ok(Device { commands, handle })
    }
}

impl HardwareInterface for LoopbackInterface {
    fn init(&mut self, reporter: EventReporter) -> Result<(), DriverError> {
        if let Some(code) = self.failures.init {
            return Err(DriverError::new(code));
        }
        self.reporter = Some(reporter);
        Ok(())
    }

    fn start(&mut self, link: &LinkConfig) -> Result<(), DriverError> {
        if let Some(code) = self.failures.start {
            return Err(DriverError::new(code));
        }
        if self.device.is_some() {
            return Err(DriverError::new(ERR_BUSY));
        }
        let reporter = self
            .reporter
            .clone()
            .ok_or(DriverError::new(ERR_NOT_INITIALIZED))?;

        tracing::debug!("Loopback starting on {} at {} baud", link.device, link.baud);
        self.device = Some(self.spawn_device(reporter, format!("loopback:{}", link.device))?);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        if let Some(code) = self.failures.stop {
            return Err(DriverError::new(code));
        }
        let device = self.device.take().ok_or(DriverError::new(ERR_NOT_RUNNING))?;

        // An Err here means the thread already exited; join either way.
        let _ = device.commands.send(Command::Shutdown);
        if device.handle.join().is_err() {
            tracing::warn!("Loopback device thread panicked");
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Some(device) = self.device.take() {
            drop(device.commands);
            let _ = device.handle.join();
        }
        self.reporter = None;
    }

    fn send(&mut self, bytes: &[u8]) {
        match &self.device {
            Some(device) => {
                if device.commands.send(Command::Bytes(bytes.to_vec())).is_err() {
                    tracing::warn!("Loopback device gone, dropped {} bytes", bytes.len());
                }
            }
            None => tracing::warn!("Loopback not started, dropped {} bytes", bytes.len()),
        }
    }
}
