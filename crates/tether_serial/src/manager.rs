//! # Serial Manager
//!
//! Brings the hardware up, runs the event thread, and tears both down.
//!
//! ## Lifecycle
//!
//! ```text
//!            enable()                          begin(device, baud)
//!  Disabled ─────────▶ Enabled (thread up) ─────────────────────▶ Started
//!     ▲                   │  init(reporter)                          │
//!     │   disable()       │                            end(): stop() │
//!     └───────────────────┴──────────────────────────────────────────┘
//!       clear flag, request_disable, join thread, cleanup()
//! ```
//!
//! Each enable starts a fresh session: a new mailbox, a new control channel
//! and a new event thread. Disable drops all three.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tether_core::{
    BridgeError, BridgeResult, ControlChannel, EventAggregator, EventConsumer, EventHandler,
    MessageSnapshot, StatsSnapshot, Status,
};

use crate::config::{LinkConfig, SerialConfig};
use crate::hardware::{Discovery, HardwareInterface};
use crate::listener::{ListenerRegistry, MessageListener, StatusListener};
use crate::status::SerialEvent;

/// Dispatch target run on the event thread.
///
/// Turns drained events into engine state and listener calls.
struct ListenerDispatch {
    listeners: Arc<ListenerRegistry>,
    engine_on: Arc<AtomicBool>,
}

impl EventHandler for ListenerDispatch {
    type Error = Infallible;

    fn on_status(&mut self, status: Status) -> Result<(), Self::Error> {
        tracing::trace!("Status reported: {}", status.code());
        match SerialEvent::from_status(status) {
            Some(event) => {
                self.engine_on.store(event.engine_on(), Ordering::Release);
                self.listeners.notify_status(event);
            }
            None => tracing::debug!("Ignoring status code {}", status.code()),
        }
        Ok(())
    }

    fn on_message_available(&mut self, message: &MessageSnapshot) -> Result<(), Self::Error> {
        // Don't bother decoding if nobody is listening.
        if self.listeners.message_listener_count() > 0 {
            self.listeners.notify_message(&message.to_string_lossy());
        }
        Ok(())
    }

    fn on_disable_requested(&mut self) -> Result<(), Self::Error> {
        tracing::debug!("Disable requested");
        Ok(())
    }
}

/// Everything that lives between one enable and the next disable.
struct Session {
    aggregator: Arc<EventAggregator>,
    control: ControlChannel,
    running: Arc<AtomicBool>,
    event_thread: JoinHandle<()>,
}

/// Owner of the hardware interface and the event thread.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut manager = SerialManager::new(config, discovery)?;
/// manager.add_message_listener(Arc::new(|msg: &str| -> BridgeResult<()> {
///     println!("got {msg}");
///     Ok(())
/// }));
///
/// manager.begin("/dev/ttyS1", 115_200)?;
/// manager.print("hello")?;
/// manager.end()?;
/// ```
pub struct SerialManager {
    config: SerialConfig,
    discovery: Discovery,
    /// Discovered interface, cached after the first successful lookup.
    interface: parking_lot::Mutex<Option<Box<dyn HardwareInterface>>>,
    listeners: Arc<ListenerRegistry>,
    engine_on: Arc<AtomicBool>,
    session: Option<Session>,
}

impl SerialManager {
    /// Creates a disabled manager.
    ///
    /// Discovery is not run until the interface is first needed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the config fails validation.
    pub fn new(config: SerialConfig, discovery: Discovery) -> BridgeResult<Self> {
        config.validate()?;
        tracing::debug!("Constructed serial manager");
        Ok(Self {
            config,
            discovery,
            interface: parking_lot::Mutex::new(None),
            listeners: Arc::new(ListenerRegistry::new()),
            engine_on: Arc::new(AtomicBool::new(false)),
            session: None,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Returns true if a hardware interface can be found.
    pub fn is_supported(&self) -> bool {
        let mut slot = self.interface.lock();
        if slot.is_none() {
            *slot = (self.discovery)();
        }
        slot.is_some()
    }

    /// Returns true between a successful `enable` and the next `disable`.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    /// Returns true if the last engine transition was a start.
    #[inline]
    #[must_use]
    pub fn is_engine_on(&self) -> bool {
        self.engine_on.load(Ordering::Acquire)
    }

    /// Mailbox counters for the current session.
    #[must_use]
    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.session.as_ref().map(|s| s.aggregator.stats())
    }

    /// Control channel for the current session.
    #[must_use]
    pub fn control_channel(&self) -> Option<ControlChannel> {
        self.session.as_ref().map(|s| s.control.clone())
    }

    /// Initializes the hardware and starts the event thread.
    ///
    /// Does nothing if already enabled.
    ///
    /// # Errors
    ///
    /// - `InterfaceUnavailable` if discovery finds nothing
    /// - `InitializationFailed` if the driver rejects `init`
    /// - `EventThreadSpawn` if the event thread cannot be created
    pub fn enable(&mut self) -> BridgeResult<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let aggregator = EventAggregator::new(self.config.mailbox.message_capacity);
        {
            let mut slot = self.interface.lock();
            if slot.is_none() {
                tracing::debug!("Attempting to discover hardware interface");
                *slot = (self.discovery)();
            }
            let Some(interface) = slot.as_mut() else {
                tracing::warn!("No hardware interface found");
                return Err(BridgeError::InterfaceUnavailable);
            };
            interface.init(aggregator.reporter()).map_err(|e| {
                tracing::warn!("Could not initialize hardware interface: {}", e);
                BridgeError::InitializationFailed { code: e.code }
            })?;
        }

        let running = Arc::new(AtomicBool::new(true));
        let spawned = {
            let aggregator = Arc::clone(&aggregator);
            let running = Arc::clone(&running);
            let mut dispatch = ListenerDispatch {
                listeners: Arc::clone(&self.listeners),
                engine_on: Arc::clone(&self.engine_on),
            };
            thread::Builder::new()
                .name(self.config.event_thread_name.clone())
                .spawn(move || {
                    tracing::debug!("Event thread starting");
                    let mut consumer = EventConsumer::new(aggregator);
                    if let Err(never) = consumer.run(&mut dispatch, &running) {
                        match never {}
                    }
                    tracing::debug!("Event thread exiting");
                })
        };

        let event_thread = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                if let Some(interface) = self.interface.lock().as_mut() {
                    interface.cleanup();
                }
                return Err(BridgeError::EventThreadSpawn(e.to_string()));
            }
        };

        self.session = Some(Session {
            control: aggregator.control_channel(),
            aggregator,
            running,
            event_thread,
        });
        tracing::info!("Serial bridge enabled");
        Ok(())
    }

    /// Stops the event thread and releases the hardware.
    ///
    /// Does nothing if not enabled.
    ///
    /// # Errors
    ///
    /// Returns `EventThreadPanicked` if the event thread died. The hardware
    /// is cleaned up either way.
    pub fn disable(&mut self) -> BridgeResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        // The loop exits at the first disable request it sees with the flag clear.
        session.running.store(false, Ordering::Release);
        session.control.request_disable();
        let joined = session
            .event_thread
            .join()
            .map_err(|_| BridgeError::EventThreadPanicked);
        self.engine_on.store(false, Ordering::Release);

        if let Some(interface) = self.interface.lock().as_mut() {
            interface.cleanup();
        }

        match &joined {
            Ok(()) => tracing::info!("Serial bridge disabled"),
            Err(e) => tracing::warn!("Serial bridge disabled: {}", e),
        }
        joined
    }

    /// Enables the bridge and starts the engine on `device`.
    ///
    /// # Errors
    ///
    /// Any error from [`enable`](Self::enable), or `StartFailed` if the
    /// driver rejects `start`.
    pub fn begin(&mut self, device: &str, baud: u32) -> BridgeResult<()> {
        self.begin_link(&LinkConfig::new(device, baud))
    }

    /// Enables the bridge and starts the engine on the configured link.
    ///
    /// # Errors
    ///
    /// Same as [`begin`](Self::begin).
    pub fn begin_configured(&mut self) -> BridgeResult<()> {
        let link = self.config.link.clone();
        self.begin_link(&link)
    }

    fn begin_link(&mut self, link: &LinkConfig) -> BridgeResult<()> {
        self.enable()?;
        tracing::info!("Starting {} at {} baud", link.device, link.baud);
        self.with_interface(|interface| interface.start(link))?
            .map_err(|e| BridgeError::StartFailed {
                device: link.device.clone(),
                code: e.code,
            })
    }

    /// Stops the engine, then disables the bridge.
    ///
    /// Stopping first lets the driver's final status reach listeners before
    /// the event thread exits. The bridge is disabled even if `stop` fails.
    ///
    /// # Errors
    ///
    /// `NotEnabled` if not enabled, `StopFailed` if the driver rejects
    /// `stop`, or any error from [`disable`](Self::disable).
    pub fn end(&mut self) -> BridgeResult<()> {
        if self.session.is_none() {
            return Err(BridgeError::NotEnabled);
        }
        let stopped = self.with_interface(|interface| interface.stop())?;
        self.disable()?;
        stopped.map_err(|e| BridgeError::StopFailed { code: e.code })
    }

    /// Writes text to the device.
    ///
    /// # Errors
    ///
    /// `NotEnabled` if the bridge is not enabled.
    pub fn print(&self, text: &str) -> BridgeResult<()> {
        self.send(text.as_bytes())
    }

    /// Writes bytes to the device.
    ///
    /// # Errors
    ///
    /// `NotEnabled` if the bridge is not enabled.
    pub fn send(&self, bytes: &[u8]) -> BridgeResult<()> {
        if self.session.is_none() {
            return Err(BridgeError::NotEnabled);
        }
        self.with_interface(|interface| interface.send(bytes))
    }

    /// Registers a status listener. Returns true if it is now registered.
    pub fn add_status_listener(&self, listener: Arc<dyn StatusListener>) -> bool {
        self.listeners.add_status_listener(listener)
    }

    /// Unregisters a status listener. Returns true if it was registered.
    pub fn remove_status_listener(&self, listener: &Arc<dyn StatusListener>) -> bool {
        self.listeners.remove_status_listener(listener)
    }

    /// Registers a message listener. Returns true if it is now registered.
    pub fn add_message_listener(&self, listener: Arc<dyn MessageListener>) -> bool {
        self.listeners.add_message_listener(listener)
    }

    /// Unregisters a message listener. Returns true if it was registered.
    pub fn remove_message_listener(&self, listener: &Arc<dyn MessageListener>) -> bool {
        self.listeners.remove_message_listener(listener)
    }

    fn with_interface<T>(
        &self,
        f: impl FnOnce(&mut Box<dyn HardwareInterface>) -> T,
    ) -> BridgeResult<T> {
        let mut slot = self.interface.lock();
        let interface = slot.as_mut().ok_or(BridgeError::InterfaceUnavailable)?;
        Ok(f(interface))
    }
}

impl Drop for SerialManager {
    fn drop(&mut self) {
        if let Err(e) = self.disable() {
            tracing::warn!("Disable on drop failed: {}", e);
        }
    }
}
