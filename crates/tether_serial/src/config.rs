//! # Serial Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! event_thread_name = "SerialEventThread"
//!
//! [link]
//! device = "/dev/ttyS0"
//! baud = 115200
//!
//! [mailbox]
//! message_capacity = 1024
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use tether_core::{BridgeError, BridgeResult};

/// Which device to open and how.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Device identifier passed to the driver.
    pub device: String,
    /// Line speed in baud.
    pub baud: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyS0".to_string(),
            baud: 115_200,
        }
    }
}

impl LinkConfig {
    /// Creates a link config for `device` at `baud`.
    #[must_use]
    pub fn new(device: impl Into<String>, baud: u32) -> Self {
        Self {
            device: device.into(),
            baud,
        }
    }
}

/// Sizing of the event mailbox.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Longest message payload kept, in bytes. Longer payloads are truncated.
    pub message_capacity: usize,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            message_capacity: 1024,
        }
    }
}

/// Top-level configuration for a [`SerialManager`](crate::SerialManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Default link used by `begin_configured`.
    pub link: LinkConfig,
    /// Mailbox sizing.
    pub mailbox: MailboxConfig,
    /// Name given to the event thread.
    pub event_thread_name: String,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            mailbox: MailboxConfig::default(),
            event_thread_name: "SerialEventThread".to_string(),
        }
    }
}

impl SerialConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the document does not parse or fails
    /// validation.
    pub fn from_toml_str(source: &str) -> BridgeResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| BridgeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read, does not parse,
    /// or fails validation.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks values the driver and mailbox cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first bad field.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.mailbox.message_capacity == 0 {
            return Err(BridgeError::InvalidConfig(
                "mailbox.message_capacity must be greater than zero".to_string(),
            ));
        }
        if self.link.baud == 0 {
            return Err(BridgeError::InvalidConfig(
                "link.baud must be greater than zero".to_string(),
            ));
        }
        if self.link.device.trim().is_empty() {
            return Err(BridgeError::InvalidConfig(
                "link.device must not be empty".to_string(),
            ));
        }
        if self.event_thread_name.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "event_thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
