//! Sender configuration
//!
//! Selects the streaming protocol and its options. Configuration can be built
//! in code or read from JSON/TOML; keys use camelCase on the wire:
//!
//! ```toml
//! protocolKind = "char-counting"
//! bufferSize = 128
//! ```

use crate::error::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default controller receive buffer capacity, in characters
pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// Default capacity of the event broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Flow-control discipline used to pace a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolKind {
    /// One command in flight; wait for its reply before sending the next
    SendResponse,
    /// Pipelined, bounded by the controller's receive buffer size
    CharCounting,
}

impl std::fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SendResponse => write!(f, "send-response"),
            Self::CharCounting => write!(f, "char-counting"),
        }
    }
}

impl std::str::FromStr for ProtocolKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "send-response" => Ok(Self::SendResponse),
            "char-counting" => Ok(Self::CharCounting),
            other => Err(Error::other(format!("Unknown protocol kind: {}", other))),
        }
    }
}

/// Protocol-specific and event options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SenderOptions {
    /// Controller receive buffer in characters (CharCounting only).
    /// Non-positive values select [`DEFAULT_BUFFER_SIZE`].
    pub buffer_size: i64,
    /// Capacity of the broadcast channel used by async event receivers
    pub event_capacity: usize,
    /// Number of published events kept for inspection (0 disables history)
    pub event_history: usize,
}

impl SenderOptions {
    /// Buffer size with the default applied to non-positive values
    pub fn effective_buffer_size(&self) -> usize {
        if self.buffer_size > 0 {
            self.buffer_size as usize
        } else {
            DEFAULT_BUFFER_SIZE
        }
    }

    /// Set the buffer size
    pub fn with_buffer_size(mut self, buffer_size: i64) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Enable event history with the given depth
    pub fn with_event_history(mut self, depth: usize) -> Self {
        self.event_history = depth;
        self
    }
}

impl Default for SenderOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE as i64,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            event_history: 0,
        }
    }
}

/// Complete sender configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SenderConfig {
    /// Streaming protocol; `None` admits every line unconditionally
    pub protocol_kind: Option<ProtocolKind>,
    /// Protocol and event options
    #[serde(flatten)]
    pub options: SenderOptions,
}

impl SenderConfig {
    /// Create a configuration for the given protocol with default options
    pub fn new(protocol_kind: Option<ProtocolKind>) -> Self {
        Self {
            protocol_kind,
            options: SenderOptions::default(),
        }
    }

    /// Parse a configuration from JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, picking the format from its extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string()).into()),
        }
    }

    /// Validate option ranges
    pub fn validate(&self) -> Result<()> {
        if self.options.event_capacity == 0 {
            return Err(ConfigError::InvalidEventCapacity {
                value: self.options.event_capacity,
            }
            .into());
        }
        Ok(())
    }
}
