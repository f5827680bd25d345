//! Error handling for GCodeStream
//!
//! The streaming engine itself never fails: load/ack/next communicate through
//! return values. Errors only exist at the edges:
//! - Configuration errors (parsing/validation of sender options)
//! - Transport errors (writing admitted lines to the physical link)
//! - A stalled stream (a line longer than the whole controller buffer)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Configuration error type
///
/// Represents invalid values found while building or loading a sender
/// configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Event channel capacity must be positive
    #[error("Invalid event capacity: {value}")]
    InvalidEventCapacity {
        /// The rejected capacity.
        value: usize,
    },

    /// The configuration file format is not supported
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
}

/// Main error type for GCodeStream
///
/// A unified error type for every fallible API in the workspace.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transport failed to deliver a line
    #[error("Transport error: {reason}")]
    Transport {
        /// The reason the write failed.
        reason: String,
    },

    /// A line can never fit the controller buffer, so streaming cannot go on
    #[error("Line {line} needs {length} bytes but the buffer holds {buffer_size}")]
    LineTooLong {
        /// 1-based line number.
        line: usize,
        /// Framed length of the line, terminator included.
        length: usize,
        /// Declared controller buffer capacity.
        buffer_size: usize,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create a transport error
    pub fn transport(reason: impl Into<String>) -> Self {
        Error::Transport {
            reason: reason.into(),
        }
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Check if this is a transport error
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Io(_))
    }

    /// Check if streaming stopped on a line that can never be sent
    pub fn is_stalled_error(&self) -> bool {
        matches!(self, Error::LineTooLong { .. })
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: Error = ConfigError::InvalidEventCapacity { value: 0 }.into();
        assert!(err.is_config_error());
        assert!(!err.is_transport_error());
        assert_eq!(err.to_string(), "Invalid event capacity: 0");
    }

    #[test]
    fn test_transport_error() {
        let err = Error::transport("port closed");
        assert!(err.is_transport_error());
        assert_eq!(err.to_string(), "Transport error: port closed");
    }

    #[test]
    fn test_line_too_long_error() {
        let err = Error::LineTooLong {
            line: 3,
            length: 41,
            buffer_size: 32,
        };
        assert!(err.is_stalled_error());
        assert!(!err.is_transport_error());
        assert_eq!(
            err.to_string(),
            "Line 3 needs 41 bytes but the buffer holds 32"
        );
    }
}
