//! Controller response classification
//!
//! Only the replies that matter for flow control are distinguished: each `ok`
//! or `error:` (numbered, or the textual form of GRBL 0.9) answers exactly one
//! command and frees its buffer slot. Status reports, alarms and banners
//! answer nothing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A line received from the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerResponse {
    /// OK acknowledgment
    Ok,
    /// Command rejected with an error code
    Error(u8),
    /// Command rejected with a textual reason (`error: Bad number format`)
    ErrorText(String),
    /// Alarm with alarm code
    Alarm(u8),
    /// Alarm with a textual reason (`ALARM: Hard limit`)
    AlarmText(String),
    /// Real-time status report (`<...>`)
    Status(String),
    /// Startup banner or any other text
    Message(String),
}

impl ControllerResponse {
    /// Classify a response line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();

        if line.is_empty() {
            return None;
        }

        if line.eq_ignore_ascii_case("ok") {
            return Some(Self::Ok);
        }

        if let Some(reason) = strip_prefix_ignore_case(line, "error:") {
            return Some(match reason.parse::<u8>() {
                Ok(code) => Self::Error(code),
                Err(_) => Self::ErrorText(reason.to_string()),
            });
        }

        if let Some(reason) = strip_prefix_ignore_case(line, "alarm:") {
            return Some(match reason.parse::<u8>() {
                Ok(code) => Self::Alarm(code),
                Err(_) => Self::AlarmText(reason.to_string()),
            });
        }

        if line.starts_with('<') && line.ends_with('>') {
            return Some(Self::Status(line[1..line.len() - 1].to_string()));
        }

        Some(Self::Message(line.to_string()))
    }

    /// Whether this reply completes one outstanding command
    pub fn is_acknowledgment(&self) -> bool {
        matches!(self, Self::Ok | Self::Error(_) | Self::ErrorText(_))
    }

    /// Whether the controller rejected the command
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_) | Self::ErrorText(_))
    }

    /// Whether the controller entered an alarm state
    pub fn is_alarm(&self) -> bool {
        matches!(self, Self::Alarm(_) | Self::AlarmText(_))
    }
}

/// `line` without `prefix` (ASCII, any case), trimmed
fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(line[prefix.len()..].trim())
    } else {
        None
    }
}

impl fmt::Display for ControllerResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Error(code) => write!(f, "error:{}", code),
            Self::ErrorText(reason) => write!(f, "error: {}", reason),
            Self::Alarm(code) => write!(f, "ALARM:{}", code),
            Self::AlarmText(reason) => write!(f, "ALARM: {}", reason),
            Self::Status(report) => write!(f, "<{}>", report),
            Self::Message(msg) => write!(f, "{}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok() {
        assert_eq!(ControllerResponse::parse("ok"), Some(ControllerResponse::Ok));
        assert_eq!(ControllerResponse::parse(" OK\r"), Some(ControllerResponse::Ok));
    }

    #[test]
    fn test_parse_error_and_alarm() {
        assert_eq!(
            ControllerResponse::parse("error:23"),
            Some(ControllerResponse::Error(23))
        );
        assert_eq!(
            ControllerResponse::parse("ALARM:1"),
            Some(ControllerResponse::Alarm(1))
        );
    }

    #[test]
    fn test_parse_textual_error_and_alarm() {
        let response = ControllerResponse::parse("error: Bad number format").unwrap();
        assert_eq!(
            response,
            ControllerResponse::ErrorText("Bad number format".to_string())
        );
        assert!(response.is_acknowledgment());
        assert!(response.is_error());

        let response = ControllerResponse::parse("ALARM: Hard limit").unwrap();
        assert_eq!(
            response,
            ControllerResponse::AlarmText("Hard limit".to_string())
        );
        assert!(response.is_alarm());
        assert!(!response.is_acknowledgment());
        assert_eq!(response.to_string(), "ALARM: Hard limit");

        assert_eq!(
            ControllerResponse::parse("Error:"),
            Some(ControllerResponse::ErrorText(String::new()))
        );
    }

    #[test]
    fn test_parse_status_and_message() {
        assert_eq!(
            ControllerResponse::parse("<Idle|MPos:0.000,0.000,0.000>"),
            Some(ControllerResponse::Status(
                "Idle|MPos:0.000,0.000,0.000".to_string()
            ))
        );
        assert_eq!(
            ControllerResponse::parse("Grbl 1.1h ['$' for help]"),
            Some(ControllerResponse::Message(
                "Grbl 1.1h ['$' for help]".to_string()
            ))
        );
        assert_eq!(ControllerResponse::parse("   "), None);
    }

    #[test]
    fn test_acknowledgments() {
        assert!(ControllerResponse::Ok.is_acknowledgment());
        assert!(ControllerResponse::Error(9).is_acknowledgment());
        assert!(ControllerResponse::ErrorText("Invalid gcode ID:24".to_string()).is_acknowledgment());
        assert!(!ControllerResponse::Alarm(2).is_acknowledgment());
        assert!(!ControllerResponse::AlarmText("Abort during cycle".to_string()).is_acknowledgment());
        assert!(!ControllerResponse::Status("Run".to_string()).is_acknowledgment());
    }

    #[test]
    fn test_display() {
        assert_eq!(ControllerResponse::Error(5).to_string(), "error:5");
        assert_eq!(ControllerResponse::Alarm(3).to_string(), "ALARM:3");
    }
}
