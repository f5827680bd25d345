//! Sender event definitions.
//!
//! Events are cloneable and serializable so they can be logged or replayed.

use serde::{Deserialize, Serialize};

/// Events published by a sender while streaming a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum SenderEvent {
    /// First line of a freshly loaded (or rewound) program was admitted
    Start,
    /// A line was admitted; the transport must write it to the link
    Data(String),
    /// Every line has been sent and acknowledged
    End,
    /// Admission was paused
    Hold {
        /// Why the program was held, if given
        reason: Option<String>,
    },
    /// Admission was resumed
    Unhold,
    /// The loaded program was returned to its first line
    Rewind,
}

impl SenderEvent {
    /// Get the kind of this event
    pub fn kind(&self) -> SenderEventKind {
        match self {
            SenderEvent::Start => SenderEventKind::Start,
            SenderEvent::Data(_) => SenderEventKind::Data,
            SenderEvent::End => SenderEventKind::End,
            SenderEvent::Hold { .. } => SenderEventKind::Hold,
            SenderEvent::Unhold => SenderEventKind::Unhold,
            SenderEvent::Rewind => SenderEventKind::Rewind,
        }
    }

    /// Line payload of a data event
    pub fn data(&self) -> Option<&str> {
        match self {
            SenderEvent::Data(line) => Some(line),
            _ => None,
        }
    }
}

impl std::fmt::Display for SenderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SenderEvent::Start => write!(f, "start"),
            SenderEvent::Data(line) => write!(f, "data: {}", line),
            SenderEvent::End => write!(f, "end"),
            SenderEvent::Hold { reason: Some(r) } => write!(f, "hold ({})", r),
            SenderEvent::Hold { reason: None } => write!(f, "hold"),
            SenderEvent::Unhold => write!(f, "unhold"),
            SenderEvent::Rewind => write!(f, "rewind"),
        }
    }
}

/// Event kind for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SenderEventKind {
    /// Program started.
    Start,
    /// Line admitted.
    Data,
    /// Program complete.
    End,
    /// Admission paused.
    Hold,
    /// Admission resumed.
    Unhold,
    /// Program rewound.
    Rewind,
}

impl std::fmt::Display for SenderEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SenderEventKind::Start => write!(f, "Start"),
            SenderEventKind::Data => write!(f, "Data"),
            SenderEventKind::End => write!(f, "End"),
            SenderEventKind::Hold => write!(f, "Hold"),
            SenderEventKind::Unhold => write!(f, "Unhold"),
            SenderEventKind::Rewind => write!(f, "Rewind"),
        }
    }
}
