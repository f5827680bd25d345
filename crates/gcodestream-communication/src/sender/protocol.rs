//! Streaming protocols
//!
//! A streaming protocol decides whether the next command may be written to the
//! controller now, and keeps the accounting needed to make that decision:
//! - `SendResponse`: a single command in flight, the next one waits for its reply
//! - `CharCounting`: commands are pipelined as long as their framed lengths fit
//!   the controller's receive buffer
//!
//! Lengths are measured in bytes and include the line terminator the transport
//! appends to every command.

use gcodestream_core::{ProtocolKind, SenderOptions, DEFAULT_BUFFER_SIZE};
use std::collections::VecDeque;

/// Bytes the transport appends to each command
pub const LINE_TERMINATOR_LEN: usize = 1;

/// Length a command occupies in the controller's receive buffer
pub fn framed_len(line: &str) -> usize {
    line.len() + LINE_TERMINATOR_LEN
}

/// Send-and-wait discipline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendResponse {
    awaiting_response: bool,
}

impl SendResponse {
    /// Create a new send-response protocol
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a command is waiting for its acknowledgment
    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    /// Admit a command if nothing is in flight
    pub fn try_admit(&mut self) -> bool {
        if self.awaiting_response {
            return false;
        }
        self.awaiting_response = true;
        true
    }

    /// Release the in-flight command. Returns false if there was none.
    pub fn ack(&mut self) -> bool {
        std::mem::replace(&mut self.awaiting_response, false)
    }

    /// Forget the in-flight command
    pub fn clear(&mut self) {
        self.awaiting_response = false;
    }
}

/// Character-counting discipline
///
/// Mirrors the controller's receive buffer: every admitted command adds its
/// framed length to `data_length` and is queued; every acknowledgment pops the
/// oldest entry. `data_length` always equals the sum of the queue and never
/// exceeds `buffer_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharCounting {
    buffer_size: usize,
    data_length: usize,
    queue: VecDeque<usize>,
    line: String,
}

impl CharCounting {
    /// Create a protocol for a controller buffer of `buffer_size` bytes.
    /// Zero selects [`DEFAULT_BUFFER_SIZE`].
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: if buffer_size > 0 {
                buffer_size
            } else {
                DEFAULT_BUFFER_SIZE
            },
            data_length: 0,
            queue: VecDeque::new(),
            line: String::new(),
        }
    }

    /// Declared controller buffer capacity
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Change the buffer capacity
    ///
    /// Zero is rejected and the previous value kept. The capacity is never
    /// reduced below the data already in flight. Returns the effective value.
    pub fn set_buffer_size(&mut self, buffer_size: usize) -> usize {
        if buffer_size == 0 {
            tracing::warn!(
                "Rejected buffer size 0, keeping {} bytes",
                self.buffer_size
            );
            return self.buffer_size;
        }

        if buffer_size < self.data_length {
            tracing::debug!(
                "Buffer size {} clamped to {} bytes in flight",
                buffer_size,
                self.data_length
            );
        }
        self.buffer_size = buffer_size.max(self.data_length);
        self.buffer_size
    }

    /// Bytes currently accounted as in flight
    pub fn data_length(&self) -> usize {
        self.data_length
    }

    /// Framed lengths of the unacknowledged commands, oldest first
    pub fn queue(&self) -> &VecDeque<usize> {
        &self.queue
    }

    /// Line held back because it did not fit
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Free space left in the controller buffer
    pub fn available(&self) -> usize {
        self.buffer_size - self.data_length
    }

    /// Current buffer usage as a percentage
    pub fn usage_percent(&self) -> u32 {
        ((self.data_length as f64 / self.buffer_size as f64) * 100.0) as u32
    }

    /// Whether `line` fits in the remaining space
    pub fn fits(&self, line: &str) -> bool {
        self.data_length + framed_len(line) <= self.buffer_size
    }

    /// Whether `line` could fit in an empty buffer
    pub fn can_ever_fit(&self, line: &str) -> bool {
        framed_len(line) <= self.buffer_size
    }

    /// Admit `line` if it fits, queueing its framed length
    pub fn try_admit(&mut self, line: &str) -> bool {
        if !self.fits(line) {
            return false;
        }

        let len = framed_len(line);
        self.queue.push_back(len);
        self.data_length += len;
        self.line.clear();
        true
    }

    /// Keep a line that did not fit until the next attempt
    pub fn defer(&mut self, line: String) {
        self.line = line;
    }

    /// Take the deferred line, if any
    pub fn take_pending(&mut self) -> Option<String> {
        if self.line.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.line))
        }
    }

    /// Release the oldest in-flight command. No-op on an empty queue.
    pub fn ack(&mut self) -> Option<usize> {
        let len = self.queue.pop_front()?;
        self.data_length -= len;
        Some(len)
    }

    /// Drop all in-flight accounting. The buffer size is kept.
    pub fn clear(&mut self) {
        self.data_length = 0;
        self.queue.clear();
        self.line.clear();
    }
}

impl Default for CharCounting {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

/// The streaming protocol a sender paces its program with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamingProtocol {
    /// No flow control; every line is admitted
    Unbounded,
    /// One command in flight
    SendResponse(SendResponse),
    /// Pipelined within the controller buffer
    CharCounting(CharCounting),
}

impl StreamingProtocol {
    /// Build the protocol for `kind`
    pub fn new(kind: Option<ProtocolKind>, options: &SenderOptions) -> Self {
        match kind {
            None => Self::Unbounded,
            Some(ProtocolKind::SendResponse) => Self::SendResponse(SendResponse::new()),
            Some(ProtocolKind::CharCounting) => {
                Self::CharCounting(CharCounting::new(options.effective_buffer_size()))
            }
        }
    }

    /// Protocol kind, `None` when unbounded
    pub fn kind(&self) -> Option<ProtocolKind> {
        match self {
            Self::Unbounded => None,
            Self::SendResponse(_) => Some(ProtocolKind::SendResponse),
            Self::CharCounting(_) => Some(ProtocolKind::CharCounting),
        }
    }

    /// Whether several commands may be admitted by one `next()`
    pub fn is_pipelined(&self) -> bool {
        matches!(self, Self::CharCounting(_))
    }

    /// Decide whether `line` may be sent now, recording it if so
    pub fn try_admit(&mut self, line: &str) -> bool {
        match self {
            Self::Unbounded => true,
            Self::SendResponse(sp) => sp.try_admit(),
            Self::CharCounting(sp) => sp.try_admit(line),
        }
    }

    /// Free the capacity held by the oldest in-flight command
    pub fn ack(&mut self) {
        match self {
            Self::Unbounded => {}
            Self::SendResponse(sp) => {
                sp.ack();
            }
            Self::CharCounting(sp) => {
                sp.ack();
            }
        }
    }

    /// Reset transient accounting, keeping kind and capacity
    pub fn clear(&mut self) {
        match self {
            Self::Unbounded => {}
            Self::SendResponse(sp) => sp.clear(),
            Self::CharCounting(sp) => sp.clear(),
        }
    }

    /// Change the buffer capacity. Returns the effective capacity, or `None`
    /// when the protocol has no buffer.
    pub fn set_buffer_size(&mut self, buffer_size: usize) -> Option<usize> {
        match self {
            Self::CharCounting(sp) => Some(sp.set_buffer_size(buffer_size)),
            _ => None,
        }
    }

    /// Character-counting state, if that is the active protocol
    pub fn as_char_counting(&self) -> Option<&CharCounting> {
        match self {
            Self::CharCounting(sp) => Some(sp),
            _ => None,
        }
    }

    /// Mutable character-counting state, if that is the active protocol
    pub fn as_char_counting_mut(&mut self) -> Option<&mut CharCounting> {
        match self {
            Self::CharCounting(sp) => Some(sp),
            _ => None,
        }
    }

    pub(crate) fn take_pending(&mut self) -> Option<String> {
        self.as_char_counting_mut().and_then(CharCounting::take_pending)
    }

    pub(crate) fn defer(&mut self, line: String) {
        if let Self::CharCounting(sp) = self {
            sp.defer(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_response_single_in_flight() {
        let mut sp = SendResponse::new();
        assert!(sp.try_admit());
        assert!(sp.is_awaiting_response());
        assert!(!sp.try_admit());

        assert!(sp.ack());
        assert!(!sp.ack());
        assert!(sp.try_admit());
    }

    #[test]
    fn test_char_counting_buffer_size_validation() {
        let mut sp = CharCounting::new(256);

        assert_eq!(sp.set_buffer_size(0), 256);
        assert_eq!(sp.set_buffer_size(128), 128);

        // 119 bytes + terminator in flight
        assert!(sp.try_admit(&"X".repeat(119)));
        assert_eq!(sp.data_length(), 120);

        assert_eq!(sp.set_buffer_size(100), 120);
        assert_eq!(sp.buffer_size(), 120);

        sp.clear();
        assert_eq!(sp.set_buffer_size(256), 256);
        assert_eq!(sp.data_length(), 0);
        assert!(sp.queue().is_empty());
        assert_eq!(sp.line(), "");
    }

    #[test]
    fn test_char_counting_zero_uses_default() {
        assert_eq!(CharCounting::new(0).buffer_size(), DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_char_counting_admission_boundary() {
        let mut sp = CharCounting::new(20);

        // 8 + 1 = 9
        assert!(sp.try_admit("G0 X0 Y0"));
        // 10 + 1 = 11, total exactly 20
        assert!(sp.try_admit("G1 X10 Y10"));
        assert_eq!(sp.data_length(), 20);
        assert_eq!(sp.available(), 0);
        assert_eq!(sp.usage_percent(), 100);

        assert!(!sp.try_admit("M5"));
        assert_eq!(sp.queue().iter().copied().collect::<Vec<_>>(), vec![9, 11]);

        assert_eq!(sp.ack(), Some(9));
        assert!(sp.try_admit("M5"));
        assert_eq!(sp.data_length(), 14);
    }

    #[test]
    fn test_char_counting_ack_on_empty_queue() {
        let mut sp = CharCounting::new(64);
        assert_eq!(sp.ack(), None);
        assert_eq!(sp.data_length(), 0);
    }

    #[test]
    fn test_deferred_line() {
        let mut sp = CharCounting::new(8);
        assert!(sp.try_admit("G0 X1"));
        assert!(!sp.try_admit("G0 X2"));
        sp.defer("G0 X2".to_string());
        assert_eq!(sp.line(), "G0 X2");

        assert_eq!(sp.take_pending().as_deref(), Some("G0 X2"));
        assert_eq!(sp.take_pending(), None);
    }

    #[test]
    fn test_can_ever_fit() {
        let sp = CharCounting::new(4);
        assert!(sp.can_ever_fit("M30"));
        assert!(!sp.can_ever_fit("G0 X1"));
    }

    #[test]
    fn test_protocol_dispatch() {
        let options = SenderOptions::default().with_buffer_size(32);

        let mut unbounded = StreamingProtocol::new(None, &options);
        assert_eq!(unbounded.kind(), None);
        assert!(unbounded.try_admit("G0"));
        assert!(unbounded.try_admit("G0"));
        assert_eq!(unbounded.set_buffer_size(10), None);

        let cc = StreamingProtocol::new(Some(ProtocolKind::CharCounting), &options);
        assert_eq!(cc.kind(), Some(ProtocolKind::CharCounting));
        assert!(cc.is_pipelined());
        assert_eq!(cc.as_char_counting().map(CharCounting::buffer_size), Some(32));

        let sr = StreamingProtocol::new(Some(ProtocolKind::SendResponse), &options);
        assert!(!sr.is_pipelined());
        assert!(sr.as_char_counting().is_none());
    }
}
