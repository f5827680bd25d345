//! Program sender
//!
//! Streams a loaded program to a controller one admission at a time. The
//! sender never touches the link itself: admitted lines are published as
//! [`SenderEvent::Data`] and the transport reports replies back through
//! [`Sender::ack`].
//!
//! # State Machine
//!
//! ```text
//! ┌───────┐  load   ┌────────┐  next   ┌────────┐  last ack  ┌──────────┐
//! │ Empty │────────>│ Loaded │────────>│ Active │───────────>│ Complete │
//! └───────┘         └────────┘         └────────┘            └──────────┘
//!     ^                                                            │
//!     └──────────────────────── unload (from any state) ───────────┘
//! ```

use std::sync::Arc;

use gcodestream_core::{
    Clock, EventBus, EventBusConfig, EventFilter, ProtocolKind, SenderConfig, SenderEvent,
    SenderOptions, SubscriptionId, SystemClock,
};
use tokio::sync::broadcast;

use super::protocol::{framed_len, StreamingProtocol};
use super::snapshot::SenderSnapshot;
use super::state::{ProgramContext, ProgramState};

/// Rewrites a line right before admission. An empty result skips the line.
pub type LineFilter = Box<dyn Fn(&str, &ProgramContext) -> String + Send + Sync>;

/// Where a sender is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderStatus {
    /// No program loaded
    Empty,
    /// Program loaded, nothing sent
    Loaded,
    /// Lines sent, not all acknowledged
    Active,
    /// Every line sent and acknowledged
    Complete,
}

impl std::fmt::Display for SenderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Loaded => write!(f, "Loaded"),
            Self::Active => write!(f, "Active"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

/// Streams a program under a flow-control protocol
pub struct Sender {
    protocol: StreamingProtocol,
    state: ProgramState,
    events: EventBus,
    clock: Arc<dyn Clock>,
    line_filter: Option<LineFilter>,
    started: bool,
    oversize_warned: bool,
}

impl Sender {
    /// Create a sender for `protocol_kind` (`None` admits every line)
    pub fn new(protocol_kind: Option<ProtocolKind>, options: SenderOptions) -> Self {
        let events = EventBus::with_config(EventBusConfig {
            channel_capacity: options.event_capacity,
            max_history_size: options.event_history,
        });

        Self {
            protocol: StreamingProtocol::new(protocol_kind, &options),
            state: ProgramState::default(),
            events,
            clock: Arc::new(SystemClock),
            line_filter: None,
            started: false,
            oversize_warned: false,
        }
    }

    /// Create a sender from a configuration
    pub fn from_config(config: &SenderConfig) -> Self {
        Self::new(config.protocol_kind, config.options.clone())
    }

    /// Use `clock` for start/finish timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Rewrite every line right before it is admitted
    pub fn with_line_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, &ProgramContext) -> String + Send + Sync + 'static,
    {
        self.line_filter = Some(Box::new(filter));
        self
    }

    /// Active streaming protocol
    pub fn protocol(&self) -> &StreamingProtocol {
        &self.protocol
    }

    /// Active protocol kind
    pub fn protocol_kind(&self) -> Option<ProtocolKind> {
        self.protocol.kind()
    }

    /// Change the controller buffer capacity (character counting only)
    pub fn set_buffer_size(&mut self, buffer_size: usize) -> Option<usize> {
        self.protocol.set_buffer_size(buffer_size)
    }

    /// Loaded program and counters
    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    /// Event bus this sender publishes on
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register a synchronous event handler
    pub fn on<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(SenderEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(filter, handler)
    }

    /// Receiver for polling events asynchronously
    pub fn subscribe(&self) -> broadcast::Receiver<SenderEvent> {
        self.events.receiver()
    }

    /// Current lifecycle status
    pub fn status(&self) -> SenderStatus {
        if !self.state.is_loaded() {
            SenderStatus::Empty
        } else if self.state.is_complete() {
            SenderStatus::Complete
        } else if self.state.sent == 0 {
            SenderStatus::Loaded
        } else {
            SenderStatus::Active
        }
    }

    /// Load a program, replacing whatever was loaded
    ///
    /// Returns false, leaving the sender untouched, when the name is blank or
    /// the content holds no command line.
    pub fn load(&mut self, name: &str, content: &str, context: ProgramContext) -> bool {
        if name.trim().is_empty() {
            tracing::warn!("Refusing to load a program without a name");
            return false;
        }

        let state = ProgramState::loaded(name, content, context);
        if state.total == 0 {
            tracing::warn!("Refusing to load {}: no command lines", name);
            return false;
        }

        tracing::info!(
            "Loaded {} ({} bytes, {} lines)",
            name,
            state.gcode.len(),
            state.total
        );

        self.protocol.clear();
        self.state = state;
        self.started = false;
        self.oversize_warned = false;
        true
    }

    /// Drop the loaded program and any in-flight accounting
    pub fn unload(&mut self) {
        if self.state.is_loaded() {
            tracing::info!("Unloaded {}", self.state.name);
        }

        self.protocol.clear();
        self.state = ProgramState::unloaded();
        self.started = false;
        self.oversize_warned = false;
    }

    /// Pause admission. Returns false if nothing is loaded or already held.
    pub fn hold(&mut self, reason: Option<String>) -> bool {
        if !self.state.is_loaded() || self.state.hold {
            return false;
        }

        tracing::info!(
            "Holding {} at line {}/{}",
            self.state.name,
            self.state.sent,
            self.state.total
        );
        self.state.hold = true;
        self.state.hold_reason = reason.clone();
        self.events.publish(SenderEvent::Hold { reason });
        true
    }

    /// Resume admission. Returns false if not held.
    pub fn unhold(&mut self) -> bool {
        if !self.state.hold {
            return false;
        }

        tracing::info!("Resuming {}", self.state.name);
        self.state.hold = false;
        self.state.hold_reason = None;
        self.events.publish(SenderEvent::Unhold);
        true
    }

    /// Return the loaded program to its first line
    pub fn rewind(&mut self) -> bool {
        if !self.state.is_loaded() {
            return false;
        }

        self.protocol.clear();
        self.state.sent = 0;
        self.state.received = 0;
        self.state.hold = false;
        self.state.hold_reason = None;
        self.state.start_time = 0;
        self.state.finish_time = 0;
        self.state.elapsed_time = 0;
        self.state.remaining_time = 0;
        self.started = false;
        self.oversize_warned = false;

        tracing::info!("Rewound {}", self.state.name);
        self.events.publish(SenderEvent::Rewind);
        true
    }

    /// Admit as many lines as the protocol allows right now
    ///
    /// Unbounded and send-response protocols admit at most one line per call;
    /// character counting fills the controller buffer. Returns the number of
    /// lines published as data.
    pub fn next(&mut self) -> usize {
        if self.state.hold || self.state.sent >= self.state.total {
            return 0;
        }

        if !self.started {
            self.started = true;
            self.state.start_time = self.clock.now_millis();
            tracing::info!("Started {}", self.state.name);
            self.events.publish(SenderEvent::Start);
        }

        let mut admitted = 0;
        while self.state.sent < self.state.total {
            let line = match self.protocol.take_pending() {
                Some(line) => line,
                None => self.prepare_line(self.state.sent),
            };

            if line.is_empty() {
                // Nothing goes on the wire, so it is acknowledged on the spot
                self.state.sent += 1;
                self.state.received += 1;
                self.finish_if_complete();
                continue;
            }

            if !self.protocol.try_admit(&line) {
                if !self.oversize_warned {
                    if let Some(sp) = self.protocol.as_char_counting() {
                        if !sp.can_ever_fit(&line) {
                            tracing::warn!(
                                "Line {} ({} bytes) can never fit the {} byte buffer",
                                self.state.sent + 1,
                                framed_len(&line),
                                sp.buffer_size()
                            );
                            self.oversize_warned = true;
                        }
                    }
                }
                self.protocol.defer(line);
                break;
            }

            self.oversize_warned = false;
            self.state.sent += 1;
            admitted += 1;
            tracing::debug!(
                "Sent line {}/{}: {}",
                self.state.sent,
                self.state.total,
                line
            );
            self.events.publish(SenderEvent::Data(line));

            if !self.protocol.is_pipelined() {
                break;
            }
        }

        self.state.update_timing(self.clock.now_millis());
        admitted
    }

    /// Next line that would be sent, without sending it
    pub fn peek(&self) -> Option<&str> {
        if let Some(line) = self
            .protocol
            .as_char_counting()
            .map(|sp| sp.line())
            .filter(|line| !line.is_empty())
        {
            return Some(line);
        }

        self.state.lines.get(self.state.sent).map(String::as_str)
    }

    /// Line held back because it exceeds the whole controller buffer
    ///
    /// Such a line is never admitted; streaming cannot continue until the
    /// buffer size is raised or the program is rewound or unloaded.
    pub fn stalled_line(&self) -> Option<&str> {
        let sp = self.protocol.as_char_counting()?;
        let line = sp.line();
        (!line.is_empty() && !sp.can_ever_fit(line)).then_some(line)
    }

    /// Record one acknowledgment from the controller
    ///
    /// Returns false, changing nothing, when no command is outstanding.
    pub fn ack(&mut self) -> bool {
        if self.state.outstanding() == 0 {
            tracing::debug!("Ignoring acknowledgment with nothing outstanding");
            return false;
        }

        self.protocol.ack();
        self.state.received += 1;
        self.finish_if_complete();
        self.state.update_timing(self.clock.now_millis());
        true
    }

    /// Consume the `changed` flag
    pub fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.state.changed, false)
    }

    /// Serializable copy of the current progress
    pub fn snapshot(&self) -> SenderSnapshot {
        let (elapsed_time, remaining_time) = self.state.timing_at(self.clock.now_millis());

        SenderSnapshot {
            protocol_kind: self.protocol.kind(),
            name: self.state.name.clone(),
            context: self.state.context.clone(),
            size: self.state.gcode.len(),
            total: self.state.total,
            sent: self.state.sent,
            received: self.state.received,
            start_time: self.state.start_time,
            finish_time: self.state.finish_time,
            elapsed_time,
            remaining_time,
        }
    }

    /// Snapshot as a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }

    fn prepare_line(&self, index: usize) -> String {
        let line = &self.state.lines[index];
        match &self.line_filter {
            Some(filter) => filter(line, &self.state.context).trim().to_string(),
            None => line.clone(),
        }
    }

    fn finish_if_complete(&mut self) {
        if !self.state.is_complete() {
            return;
        }

        self.state.finish_time = self.clock.now_millis();
        self.state.update_timing(self.state.finish_time);
        tracing::info!(
            "Finished {} in {}ms",
            self.state.name,
            self.state.elapsed_time
        );
        self.events.publish(SenderEvent::End);
    }
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("protocol", &self.protocol)
            .field("status", &self.status())
            .field("sent", &self.state.sent)
            .field("received", &self.state.received)
            .field("total", &self.state.total)
            .finish()
    }
}
