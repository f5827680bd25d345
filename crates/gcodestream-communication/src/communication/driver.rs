//! Stream driver
//!
//! Connects a [`Sender`] to a [`Transport`]: admitted lines are written to the
//! link, and controller replies are turned into acknowledgments. Every call
//! into the sender goes through the driver, so a single task owns the sender
//! and no locking is needed around it.
//!
//! Lines waiting in the driver's outbox are already counted as sent. The
//! outbox is emptied whenever a write fails and whenever the program is
//! reloaded, unloaded or rewound, so the link never carries more than the
//! sender has accounted for.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use gcodestream_core::{Error, EventFilter, Result, SenderEvent, SenderEventKind, SubscriptionId};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::response::ControllerResponse;
use super::transport::Transport;
use crate::sender::{framed_len, ProgramContext, Sender, SenderSnapshot, SenderStatus};

/// Default polling interval for [`StreamDriver::run`]
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Drives a sender against a transport
pub struct StreamDriver<T: Transport> {
    sender: Sender,
    transport: T,
    outbox: Arc<Mutex<VecDeque<String>>>,
    subscription: SubscriptionId,
}

impl<T: Transport> StreamDriver<T> {
    /// Wrap a sender and the transport its lines go to
    pub fn new(sender: Sender, transport: T) -> Self {
        let outbox = Arc::new(Mutex::new(VecDeque::new()));
        let queue = outbox.clone();
        let subscription = sender.on(
            EventFilter::Kinds(vec![SenderEventKind::Data, SenderEventKind::Rewind]),
            move |event| match event {
                SenderEvent::Data(line) => queue.lock().push_back(line),
                SenderEvent::Rewind => queue.lock().clear(),
                _ => {}
            },
        );

        Self {
            sender,
            transport,
            outbox,
            subscription,
        }
    }

    /// The driven sender
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Mutable access to the driven sender (hold, line filter, buffer size, ...)
    ///
    /// Use [`StreamDriver::load`] and [`StreamDriver::unload`] to change the
    /// program so queued lines of the previous one are discarded.
    pub fn sender_mut(&mut self) -> &mut Sender {
        &mut self.sender
    }

    /// The transport lines are written to
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether the loaded program has been fully acknowledged
    pub fn is_complete(&self) -> bool {
        self.sender.status() == SenderStatus::Complete
    }

    /// Lines admitted but not yet written
    pub fn queued(&self) -> usize {
        self.outbox.lock().len()
    }

    /// Load a program, discarding anything still queued for the link
    pub fn load(&mut self, name: &str, content: &str, context: ProgramContext) -> bool {
        if !self.sender.load(name, content, context) {
            return false;
        }
        self.outbox.lock().clear();
        true
    }

    /// Unload the program, discarding anything still queued for the link
    pub fn unload(&mut self) {
        self.sender.unload();
        self.outbox.lock().clear();
    }

    /// Rewind the program, discarding anything still queued for the link
    pub fn rewind(&mut self) -> bool {
        self.sender.rewind()
    }

    /// Admit what the protocol allows and write it out
    ///
    /// Nothing is admitted while the transport reports it is disconnected. A
    /// write failure is returned as is and drops the lines still queued; they
    /// already count as sent, so the caller should rewind or unload before
    /// continuing.
    pub fn tick(&mut self) -> Result<usize> {
        if !self.transport.is_connected() {
            return Err(Error::transport("Transport is not connected"));
        }

        let admitted = self.sender.next();
        self.flush()?;
        Ok(admitted)
    }

    /// Feed one line received from the controller
    pub fn handle_response(&mut self, line: &str) -> Result<Option<ControllerResponse>> {
        let Some(response) = ControllerResponse::parse(line) else {
            return Ok(None);
        };

        if response.is_acknowledgment() {
            if response.is_error() {
                tracing::warn!(
                    "Controller rejected line {}: {}",
                    self.sender.state().received + 1,
                    response
                );
            }
            self.sender.ack();
            self.tick()?;
        } else if response.is_alarm() {
            tracing::warn!("Controller alarm: {}", response);
            self.sender.hold(Some(response.to_string()));
        }

        Ok(Some(response))
    }

    /// Stream the loaded program to completion
    ///
    /// Ticks every `interval` and consumes controller replies from
    /// `responses`, serialising both on the calling task. Returns the final
    /// snapshot once every line is acknowledged, or
    /// [`Error::LineTooLong`] as soon as a line turns out to be larger than
    /// the whole controller buffer.
    pub async fn run(
        &mut self,
        responses: &mut mpsc::Receiver<String>,
        interval: Duration,
    ) -> Result<SenderSnapshot> {
        if !self.sender.state().is_loaded() {
            return Err(Error::other("No program loaded"));
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.is_complete() {
                return Ok(self.sender.snapshot());
            }
            self.check_stalled()?;

            tokio::select! {
                _ = ticker.tick() => {
                    self.tick()?;
                }
                response = responses.recv() => match response {
                    Some(line) => {
                        self.handle_response(&line)?;
                    }
                    None => {
                        return Err(Error::transport("Response channel closed"));
                    }
                }
            }
        }
    }

    fn check_stalled(&self) -> Result<()> {
        let Some(line) = self.sender.stalled_line() else {
            return Ok(());
        };

        Err(Error::LineTooLong {
            line: self.sender.state().sent + 1,
            length: framed_len(line),
            buffer_size: self
                .sender
                .protocol()
                .as_char_counting()
                .map(|sp| sp.buffer_size())
                .unwrap_or_default(),
        })
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            let next = self.outbox.lock().pop_front();
            let Some(line) = next else {
                return Ok(());
            };

            if let Err(e) = self.transport.write_line(&line) {
                let mut outbox = self.outbox.lock();
                if !outbox.is_empty() {
                    tracing::warn!("Discarding {} queued line(s) after write failure", outbox.len());
                }
                outbox.clear();
                return Err(e);
            }
        }
    }
}

impl<T: Transport> Drop for StreamDriver<T> {
    fn drop(&mut self) {
        self.sender.events().unsubscribe(self.subscription);
    }
}
