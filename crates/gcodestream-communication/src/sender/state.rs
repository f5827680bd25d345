//! Program state owned by a sender.

use super::lines::split_lines;

/// Caller-supplied metadata carried alongside a program (e.g. its bounding box)
pub type ProgramContext = serde_json::Map<String, serde_json::Value>;

/// The loaded program and its streaming progress
///
/// Replaced wholesale on load and unload. Invariants:
/// `total == lines.len()` and `received <= sent <= total`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramState {
    /// Program name, empty when nothing is loaded
    pub name: String,
    /// Opaque caller metadata
    pub context: ProgramContext,
    /// Original program text
    pub gcode: String,
    /// Non-blank trimmed command lines
    pub lines: Vec<String>,
    /// Number of command lines
    pub total: usize,
    /// Lines handed to the transport
    pub sent: usize,
    /// Lines acknowledged by the controller
    pub received: usize,
    /// Whether admission is paused
    pub hold: bool,
    /// Why admission was paused
    pub hold_reason: Option<String>,
    /// Milliseconds since the epoch when the first line was admitted, 0 if unset
    pub start_time: i64,
    /// Milliseconds since the epoch when the last ack arrived, 0 if unset
    pub finish_time: i64,
    /// Milliseconds spent streaming
    pub elapsed_time: i64,
    /// Estimated milliseconds until completion
    pub remaining_time: i64,
    /// Lines were (re)established and observers have not caught up yet
    pub changed: bool,
}

impl ProgramState {
    /// State for a freshly loaded program
    pub fn loaded(name: &str, gcode: &str, context: ProgramContext) -> Self {
        let lines = split_lines(gcode);
        Self {
            name: name.to_string(),
            context,
            gcode: gcode.to_string(),
            total: lines.len(),
            lines,
            changed: true,
            ..Self::default()
        }
    }

    /// State after unloading
    pub fn unloaded() -> Self {
        Self {
            changed: true,
            ..Self::default()
        }
    }

    /// Whether a program is loaded
    pub fn is_loaded(&self) -> bool {
        self.total > 0
    }

    /// Commands sent but not yet acknowledged
    pub fn outstanding(&self) -> usize {
        self.sent - self.received
    }

    /// Every line sent and acknowledged
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.sent == self.total && self.received == self.total
    }

    /// Elapsed and estimated remaining time at `now`
    ///
    /// Remaining time is a linear extrapolation of the per-line rate so far;
    /// it is 0 before the first line and after the last.
    pub fn timing_at(&self, now: i64) -> (i64, i64) {
        if self.start_time <= 0 {
            return (0, 0);
        }

        let end = if self.finish_time > 0 {
            self.finish_time
        } else {
            now
        };
        let elapsed = (end - self.start_time).max(0);

        let remaining = if self.sent > 0 {
            let left = (self.total - self.sent) as i64;
            elapsed * left / self.sent as i64
        } else {
            0
        };

        (elapsed, remaining)
    }

    /// Refresh the stored elapsed/remaining fields
    pub(crate) fn update_timing(&mut self, now: i64) {
        let (elapsed, remaining) = self.timing_at(now);
        self.elapsed_time = elapsed;
        self.remaining_time = remaining;
    }
}
