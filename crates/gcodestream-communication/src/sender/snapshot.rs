//! Serializable view of a sender.

use super::state::ProgramContext;
use gcodestream_core::ProtocolKind;
use serde::{Deserialize, Serialize};

/// Point-in-time copy of a sender's progress
///
/// This is the stable display/wire format; it never carries protocol buffer
/// internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderSnapshot {
    /// Active streaming protocol, `null` when unbounded
    pub protocol_kind: Option<ProtocolKind>,
    /// Program name
    pub name: String,
    /// Caller metadata
    pub context: ProgramContext,
    /// Length of the program text in bytes
    pub size: usize,
    /// Number of command lines
    pub total: usize,
    /// Lines sent
    pub sent: usize,
    /// Lines acknowledged
    pub received: usize,
    /// Start timestamp (ms since epoch, 0 if unset)
    pub start_time: i64,
    /// Finish timestamp (ms since epoch, 0 if unset)
    pub finish_time: i64,
    /// Milliseconds spent streaming
    pub elapsed_time: i64,
    /// Estimated milliseconds left
    pub remaining_time: i64,
}
