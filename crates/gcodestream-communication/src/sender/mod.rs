//! Program streaming engine
//!
//! This module provides:
//! - Line splitting of raw program text
//! - Streaming protocols (send-response, character counting)
//! - Program state and progress timing
//! - The `Sender` state machine and its serializable snapshot

pub mod lines;
pub mod protocol;
pub mod sender;
pub mod snapshot;
pub mod state;

pub use lines::split_lines;
pub use protocol::{framed_len, CharCounting, SendResponse, StreamingProtocol, LINE_TERMINATOR_LEN};
pub use sender::{LineFilter, Sender, SenderStatus};
pub use snapshot::SenderSnapshot;
pub use state::{ProgramContext, ProgramState};
