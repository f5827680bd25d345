//! # GCodeStream Communication
//!
//! Streams machine-control programs to motion-controller firmware without
//! overrunning its input buffer. Includes the `Sender` state machine, the
//! send-response and character-counting streaming protocols, and the driver
//! that ties a sender to a transport.

pub mod communication;
pub mod sender;

pub use communication::{
    ControllerResponse, NoOpTransport, StreamDriver, Transport, WriterTransport,
    DEFAULT_TICK_INTERVAL, LINE_TERMINATOR,
};

pub use sender::{
    framed_len, split_lines, CharCounting, LineFilter, ProgramContext, ProgramState,
    SendResponse, Sender, SenderSnapshot, SenderStatus, StreamingProtocol, LINE_TERMINATOR_LEN,
};
