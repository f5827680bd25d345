//! Transport boundary and stream driving.

pub mod driver;
pub mod response;
pub mod transport;

pub use driver::{StreamDriver, DEFAULT_TICK_INTERVAL};
pub use response::ControllerResponse;
pub use transport::{NoOpTransport, Transport, WriterTransport, LINE_TERMINATOR};
