//! Transport boundary
//!
//! The physical link (serial port, TCP socket, ...) lives outside this crate.
//! A transport only has to write one command line at a time; replies come
//! back to the sender through [`StreamDriver::handle_response`].
//!
//! [`StreamDriver::handle_response`]: super::driver::StreamDriver::handle_response

use gcodestream_core::{Error, Result};
use std::io::Write;

/// Line terminator written after every command
pub const LINE_TERMINATOR: &str = "\n";

/// Writes admitted command lines to the controller link
pub trait Transport: Send {
    /// Write `line` followed by the line terminator
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Whether the link is usable. The stream driver admits nothing while
    /// this is false.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Transport that discards everything written to it. Always connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTransport;

impl Transport for NoOpTransport {
    fn write_line(&mut self, _line: &str) -> Result<()> {
        Ok(())
    }
}

/// Transport over any byte sink (an opened serial port, a `TcpStream`, ...)
#[derive(Debug)]
pub struct WriterTransport<W: Write + Send> {
    writer: W,
    bytes_written: u64,
}

impl<W: Write + Send> WriterTransport<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes_written: 0,
        }
    }

    /// Total bytes written, terminators included
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Get a reference to the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwrap the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Transport for WriterTransport<W> {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let write = |writer: &mut W| -> std::io::Result<()> {
            writer.write_all(line.as_bytes())?;
            writer.write_all(LINE_TERMINATOR.as_bytes())?;
            writer.flush()
        };

        write(&mut self.writer).map_err(|e| {
            tracing::error!("Failed to write '{}': {}", line, e);
            Error::transport(e.to_string())
        })?;

        self.bytes_written += (line.len() + LINE_TERMINATOR.len()) as u64;
        Ok(())
    }
}
