//! # GCodeStream
//!
//! Streams machine-control programs (G-code) to GRBL-class CNC controllers
//! without overrunning the controller's serial input buffer.
//!
//! ## Architecture
//!
//! GCodeStream is organized as a workspace with multiple crates:
//!
//! 1. **gcodestream-core** - Errors, configuration, clock, sender events
//! 2. **gcodestream-communication** - Sender, streaming protocols, transport boundary
//! 3. **gcodestream** - Re-exports and application glue (logging, file loading)
//!
//! ## Features
//!
//! - **Send-Response**: one command in flight, the next waits for its reply
//! - **Character Counting**: pipelines commands while their byte total fits
//!   the controller's receive buffer
//! - **Events**: start, data, end, hold, unhold and rewind notifications
//! - **Progress**: serializable snapshots with elapsed and remaining time

use std::path::Path;

use anyhow::Context;

pub use gcodestream_communication::{communication, sender};

pub use gcodestream_core::{
    Clock, ConfigError, Error, EventBus, EventBusConfig, EventFilter, ManualClock, ProtocolKind,
    Result, SenderConfig, SenderEvent, SenderEventKind, SenderOptions, SubscriptionId,
    SystemClock, DEFAULT_BUFFER_SIZE, DEFAULT_EVENT_CAPACITY, MANUAL_CLOCK_EPOCH,
};

pub use gcodestream_communication::{
    framed_len, split_lines, CharCounting, ControllerResponse, LineFilter, NoOpTransport,
    ProgramContext, ProgramState, SendResponse, Sender, SenderSnapshot, SenderStatus,
    StreamDriver, StreamingProtocol, Transport, WriterTransport, DEFAULT_TICK_INTERVAL,
    LINE_TERMINATOR, LINE_TERMINATOR_LEN,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(())
}

/// Build a sender from a JSON or TOML configuration file
pub fn sender_from_config_file(path: impl AsRef<Path>) -> anyhow::Result<Sender> {
    let path = path.as_ref();
    let config = SenderConfig::from_file(path)
        .with_context(|| format!("Failed to load sender configuration {}", path.display()))?;

    tracing::info!(
        "Sender configured from {} ({})",
        path.display(),
        config
            .protocol_kind
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "no flow control".to_string())
    );

    Ok(Sender::from_config(&config))
}

/// Read a program file and load it into `sender`
///
/// The program is named after the file name; the full path is recorded in
/// the program context under `path`.
pub fn load_program_file(sender: &mut Sender, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program {}", path.display()))?;

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut context = ProgramContext::new();
    context.insert(
        "path".to_string(),
        serde_json::Value::String(path.display().to_string()),
    );

    if !sender.load(&name, &content, context) {
        anyhow::bail!("{} contains no command lines", path.display());
    }

    Ok(())
}
