//! # GCodeStream Core
//!
//! Core types shared by the GCodeStream crates: error types, sender
//! configuration, the clock abstraction used for program timing, and the
//! event bus that carries start/data/end notifications.

pub mod clock;
pub mod config;
pub mod error;
pub mod event_bus;

pub use clock::{Clock, ManualClock, SystemClock, MANUAL_CLOCK_EPOCH};

pub use config::{
    ProtocolKind, SenderConfig, SenderOptions, DEFAULT_BUFFER_SIZE, DEFAULT_EVENT_CAPACITY,
};

pub use error::{ConfigError, Error, Result};

pub use event_bus::{
    EventBus, EventBusConfig, EventFilter, SenderEvent, SenderEventKind, SubscriptionId,
};
