//! # Event Bus Module
//!
//! Carries the events a sender publishes while streaming a program.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gcodestream_core::event_bus::{EventBus, EventFilter, SenderEvent, SenderEventKind};
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(
//!     EventFilter::Kinds(vec![SenderEventKind::Data]),
//!     |event| {
//!         if let SenderEvent::Data(line) = event {
//!             tracing::info!("outgoing: {}", line);
//!         }
//!     },
//! );
//!
//! bus.publish(SenderEvent::Data("G0 X0 Y0".to_string()));
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
