//! # Event Bus
//!
//! A type-safe, asynchronous event bus connecting decoupled vertical slices.
//!
//! ## Overview
//!
//! Provides a centralized [`EventBus`] with two channel kinds built on `tokio`
//! primitives: **broadcast** (fan-out, every subscriber sees every event) and
//! **watch** (latest-value, late subscribers see the current snapshot). Events
//! are identified by their Rust type; channels are created lazily on the first
//! subscribe or publish.
//!
//! Booking changes travel over broadcast channels; capacity snapshots use
//! watch semantics so a freshly connected feed gets the current picture
//! without replaying history.
//!
//! # Example
//!
//! ```rust
//! use bloom_event_bus::{EventBus, EventBusError, EventReceiverExt};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct AppointmentBooked { id: u64 }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!
//!     let mut rx = bus.subscribe::<AppointmentBooked>()?;
//!     bus.publish(AppointmentBooked { id: 42 })?;
//!
//!     if let Ok(event) = rx.recv().await {
//!         assert_eq!(event.id, 42);
//!     }
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{ChannelKind, Event, EventBus};
pub use error::{EventBusError, EventBusErrorExt};
pub use receiver::EventReceiverExt;
