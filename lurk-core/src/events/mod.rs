//! Event system for the race.
//!
//! This module provides the closed event model and the bus that routes
//! events between the components that own race state.
//!
//! # Event Flow
//!
//! 1. A chat bridge publishes `AttemptEvent`s -> `RacerRegistry`
//! 2. `RacerRegistry` resolves the name and drives the `Racer`, which
//!    publishes `SocketEvent`s and `ChatMessage`s
//! 3. `SocketEvent::PointsSet` and `SocketEvent::ItemDropped` -> `Field`
//! 4. `Field` applies penalties through the `Racer` again, which re-enters
//!    the bus before the original publish returns
//!
//! Events are immutable values. They carry racer names rather than racer
//! handles, and consumers resolve names through the registry.

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventHandler};
pub use types::{
    AttemptEvent, ChatMessage, Event, EventFamily, EventFilter, EventKind, SocketEvent,
};
