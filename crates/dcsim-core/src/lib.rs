//! Compact discrete-event simulation engine.
//!
//! Components are registered by name, receive [`Event`]s through the
//! [`EventHandler`] trait and produce new events via their [`SimulationContext`].
//! The [`Simulation`] owns the event queue and drives time forward.

#![warn(missing_docs)]

pub mod component;
pub mod context;
pub mod event;
pub mod handler;
pub mod log;
pub mod simulation;
mod state;

pub use colored;
pub use component::Id;
pub use context::SimulationContext;
pub use event::{Event, EventData, EventId};
pub use handler::EventHandler;
pub use simulation::Simulation;
pub use state::EPSILON;
