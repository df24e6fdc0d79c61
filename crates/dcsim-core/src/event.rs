//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Unique identifier of an event, assigned in order of event creation.
pub type EventId = u64;

/// Trait for event payloads.
///
/// Payloads must be serializable (for logging) and downcastable to concrete
/// types (for dispatch via the [`cast!`](crate::cast!) macro). Any serializable
/// type gets this automatically.
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// An event scheduled for execution at time `time`.
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Time of event delivery.
    pub time: f64,
    /// Identifier of the component which created the event.
    pub src: Id,
    /// Identifier of the component the event is delivered to.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted ordering for use in a max-heap: the earliest event is the greatest.
// Ties are broken by event id to make execution deterministic.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
