//! Simulation component identifiers.

/// Unique identifier of a simulation component.
///
/// Identifiers are assigned sequentially when components are registered in the simulation.
pub type Id = u32;
