//! Setup-time errors.
//!
//! Runtime anomalies (late packet deliveries, stalled receive tasks) are
//! surfaced as observable cloudlet and packet status instead, since the
//! simulation must keep advancing for all other entities.

use thiserror::Error;

use crate::topology::HostId;

/// Errors returned while building the topology or connecting hosts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// The requested switch counts and port capacities do not form a valid tree.
    #[error("invalid topology config: {reason}")]
    InvalidConfig {
        /// Human-readable reason.
        reason: String,
    },
    /// The target edge switch already has all its host ports occupied.
    #[error("edge switch {switch} is full ({ports} ports)")]
    EdgeSwitchFull {
        /// Index of the full edge switch.
        switch: usize,
        /// Port capacity of the switch.
        ports: usize,
    },
    /// The host is already attached to its edge switch.
    #[error("host {host} is already connected")]
    HostAlreadyConnected {
        /// The rejected host.
        host: HostId,
    },
    /// The host id maps to an edge switch outside the topology.
    #[error("host {host} exceeds the topology capacity of {capacity} hosts")]
    HostOutOfRange {
        /// The rejected host.
        host: HostId,
        /// Maximum number of hosts supported by the topology.
        capacity: usize,
    },
}

impl TopologyError {
    pub(crate) fn invalid_config<S: Into<String>>(reason: S) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
