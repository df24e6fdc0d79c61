//! Tasks composing a network cloudlet.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::cloudlet::{CloudletId, VmId};
use crate::packet::Packet;

/// Observable state of a task within its cloudlet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TaskState {
    /// The task is not yet current.
    Pending,
    /// The task is current and consuming CPU (execution) or about to fire (send).
    Running,
    /// The task is current and waiting for packets (receive).
    Waiting,
    /// The task has completed.
    Done,
}

/// Description of a packet emitted by a send task.
#[derive(Clone, Debug, Serialize)]
pub struct PacketSpec {
    /// Destination cloudlet.
    pub dst_cloudlet: CloudletId,
    /// Payload size in bytes.
    pub size: u64,
}

/// A unit of work inside a network cloudlet.
///
/// Tasks complete strictly in list order; exactly one task per cloudlet is
/// current at a time. Kind-specific progress is dispatched through
/// [`CloudletTask::advance`] and [`CloudletTask::deliver`].
#[derive(Debug)]
pub enum CloudletTask {
    /// Consumes CPU until `length` instructions worth of work is done.
    Execution {
        /// Total length in instructions.
        length: f64,
        /// Instructions left to execute.
        remaining: f64,
        /// Memory required by the task.
        memory: u64,
    },
    /// Emits one packet per spec and completes immediately.
    Send {
        /// Packets to emit on activation.
        packets: Vec<PacketSpec>,
        /// Memory required by the task.
        memory: u64,
    },
    /// Waits until `expected` packets from `src_vm` have been delivered.
    Receive {
        /// VM the packets are expected from.
        src_vm: VmId,
        /// Number of packets to wait for.
        expected: usize,
        /// Packets delivered so far.
        received: Vec<Packet>,
        /// Memory required by the task.
        memory: u64,
    },
}

impl CloudletTask {
    /// Creates an execution task of the given length in instructions.
    pub fn execution(length: f64, memory: u64) -> Self {
        Self::Execution {
            length,
            remaining: length,
            memory,
        }
    }

    /// Creates a send task emitting the given packets.
    pub fn send(packets: Vec<PacketSpec>, memory: u64) -> Self {
        Self::Send { packets, memory }
    }

    /// Creates a receive task waiting for `expected` packets from `src_vm`.
    pub fn receive(src_vm: VmId, expected: usize, memory: u64) -> Self {
        Self::Receive {
            src_vm,
            expected,
            received: Vec::new(),
            memory,
        }
    }

    /// Advances the task by the reported number of executed instructions and
    /// returns whether the task has completed.
    ///
    /// Send tasks complete unconditionally (their side effect is handled by the
    /// transport engine on activation); receive tasks complete only once
    /// satisfied by deliveries.
    pub fn advance(&mut self, executed: f64) -> bool {
        match self {
            Self::Execution { remaining, .. } => {
                *remaining -= executed;
                *remaining <= 0.
            }
            Self::Send { .. } => true,
            Self::Receive { expected, received, .. } => received.len() >= *expected,
        }
    }

    /// Returns whether this is a receive task from `vm` still expecting packets.
    pub fn expects_from(&self, vm: VmId) -> bool {
        match self {
            Self::Receive {
                src_vm,
                expected,
                received,
                ..
            } => *src_vm == vm && received.len() < *expected,
            _ => false,
        }
    }

    /// Appends a delivered packet to a receive task.
    ///
    /// Returns `true` if the packet was accepted and `false` if the task is
    /// already satisfied or is not a receive task.
    pub fn deliver(&mut self, packet: Packet) -> bool {
        match self {
            Self::Receive {
                expected, received, ..
            } => {
                if received.len() >= *expected {
                    return false;
                }
                received.push(packet);
                true
            }
            _ => false,
        }
    }

    /// Returns whether the task has reached its completion condition.
    pub fn is_satisfied(&self) -> bool {
        match self {
            Self::Execution { remaining, .. } => *remaining <= 0.,
            Self::Send { .. } => true,
            Self::Receive { expected, received, .. } => received.len() >= *expected,
        }
    }
}

impl Display for CloudletTask {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Execution { length, .. } => write!(f, "execution({} instructions)", length),
            Self::Send { packets, .. } => write!(f, "send({} packets)", packets.len()),
            Self::Receive { src_vm, expected, .. } => write!(f, "receive({} packets from vm {})", expected, src_vm),
        }
    }
}
