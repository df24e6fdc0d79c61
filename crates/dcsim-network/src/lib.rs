#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod cloudlet;
pub mod config;
pub mod cpu;
pub mod engine;
pub mod error;
pub mod events;
pub mod packet;
pub mod placement;
pub mod simulation;
pub mod task;
pub mod topology;

pub use cloudlet::{CloudletId, CloudletStatus, NetworkCloudlet, VmId};
pub use config::NetworkConfig;
pub use cpu::{ConstantMips, CpuModel};
pub use engine::ExecutionEngine;
pub use error::TopologyError;
pub use packet::{Packet, PacketId};
pub use placement::{StaticPlacement, VmPlacement};
pub use simulation::NetworkSimulation;
pub use task::{CloudletTask, PacketSpec, TaskState};
pub use topology::{HostId, Switch, SwitchId, SwitchLevel, Topology, TopologyConfig};
