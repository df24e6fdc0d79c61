//! Packets exchanged between network cloudlets.

use serde::Serialize;

use crate::cloudlet::{CloudletId, VmId};

/// Unique packet identifier.
pub type PacketId = u64;

/// A data transfer between two network cloudlets.
///
/// Created by a send task, owned by the transport engine while in flight and
/// handed to the destination receive task on delivery. `receive_time` is set
/// exactly once, when the packet reaches the destination host.
#[derive(Clone, Debug, Serialize)]
pub struct Packet {
    /// Unique packet identifier.
    pub id: PacketId,
    /// Cloudlet which produced the packet.
    pub src_cloudlet: CloudletId,
    /// Cloudlet the packet is destined to.
    pub dst_cloudlet: CloudletId,
    /// VM running the source cloudlet.
    pub src_vm: VmId,
    /// VM running the destination cloudlet.
    pub dst_vm: VmId,
    /// Payload size in bytes.
    pub size: u64,
    /// Time the packet left the source.
    pub send_time: f64,
    /// Time the packet reached the destination host, unset while in flight.
    pub receive_time: Option<f64>,
}
