//! Simulation events of the execution engine.

// TRANSPORT EVENTS ////////////////////////////////////////////////////////////////////////////////

pub mod transport {
    use serde::Serialize;

    use crate::packet::Packet;

    /// A packet reached the destination host and is handed to the destination
    /// cloudlet's receive task (or buffered until that task becomes current).
    #[derive(Serialize)]
    pub struct PacketArrived {
        /// The delivered packet, `receive_time` still unset.
        pub packet: Packet,
    }
}

// CLOUDLET LIFECYCLE EVENTS ///////////////////////////////////////////////////////////////////////

pub mod cloudlet {
    use serde::Serialize;

    use crate::cloudlet::{CloudletId, VmId};

    /// Finish notification sent to the broker that requested it on submit.
    #[derive(Serialize)]
    pub struct CloudletFinished {
        /// The finished cloudlet.
        pub cloudlet_id: CloudletId,
    }

    /// Request to destroy a VM and cancel every cloudlet bound to it.
    #[derive(Serialize)]
    pub struct VmDestroyed {
        /// The destroyed VM.
        pub vm_id: VmId,
    }
}
