//! VM-to-host placement collaborator.

use rustc_hash::FxHashMap;

use crate::cloudlet::VmId;
use crate::topology::HostId;

/// Resolves the host a VM runs on.
///
/// Placement decisions themselves belong to an external scheduler; the
/// transport engine only needs the lookup to compute packet paths.
pub trait VmPlacement {
    /// Returns the host of the VM, or `None` if the VM is not placed.
    fn host_of(&self, vm_id: VmId) -> Option<HostId>;
}

/// Placement backed by a plain map, filled by the broker.
pub struct StaticPlacement {
    vm_hosts: FxHashMap<VmId, HostId>,
}

impl StaticPlacement {
    /// Creates an empty placement.
    pub fn new() -> Self {
        Self {
            vm_hosts: FxHashMap::default(),
        }
    }

    /// Records that the VM runs on the given host.
    pub fn place(&mut self, vm_id: VmId, host_id: HostId) {
        self.vm_hosts.insert(vm_id, host_id);
    }

    /// Removes the VM from its host.
    pub fn remove(&mut self, vm_id: VmId) {
        self.vm_hosts.remove(&vm_id);
    }
}

impl Default for StaticPlacement {
    fn default() -> Self {
        Self::new()
    }
}

impl VmPlacement for StaticPlacement {
    fn host_of(&self, vm_id: VmId) -> Option<HostId> {
        self.vm_hosts.get(&vm_id).copied()
    }
}
