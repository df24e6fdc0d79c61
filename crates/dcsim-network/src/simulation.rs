//! Facade for building and running network cloudlet simulations.

use std::cell::RefCell;
use std::rc::Rc;

use sugars::{rc, refcell};

use dcsim_core::component::Id;
use dcsim_core::context::SimulationContext;
use dcsim_core::simulation::Simulation;

use crate::cloudlet::{CloudletId, CloudletStatus, NetworkCloudlet, VmId};
use crate::config::NetworkConfig;
use crate::cpu::ConstantMips;
use crate::engine::ExecutionEngine;
use crate::error::TopologyError;
use crate::events::cloudlet::VmDestroyed;
use crate::placement::StaticPlacement;
use crate::topology::{HostId, Topology};

/// Owns the engine, topology and placement and wires them into a simulation.
///
/// The facade hands out host and VM identifiers, places VMs, submits cloudlets
/// and exposes simulation stepping. Brokers needing finer control can talk to
/// the engine component directly.
pub struct NetworkSimulation {
    engine: Rc<RefCell<ExecutionEngine>>,
    engine_id: Id,
    topology: Rc<RefCell<Topology>>,
    placement: Rc<RefCell<StaticPlacement>>,
    host_counter: HostId,
    vm_counter: VmId,
    cloudlet_counter: CloudletId,
    sim: Simulation,
    ctx: SimulationContext,
    config: Rc<NetworkConfig>,
}

impl NetworkSimulation {
    /// Builds the topology from the config and registers the engine component.
    pub fn new(mut sim: Simulation, config: NetworkConfig) -> Result<Self, TopologyError> {
        let topology = rc!(refcell!(Topology::build(&config.topology)?));
        let placement = rc!(refcell!(StaticPlacement::new()));
        let engine = rc!(refcell!(ExecutionEngine::new(
            topology.clone(),
            placement.clone(),
            Box::new(ConstantMips::new(config.mips_per_pe)),
            config.scheduling_interval,
            sim.create_context("engine"),
        )));
        let engine_id = sim.add_handler("engine", engine.clone());
        let ctx = sim.create_context("simulation");
        Ok(Self {
            engine,
            engine_id,
            topology,
            placement,
            host_counter: 0,
            vm_counter: 0,
            cloudlet_counter: 0,
            sim,
            ctx,
            config: rc!(config),
        })
    }

    /// Connects a new host to its edge switch and returns its identifier.
    ///
    /// Hosts receive consecutive identifiers, so they fill edge switches in
    /// order; fails once all edge ports are taken.
    pub fn add_host(&mut self) -> Result<HostId, TopologyError> {
        let id = self.host_counter;
        self.topology.borrow_mut().connect_host(id)?;
        self.host_counter += 1;
        Ok(id)
    }

    /// Places a new VM on the host and returns its identifier.
    pub fn spawn_vm(&mut self, host_id: HostId) -> VmId {
        let id = self.vm_counter;
        self.vm_counter += 1;
        self.placement.borrow_mut().place(id, host_id);
        id
    }

    /// Destroys the VM immediately, cancelling all its cloudlets.
    pub fn destroy_vm(&mut self, vm_id: VmId) {
        self.engine.borrow_mut().destroy_vm(vm_id);
        self.placement.borrow_mut().remove(vm_id);
    }

    /// Schedules VM destruction after the given delay.
    pub fn destroy_vm_with_delay(&mut self, vm_id: VmId, delay: f64) {
        self.ctx.emit(VmDestroyed { vm_id }, self.engine_id, delay);
    }

    /// Allocates an identifier for a new cloudlet.
    pub fn next_cloudlet_id(&mut self) -> CloudletId {
        let id = self.cloudlet_counter;
        self.cloudlet_counter += 1;
        id
    }

    /// Submits the cloudlet to the engine.
    ///
    /// If `notify` is set, a `CloudletFinished` event is emitted to that
    /// component when the cloudlet finishes.
    pub fn submit_cloudlet(&mut self, cloudlet: NetworkCloudlet, notify: Option<Id>) {
        self.engine.borrow_mut().submit(cloudlet, notify);
    }

    /// The engine component, for direct inspection and event addressing.
    pub fn engine(&self) -> Rc<RefCell<ExecutionEngine>> {
        self.engine.clone()
    }

    /// Identifier of the engine component.
    pub fn engine_id(&self) -> Id {
        self.engine_id
    }

    /// The switch tree.
    pub fn topology(&self) -> Rc<RefCell<Topology>> {
        self.topology.clone()
    }

    /// The underlying simulation.
    pub fn simulation(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// Current status of the cloudlet.
    pub fn cloudlet_status(&self, id: CloudletId) -> Option<CloudletStatus> {
        self.engine.borrow().status(id)
    }

    /// Whether the cloudlet finished all its tasks.
    pub fn is_finished(&self, id: CloudletId) -> bool {
        self.engine.borrow().is_finished(id)
    }

    /// Total bytes sent from or delivered to the host.
    pub fn bytes_transferred(&self, host_id: HostId) -> u64 {
        self.engine.borrow().bytes_transferred(host_id)
    }

    /// Performs at most `step_count` steps of the simulation.
    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    /// Steps the simulation until the given duration elapses.
    pub fn step_for_duration(&mut self, time: f64) {
        self.sim.step_for_duration(time);
    }

    /// Steps the simulation until no events remain.
    pub fn step_until_no_events(&mut self) {
        self.sim.step_until_no_events();
    }

    /// Current simulation time.
    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    /// The effective configuration.
    pub fn config(&self) -> Rc<NetworkConfig> {
        self.config.clone()
    }
}
