//! Transport engine and cloudlet executor.
//!
//! The engine is a simulation component driving every submitted network
//! cloudlet through its task list: execution tasks progress on periodic
//! [`AdvanceTasks`] ticks, send tasks hand packets to the transport which
//! schedules their arrival from the topology's path delay, receive tasks block
//! the cloudlet until enough matching packets have been delivered.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::Serialize;

use dcsim_core::cast;
use dcsim_core::component::Id;
use dcsim_core::context::SimulationContext;
use dcsim_core::event::Event;
use dcsim_core::handler::EventHandler;
use dcsim_core::{log_debug, log_info, log_trace, log_warn};

use crate::cloudlet::{CloudletId, CloudletStatus, NetworkCloudlet, VmId};
use crate::cpu::CpuModel;
use crate::events::cloudlet::{CloudletFinished, VmDestroyed};
use crate::events::transport::PacketArrived;
use crate::packet::{Packet, PacketId};
use crate::placement::VmPlacement;
use crate::task::{CloudletTask, PacketSpec};
use crate::topology::{HostId, Topology};

/// Periodic self-event re-evaluating execution task progress.
#[derive(Serialize)]
pub struct AdvanceTasks {}

/// Zero-delay self-event activating the first task of a submitted cloudlet.
#[derive(Serialize)]
pub struct ActivateCloudlet {
    /// The submitted cloudlet.
    pub cloudlet_id: CloudletId,
}

enum Step {
    Execute,
    Send,
    Receive(VmId),
    Finish,
}

/// Executes network cloudlets and transports packets between them.
pub struct ExecutionEngine {
    topology: Rc<RefCell<Topology>>,
    placement: Rc<RefCell<dyn VmPlacement>>,
    cpu: Box<dyn CpuModel>,
    scheduling_interval: f64,
    cloudlets: BTreeMap<CloudletId, NetworkCloudlet>,
    vm_cloudlets: FxHashMap<VmId, Vec<CloudletId>>,
    // packets which arrived before their receive task became current
    pending_packets: FxHashMap<(CloudletId, VmId), VecDeque<Packet>>,
    host_bytes: FxHashMap<HostId, u64>,
    finish_notify: FxHashMap<CloudletId, Id>,
    packet_counter: PacketId,
    advance_scheduled: bool,
    ctx: SimulationContext,
}

impl ExecutionEngine {
    /// Creates an engine over the given topology and placement.
    pub fn new(
        topology: Rc<RefCell<Topology>>,
        placement: Rc<RefCell<dyn VmPlacement>>,
        cpu: Box<dyn CpuModel>,
        scheduling_interval: f64,
        ctx: SimulationContext,
    ) -> Self {
        assert!(scheduling_interval > 0., "Scheduling interval must be > 0");
        Self {
            topology,
            placement,
            cpu,
            scheduling_interval,
            cloudlets: BTreeMap::new(),
            vm_cloudlets: FxHashMap::default(),
            pending_packets: FxHashMap::default(),
            host_bytes: FxHashMap::default(),
            finish_notify: FxHashMap::default(),
            packet_counter: 0,
            advance_scheduled: false,
            ctx,
        }
    }

    /// Accepts a cloudlet for execution.
    ///
    /// The cloudlet stays in the submitted state until its first task is
    /// activated by a zero-delay [`ActivateCloudlet`] self-event. If `notify`
    /// is set, a [`CloudletFinished`] event is emitted to that component when
    /// the last task completes.
    pub fn submit(&mut self, mut cloudlet: NetworkCloudlet, notify: Option<Id>) {
        let now = self.ctx.time();
        let id = cloudlet.id;
        let vm_id = cloudlet.vm_id;
        cloudlet.mark_submitted(now);
        log_debug!(
            self.ctx,
            "cloudlet {} with {} tasks submitted on vm {}",
            id,
            cloudlet.task_count(),
            vm_id
        );
        self.vm_cloudlets.entry(vm_id).or_default().push(id);
        if let Some(dst) = notify {
            self.finish_notify.insert(id, dst);
        }
        self.cloudlets.insert(id, cloudlet);
        self.ctx.emit_self_now(ActivateCloudlet { cloudlet_id: id });
    }

    fn on_activate_cloudlet(&mut self, id: CloudletId) {
        let now = self.ctx.time();
        let Some(cloudlet) = self.cloudlets.get_mut(&id) else { return };
        // the cloudlet may have been cancelled between submission and activation
        if cloudlet.status() != CloudletStatus::Submitted {
            return;
        }
        cloudlet.mark_started(now);
        self.run_cloudlet(id);
    }

    /// Cancels every cloudlet bound to the VM.
    ///
    /// Cancelled cloudlets never become finished; their buffered packets are
    /// discarded and packets still in flight toward them are dropped silently
    /// on arrival.
    pub fn destroy_vm(&mut self, vm_id: VmId) {
        let ids = self.vm_cloudlets.remove(&vm_id).unwrap_or_default();
        for id in &ids {
            if let Some(cloudlet) = self.cloudlets.get_mut(id) {
                match cloudlet.status() {
                    CloudletStatus::Finished | CloudletStatus::Cancelled => {}
                    _ => {
                        cloudlet.set_status(CloudletStatus::Cancelled);
                        log_debug!(self.ctx, "cloudlet {} cancelled, vm {} destroyed", id, vm_id);
                    }
                }
            }
            self.finish_notify.remove(id);
        }
        self.pending_packets.retain(|(cloudlet_id, _), _| !ids.contains(cloudlet_id));
    }

    /// Whether the cloudlet has completed all its tasks. `false` for cancelled
    /// and unknown cloudlets.
    pub fn is_finished(&self, id: CloudletId) -> bool {
        self.cloudlets.get(&id).map_or(false, |c| c.status() == CloudletStatus::Finished)
    }

    /// Current status of the cloudlet.
    pub fn status(&self, id: CloudletId) -> Option<CloudletStatus> {
        self.cloudlets.get(&id).map(|c| c.status())
    }

    /// Returns the cloudlet for mid-run progress inspection.
    pub fn cloudlet(&self, id: CloudletId) -> Option<&NetworkCloudlet> {
        self.cloudlets.get(&id)
    }

    /// Total bytes of packets sent from or delivered to the host.
    ///
    /// Maintained incrementally on send and delivery events.
    pub fn bytes_transferred(&self, host_id: HostId) -> u64 {
        self.host_bytes.get(&host_id).copied().unwrap_or(0)
    }

    /// Advances the cloudlet through every task completable at the current
    /// time: send tasks fire and retire immediately, satisfied receive tasks
    /// retire, an execution task arms the periodic tick, an exhausted task
    /// list finishes the cloudlet.
    fn run_cloudlet(&mut self, id: CloudletId) {
        loop {
            let now = self.ctx.time();
            let step = {
                let Some(cloudlet) = self.cloudlets.get(&id) else { return };
                match cloudlet.status() {
                    CloudletStatus::Running => {}
                    _ => return,
                }
                match cloudlet.current_task() {
                    None => Step::Finish,
                    Some(CloudletTask::Execution { .. }) => Step::Execute,
                    Some(CloudletTask::Send { .. }) => Step::Send,
                    Some(CloudletTask::Receive { src_vm, .. }) => Step::Receive(*src_vm),
                }
            };
            match step {
                Step::Finish => {
                    self.finish_cloudlet(id, now);
                    return;
                }
                Step::Execute => {
                    self.cloudlets.get_mut(&id).unwrap().last_update_time = now;
                    self.maybe_schedule_advance();
                    return;
                }
                Step::Send => {
                    let (specs, src_vm) = {
                        let cloudlet = self.cloudlets.get_mut(&id).unwrap();
                        let specs = match cloudlet.current_task().unwrap() {
                            CloudletTask::Send { packets, .. } => packets.clone(),
                            _ => unreachable!(),
                        };
                        cloudlet.advance_task();
                        (specs, cloudlet.vm_id)
                    };
                    let mut sent_bytes = 0;
                    for spec in specs {
                        if self.send_packet(id, src_vm, &spec) {
                            sent_bytes += spec.size;
                        }
                    }
                    self.cloudlets.get_mut(&id).unwrap().add_bytes_sent(sent_bytes);
                }
                Step::Receive(src_vm) => {
                    self.drain_pending(id, src_vm);
                    let cloudlet = self.cloudlets.get_mut(&id).unwrap();
                    if cloudlet.current_task().unwrap().is_satisfied() {
                        cloudlet.advance_task();
                    } else {
                        return;
                    }
                }
            }
        }
    }

    fn finish_cloudlet(&mut self, id: CloudletId, now: f64) {
        let cloudlet = self.cloudlets.get_mut(&id).unwrap();
        cloudlet.mark_finished(now);
        let vm_id = cloudlet.vm_id;
        log_info!(self.ctx, "cloudlet {} finished on vm {}", id, vm_id);
        let mut leftover = 0;
        self.pending_packets.retain(|(cloudlet_id, _), queue| {
            if *cloudlet_id == id {
                leftover += queue.len();
                false
            } else {
                true
            }
        });
        if leftover > 0 {
            log_warn!(
                self.ctx,
                "{} late packets for finished cloudlet {} dropped",
                leftover,
                id
            );
        }
        if let Some(dst) = self.finish_notify.remove(&id) {
            self.ctx.emit_now(CloudletFinished { cloudlet_id: id }, dst);
        }
    }

    /// Builds a packet from the spec and schedules its arrival at the
    /// destination host after the topology path delay. Returns whether the
    /// packet was actually emitted.
    fn send_packet(&mut self, src_cloudlet: CloudletId, src_vm: VmId, spec: &PacketSpec) -> bool {
        let now = self.ctx.time();
        let Some(dst) = self.cloudlets.get(&spec.dst_cloudlet) else {
            log_warn!(
                self.ctx,
                "packet from cloudlet {} to unknown cloudlet {} dropped",
                src_cloudlet,
                spec.dst_cloudlet
            );
            return false;
        };
        let dst_vm = dst.vm_id;
        let placement = self.placement.borrow();
        let (Some(src_host), Some(dst_host)) = (placement.host_of(src_vm), placement.host_of(dst_vm)) else {
            log_warn!(
                self.ctx,
                "packet from cloudlet {} to cloudlet {} dropped, vm not placed",
                src_cloudlet,
                spec.dst_cloudlet
            );
            return false;
        };
        drop(placement);
        let Some(delay) = self.topology.borrow().transfer_time(src_host, dst_host, spec.size) else {
            log_warn!(
                self.ctx,
                "packet from cloudlet {} to cloudlet {} dropped, host {} or {} not connected",
                src_cloudlet,
                spec.dst_cloudlet,
                src_host,
                dst_host
            );
            return false;
        };
        let packet = Packet {
            id: self.packet_counter,
            src_cloudlet,
            dst_cloudlet: spec.dst_cloudlet,
            src_vm,
            dst_vm,
            size: spec.size,
            send_time: now,
            receive_time: None,
        };
        self.packet_counter += 1;
        *self.host_bytes.entry(src_host).or_insert(0) += spec.size;
        log_debug!(
            self.ctx,
            "packet {} from cloudlet {} to cloudlet {} ({} bytes) departs, delivery at {:.3}",
            packet.id,
            src_cloudlet,
            spec.dst_cloudlet,
            spec.size,
            now + delay
        );
        self.ctx.emit_self(PacketArrived { packet }, delay);
        true
    }

    fn on_packet_arrived(&mut self, mut packet: Packet) {
        let now = self.ctx.time();
        // a cancelled sender's in-flight packets are discarded
        if let Some(src) = self.cloudlets.get(&packet.src_cloudlet) {
            if src.status() == CloudletStatus::Cancelled {
                log_trace!(self.ctx, "packet {} dropped, source cloudlet cancelled", packet.id);
                return;
            }
        }
        let Some(dst) = self.cloudlets.get(&packet.dst_cloudlet) else {
            log_warn!(
                self.ctx,
                "packet {} for unknown cloudlet {} dropped",
                packet.id,
                packet.dst_cloudlet
            );
            return;
        };
        match dst.status() {
            CloudletStatus::Cancelled => {
                log_trace!(self.ctx, "packet {} dropped, destination cloudlet cancelled", packet.id);
                return;
            }
            CloudletStatus::Finished => {
                log_warn!(
                    self.ctx,
                    "late packet {} for finished cloudlet {} dropped",
                    packet.id,
                    packet.dst_cloudlet
                );
                return;
            }
            _ => {}
        }
        packet.receive_time = Some(now);
        if let Some(dst_host) = self.placement.borrow().host_of(packet.dst_vm) {
            *self.host_bytes.entry(dst_host).or_insert(0) += packet.size;
        }
        let dst_id = packet.dst_cloudlet;
        let src_vm = packet.src_vm;
        let size = packet.size;
        let dst = self.cloudlets.get_mut(&dst_id).unwrap();
        let expected = dst.current_task().map_or(false, |task| task.expects_from(src_vm));
        if expected {
            dst.current_task_mut().unwrap().deliver(packet);
            dst.add_bytes_received(size);
            self.run_cloudlet(dst_id);
        } else {
            log_trace!(
                self.ctx,
                "packet for cloudlet {} buffered until its receive task is current",
                dst_id
            );
            self.pending_packets.entry((dst_id, src_vm)).or_default().push_back(packet);
        }
    }

    /// Hands buffered packets to the now-current receive task.
    fn drain_pending(&mut self, id: CloudletId, src_vm: VmId) {
        let Some(queue) = self.pending_packets.get_mut(&(id, src_vm)) else { return };
        let cloudlet = self.cloudlets.get_mut(&id).unwrap();
        while !queue.is_empty() {
            let task = cloudlet.current_task_mut().unwrap();
            if !task.expects_from(src_vm) {
                break;
            }
            let packet = queue.pop_front().unwrap();
            let size = packet.size;
            task.deliver(packet);
            cloudlet.add_bytes_received(size);
        }
        if queue.is_empty() {
            self.pending_packets.remove(&(id, src_vm));
        }
    }

    fn on_advance_tasks(&mut self) {
        self.advance_scheduled = false;
        let now = self.ctx.time();
        let running: Vec<CloudletId> = self
            .cloudlets
            .iter()
            .filter(|(_, c)| {
                c.status() == CloudletStatus::Running
                    && matches!(c.current_task(), Some(CloudletTask::Execution { .. }))
            })
            .map(|(&id, _)| id)
            .collect();
        for id in running {
            let cloudlet = self.cloudlets.get_mut(&id).unwrap();
            let elapsed = now - cloudlet.last_update_time;
            let executed = self.cpu.instructions(cloudlet.pes, elapsed);
            cloudlet.last_update_time = now;
            if cloudlet.current_task_mut().unwrap().advance(executed) {
                log_debug!(self.ctx, "cloudlet {} completed its execution task", id);
                cloudlet.advance_task();
                self.run_cloudlet(id);
            }
        }
        self.maybe_schedule_advance();
    }

    /// Arms the periodic tick while any running cloudlet has a current
    /// execution task; receive waits and packet flight need no ticks.
    fn maybe_schedule_advance(&mut self) {
        if self.advance_scheduled {
            return;
        }
        let needed = self.cloudlets.values().any(|c| {
            c.status() == CloudletStatus::Running && matches!(c.current_task(), Some(CloudletTask::Execution { .. }))
        });
        if needed {
            self.ctx.emit_self(AdvanceTasks {}, self.scheduling_interval);
            self.advance_scheduled = true;
        }
    }
}

impl EventHandler for ExecutionEngine {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            ActivateCloudlet { cloudlet_id } => {
                self.on_activate_cloudlet(cloudlet_id);
            }
            AdvanceTasks {} => {
                self.on_advance_tasks();
            }
            PacketArrived { packet } => {
                self.on_packet_arrived(packet);
            }
            VmDestroyed { vm_id } => {
                self.destroy_vm(vm_id);
            }
        })
    }
}
