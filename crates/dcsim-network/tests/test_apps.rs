use std::cell::RefCell;
use std::rc::Rc;

use dcsim_core::cast;
use dcsim_core::context::SimulationContext;
use dcsim_core::event::Event;
use dcsim_core::handler::EventHandler;
use dcsim_core::simulation::Simulation;

use dcsim_network::cloudlet::{CloudletId, CloudletStatus, NetworkCloudlet};
use dcsim_network::config::NetworkConfig;
use dcsim_network::events::cloudlet::CloudletFinished;
use dcsim_network::simulation::NetworkSimulation;
use dcsim_network::task::CloudletTask;
use dcsim_network::topology::TopologyConfig;
use dcsim_network::PacketSpec;

fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!(
        (x - y).abs() < eps,
        "Values do not match: {:.15} vs {:.15}",
        x,
        y
    );
}

fn config() -> NetworkConfig {
    NetworkConfig {
        scheduling_interval: 1.,
        mips_per_pe: 10.,
        topology: TopologyConfig {
            edge_count: 2,
            edge_ports: 4,
            edge_bandwidth: 100.,
            edge_latency: 0.001,
            aggregate_count: 1,
            aggregate_ports: 2,
            aggregate_bandwidth: 50.,
            aggregate_latency: 0.002,
            root_ports: 1,
            root_bandwidth: 200.,
            root_latency: 0.003,
        },
    }
}

struct Broker {
    finished: Vec<(CloudletId, f64)>,
    ctx: SimulationContext,
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            CloudletFinished { cloudlet_id } => {
                self.finished.push((cloudlet_id, self.ctx.time()));
            }
        })
    }
}

// a collector waiting for results of two workers with different run times
fn run_bag_of_tasks(receive_slow_worker_first: bool) -> (f64, Vec<(CloudletId, f64)>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut sim = Simulation::new(123);
    let broker_ctx = sim.create_context("broker");
    let broker = Rc::new(RefCell::new(Broker {
        finished: Vec::new(),
        ctx: broker_ctx,
    }));
    let broker_id = sim.add_handler("broker", broker.clone());

    let mut cloud = NetworkSimulation::new(sim, config()).unwrap();
    let collector_host = cloud.add_host().unwrap();
    let worker_hosts = [cloud.add_host().unwrap(), cloud.add_host().unwrap()];
    let collector_vm = cloud.spawn_vm(collector_host);
    let slow_vm = cloud.spawn_vm(worker_hosts[0]);
    let fast_vm = cloud.spawn_vm(worker_hosts[1]);

    let collector_id = cloud.next_cloudlet_id();
    let slow_id = cloud.next_cloudlet_id();
    let fast_id = cloud.next_cloudlet_id();

    let slow = NetworkCloudlet::new(slow_id, slow_vm, 1)
        .with_task(CloudletTask::execution(30., 0))
        .with_task(CloudletTask::send(
            vec![PacketSpec {
                dst_cloudlet: collector_id,
                size: 100,
            }],
            0,
        ));
    let fast = NetworkCloudlet::new(fast_id, fast_vm, 1)
        .with_task(CloudletTask::execution(10., 0))
        .with_task(CloudletTask::send(
            vec![PacketSpec {
                dst_cloudlet: collector_id,
                size: 100,
            }],
            0,
        ));
    let mut collector = NetworkCloudlet::new(collector_id, collector_vm, 1);
    if receive_slow_worker_first {
        collector.add_task(CloudletTask::receive(slow_vm, 1, 0));
        collector.add_task(CloudletTask::receive(fast_vm, 1, 0));
    } else {
        collector.add_task(CloudletTask::receive(fast_vm, 1, 0));
        collector.add_task(CloudletTask::receive(slow_vm, 1, 0));
    }

    cloud.submit_cloudlet(collector, Some(broker_id));
    cloud.submit_cloudlet(slow, None);
    cloud.submit_cloudlet(fast, None);
    cloud.step_until_no_events();

    assert!(cloud.is_finished(collector_id));
    let finish_time = cloud.engine().borrow().cloudlet(collector_id).unwrap().finish_time();
    let notifications = broker.borrow().finished.clone();
    (finish_time, notifications)
}

#[test]
fn test_bag_of_tasks_collector() {
    // hosts share an edge switch, one packet takes 0.001 + 100/100
    let (finish_time, notifications) = run_bag_of_tasks(true);
    assert_float_eq(finish_time, 3. + 1.001, 1e-9);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].0, 0);
    assert_float_eq(notifications[0].1, 3. + 1.001, 1e-9);
}

#[test]
fn test_collector_finish_independent_of_receive_order() {
    // the fast worker's packet is buffered in one order and consumed
    // directly in the other, the collector finishes at the same time
    let (slow_first, _) = run_bag_of_tasks(true);
    let (fast_first, _) = run_bag_of_tasks(false);
    assert_float_eq(slow_first, fast_first, 1e-9);
}

#[test]
fn test_ping_pong_workflow() {
    let _ = env_logger::builder().is_test(true).try_init();
    let sim = Simulation::new(123);
    let mut cloud = NetworkSimulation::new(sim, config()).unwrap();
    let hosts = [cloud.add_host().unwrap(), cloud.add_host().unwrap()];
    let ping_vm = cloud.spawn_vm(hosts[0]);
    let pong_vm = cloud.spawn_vm(hosts[1]);
    let ping_id = cloud.next_cloudlet_id();
    let pong_id = cloud.next_cloudlet_id();

    let ping = NetworkCloudlet::new(ping_id, ping_vm, 1)
        .with_task(CloudletTask::send(
            vec![PacketSpec {
                dst_cloudlet: pong_id,
                size: 100,
            }],
            0,
        ))
        .with_task(CloudletTask::receive(pong_vm, 1, 0));
    let pong = NetworkCloudlet::new(pong_id, pong_vm, 1)
        .with_task(CloudletTask::receive(ping_vm, 1, 0))
        .with_task(CloudletTask::send(
            vec![PacketSpec {
                dst_cloudlet: ping_id,
                size: 100,
            }],
            0,
        ));
    cloud.submit_cloudlet(pong, None);
    cloud.submit_cloudlet(ping, None);
    cloud.step_until_no_events();

    let engine = cloud.engine();
    let engine = engine.borrow();
    assert_float_eq(engine.cloudlet(pong_id).unwrap().finish_time(), 1.001, 1e-9);
    assert_float_eq(engine.cloudlet(ping_id).unwrap().finish_time(), 2. * 1.001, 1e-9);
}

#[test]
fn test_vm_destruction_cancels_cloudlets() {
    let _ = env_logger::builder().is_test(true).try_init();
    let sim = Simulation::new(123);
    let mut cloud = NetworkSimulation::new(sim, config()).unwrap();
    let host = cloud.add_host().unwrap();
    let vm = cloud.spawn_vm(host);
    let id = cloud.next_cloudlet_id();
    let cloudlet = NetworkCloudlet::new(id, vm, 1).with_task(CloudletTask::execution(1000., 0));
    cloud.submit_cloudlet(cloudlet, None);
    cloud.destroy_vm_with_delay(vm, 5.);
    cloud.step_until_no_events();
    // the cloudlet would have run until 100.0
    assert_eq!(cloud.cloudlet_status(id), Some(CloudletStatus::Cancelled));
    assert!(!cloud.is_finished(id));
    assert!(cloud.current_time() < 100.);
}

#[test]
fn test_destroy_vm_before_activation() {
    let _ = env_logger::builder().is_test(true).try_init();
    let sim = Simulation::new(123);
    let mut cloud = NetworkSimulation::new(sim, config()).unwrap();
    let host = cloud.add_host().unwrap();
    let vm = cloud.spawn_vm(host);
    let id = cloud.next_cloudlet_id();
    let cloudlet = NetworkCloudlet::new(id, vm, 1).with_task(CloudletTask::execution(10., 0));
    cloud.submit_cloudlet(cloudlet, None);
    assert_eq!(cloud.cloudlet_status(id), Some(CloudletStatus::Submitted));
    // destroyed while the activation event is still pending
    cloud.destroy_vm(vm);
    cloud.step_until_no_events();
    assert_eq!(cloud.cloudlet_status(id), Some(CloudletStatus::Cancelled));
    assert!(!cloud.is_finished(id));
}

#[test]
fn test_packet_to_cancelled_cloudlet_is_dropped() {
    let _ = env_logger::builder().is_test(true).try_init();
    let sim = Simulation::new(123);
    let mut cloud = NetworkSimulation::new(sim, config()).unwrap();
    let hosts = [cloud.add_host().unwrap(), cloud.add_host().unwrap()];
    let sender_vm = cloud.spawn_vm(hosts[0]);
    let receiver_vm = cloud.spawn_vm(hosts[1]);
    let sender_id = cloud.next_cloudlet_id();
    let receiver_id = cloud.next_cloudlet_id();
    let sender = NetworkCloudlet::new(sender_id, sender_vm, 1).with_task(CloudletTask::send(
        vec![PacketSpec {
            dst_cloudlet: receiver_id,
            size: 100,
        }],
        0,
    ));
    let receiver =
        NetworkCloudlet::new(receiver_id, receiver_vm, 1).with_task(CloudletTask::receive(sender_vm, 1, 0));
    cloud.submit_cloudlet(receiver, None);
    cloud.submit_cloudlet(sender, None);
    // the receiver's VM dies while the packet is in flight
    cloud.destroy_vm_with_delay(receiver_vm, 0.5);
    cloud.step_until_no_events();
    assert!(cloud.is_finished(sender_id));
    assert_eq!(cloud.cloudlet_status(receiver_id), Some(CloudletStatus::Cancelled));
    // the dropped packet is not counted at the destination host
    assert_eq!(cloud.bytes_transferred(hosts[0]), 100);
    assert_eq!(cloud.bytes_transferred(hosts[1]), 0);
}

#[test]
fn test_cancelled_sender_packets_are_discarded() {
    let _ = env_logger::builder().is_test(true).try_init();
    let sim = Simulation::new(123);
    let mut cloud = NetworkSimulation::new(sim, config()).unwrap();
    let hosts = [cloud.add_host().unwrap(), cloud.add_host().unwrap()];
    let sender_vm = cloud.spawn_vm(hosts[0]);
    let receiver_vm = cloud.spawn_vm(hosts[1]);
    let sender_id = cloud.next_cloudlet_id();
    let receiver_id = cloud.next_cloudlet_id();
    let sender = NetworkCloudlet::new(sender_id, sender_vm, 1)
        .with_task(CloudletTask::send(
            vec![PacketSpec {
                dst_cloudlet: receiver_id,
                size: 100,
            }],
            0,
        ))
        .with_task(CloudletTask::receive(receiver_vm, 1, 0));
    let receiver =
        NetworkCloudlet::new(receiver_id, receiver_vm, 1).with_task(CloudletTask::receive(sender_vm, 1, 0));
    cloud.submit_cloudlet(receiver, None);
    cloud.submit_cloudlet(sender, None);
    // the sender's VM dies while its packet is still in flight
    cloud.destroy_vm_with_delay(sender_vm, 0.5);
    cloud.step_until_no_events();
    assert_eq!(cloud.cloudlet_status(sender_id), Some(CloudletStatus::Cancelled));
    // the receiver never gets the packet and stays running
    assert_eq!(cloud.cloudlet_status(receiver_id), Some(CloudletStatus::Running));
    assert_eq!(cloud.engine().borrow().cloudlet(receiver_id).unwrap().bytes_received(), 0);
}
