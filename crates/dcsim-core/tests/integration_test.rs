use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use dcsim_core::{cast, Event, EventHandler, Simulation, SimulationContext};

#[derive(Clone, Serialize)]
struct Message {
    payload: u32,
}

struct Receiver {
    log: Rc<RefCell<Vec<(f64, u32)>>>,
    ctx: SimulationContext,
}

impl EventHandler for Receiver {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Message { payload } => {
                self.log.borrow_mut().push((self.ctx.time(), payload));
            }
        })
    }
}

fn make_receiver(sim: &mut Simulation, name: &str, log: Rc<RefCell<Vec<(f64, u32)>>>) -> u32 {
    let receiver = Rc::new(RefCell::new(Receiver {
        log,
        ctx: sim.create_context(name),
    }));
    sim.add_handler(name, receiver)
}

#[test]
fn test_events_delivered_in_time_order() {
    let mut sim = Simulation::new(42);
    let log = Rc::new(RefCell::new(Vec::new()));
    let receiver_id = make_receiver(&mut sim, "receiver", log.clone());
    let client = sim.create_context("client");

    client.emit(Message { payload: 3 }, receiver_id, 3.);
    client.emit(Message { payload: 1 }, receiver_id, 1.);
    client.emit(Message { payload: 2 }, receiver_id, 2.);
    sim.step_until_no_events();

    assert_eq!(*log.borrow(), vec![(1., 1), (2., 2), (3., 3)]);
    assert_eq!(sim.time(), 3.);
    assert_eq!(sim.event_count(), 3);
}

#[test]
fn test_same_time_events_keep_emission_order() {
    let mut sim = Simulation::new(42);
    let log = Rc::new(RefCell::new(Vec::new()));
    let receiver_id = make_receiver(&mut sim, "receiver", log.clone());
    let client = sim.create_context("client");

    for payload in 0..5 {
        client.emit(Message { payload }, receiver_id, 1.);
    }
    sim.step_until_no_events();

    let payloads: Vec<u32> = log.borrow().iter().map(|&(_, p)| p).collect();
    assert_eq!(payloads, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_cancel_event() {
    let mut sim = Simulation::new(42);
    let log = Rc::new(RefCell::new(Vec::new()));
    let receiver_id = make_receiver(&mut sim, "receiver", log.clone());
    let client = sim.create_context("client");

    let cancelled = client.emit(Message { payload: 1 }, receiver_id, 1.);
    client.emit(Message { payload: 2 }, receiver_id, 2.);
    client.cancel_event(cancelled);
    sim.step_until_no_events();

    assert_eq!(*log.borrow(), vec![(2., 2)]);
}

#[test]
fn test_steps_and_step_for_duration() {
    let mut sim = Simulation::new(42);
    let log = Rc::new(RefCell::new(Vec::new()));
    let receiver_id = make_receiver(&mut sim, "receiver", log.clone());
    let client = sim.create_context("client");

    for payload in 0..4 {
        client.emit(Message { payload }, receiver_id, payload as f64 + 1.);
    }

    assert!(sim.steps(2));
    assert_eq!(log.borrow().len(), 2);
    assert_eq!(sim.time(), 2.);

    sim.step_for_duration(1.);
    assert_eq!(log.borrow().len(), 3);
    assert_eq!(sim.time(), 3.);

    sim.step_until_no_events();
    assert_eq!(log.borrow().len(), 4);
    assert!(!sim.step());
}

#[test]
fn test_cancel_and_get_events() {
    let mut sim = Simulation::new(42);
    let log = Rc::new(RefCell::new(Vec::new()));
    let receiver_id = make_receiver(&mut sim, "receiver", log.clone());
    let client = sim.create_context("client");

    for payload in 0..3 {
        client.emit(Message { payload }, receiver_id, payload as f64 + 1.);
    }
    let canceled = sim.cancel_and_get_events(|e| e.time > 1.5);
    assert_eq!(canceled.len(), 2);
    sim.step_until_no_events();

    assert_eq!(*log.borrow(), vec![(1., 0)]);
}

#[test]
fn test_deterministic_random() {
    let mut sim1 = Simulation::new(7);
    let mut sim2 = Simulation::new(7);
    let samples1: Vec<f64> = (0..10).map(|_| sim1.rand()).collect();
    let samples2: Vec<f64> = (0..10).map(|_| sim2.rand()).collect();
    assert_eq!(samples1, samples2);
}

#[test]
fn test_name_lookup() {
    let mut sim = Simulation::new(42);
    let ctx = sim.create_context("worker");
    assert_eq!(sim.lookup_id("worker"), ctx.id());
    assert_eq!(sim.lookup_name(ctx.id()), "worker");
}
