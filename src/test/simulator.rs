use crate::sim::{Event, EventHandle, SimTime, Simulator, World};
use std::any::Any;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct DummyWorld {
    ticks: usize,
}

impl World for DummyWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, _sim: &mut Simulator) {
        self.ticks = self.ticks.saturating_add(1);
    }
}

struct Push {
    id: u32,
    log: Arc<Mutex<Vec<u32>>>,
}

impl Event for Push {
    fn execute(self: Box<Self>, _sim: &mut Simulator, _world: &mut dyn World) {
        let Push { id, log } = *self;
        log.lock().expect("log lock").push(id);
    }
}

struct PushThenScheduleNow {
    id: u32,
    next_id: u32,
    log: Arc<Mutex<Vec<u32>>>,
}

impl Event for PushThenScheduleNow {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) {
        let PushThenScheduleNow { id, next_id, log } = *self;
        log.lock().expect("log lock").push(id);
        sim.schedule(sim.now(), Push { id: next_id, log });
    }
}

struct CancelFromCell {
    target: Arc<Mutex<Option<EventHandle>>>,
}

impl Event for CancelFromCell {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) {
        if let Some(h) = *self.target.lock().expect("cell lock") {
            sim.cancel(h);
        }
    }
}

#[test]
fn scheduled_events_order_by_time_then_seq() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(10),
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );
    sim.schedule(
        SimTime(5),
        Push {
            id: 2,
            log: Arc::clone(&log),
        },
    );
    sim.schedule(
        SimTime(10),
        Push {
            id: 3,
            log: Arc::clone(&log),
        },
    );

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[2, 1, 3]);
    assert_eq!(world.ticks, 3);
    assert_eq!(sim.now(), SimTime(10));
}

#[test]
fn event_scheduled_at_same_time_inside_event_runs_after_current_event() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime::ZERO,
        PushThenScheduleNow {
            id: 1,
            next_id: 2,
            log: Arc::clone(&log),
        },
    );

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1, 2]);
    assert_eq!(world.ticks, 2);
    assert_eq!(sim.now(), SimTime::ZERO);
}

#[test]
fn run_until_skips_events_after_until_and_advances_time() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime::ZERO,
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );
    sim.schedule(
        SimTime(10),
        Push {
            id: 2,
            log: Arc::clone(&log),
        },
    );

    let mut world = DummyWorld::default();
    sim.run_until(SimTime(5), &mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1]);
    assert_eq!(world.ticks, 1);
    assert_eq!(sim.now(), SimTime(5));

    sim.run(&mut world);
    assert_eq!(&*log.lock().expect("log lock"), &[1, 2]);
    assert_eq!(world.ticks, 2);
    assert_eq!(sim.now(), SimTime(10));
}

#[test]
fn run_until_executes_events_scheduled_exactly_at_until() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(5),
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );

    let mut world = DummyWorld::default();
    sim.run_until(SimTime(5), &mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1]);
    assert_eq!(world.ticks, 1);
    assert_eq!(sim.now(), SimTime(5));
}

#[test]
fn run_until_advances_time_even_if_there_are_no_events() {
    let mut sim = Simulator::default();
    let mut world = DummyWorld::default();

    sim.run_until(SimTime(7), &mut world);
    assert_eq!(sim.now(), SimTime(7));
    assert_eq!(world.ticks, 0);
}

#[test]
fn cancelled_event_is_skipped_on_pop() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(1),
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );
    let victim = sim.schedule(
        SimTime(2),
        Push {
            id: 2,
            log: Arc::clone(&log),
        },
    );
    sim.schedule(
        SimTime(3),
        Push {
            id: 3,
            log: Arc::clone(&log),
        },
    );
    sim.cancel(victim);

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1, 3]);
    assert_eq!(world.ticks, 2);
    assert_eq!(sim.now(), SimTime(3));
}

#[test]
fn event_cancelled_at_its_own_scheduled_time_never_fires() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let cell: Arc<Mutex<Option<EventHandle>>> = Arc::new(Mutex::new(None));

    let mut sim = Simulator::default();
    // 同一时刻：先插入（先执行）的事件取消后插入的事件
    sim.schedule(
        SimTime(5),
        CancelFromCell {
            target: Arc::clone(&cell),
        },
    );
    let victim = sim.schedule(
        SimTime(5),
        Push {
            id: 2,
            log: Arc::clone(&log),
        },
    );
    *cell.lock().expect("cell lock") = Some(victim);

    let mut world = DummyWorld::default();
    sim.run(&mut world);

    // victim 的调度时间已到，但在弹出前被取消，因此不执行
    assert_eq!(&*log.lock().expect("log lock"), &Vec::<u32>::new());
    assert_eq!(world.ticks, 1);
}

#[test]
#[should_panic(expected = "invalid schedule")]
fn scheduling_into_the_past_panics() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(10),
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );
    let mut world = DummyWorld::default();
    sim.run(&mut world);
    assert_eq!(sim.now(), SimTime(10));

    sim.schedule(
        SimTime(5),
        Push {
            id: 2,
            log: Arc::clone(&log),
        },
    );
}

struct DoneAfterFirst {
    ticks: usize,
}

impl World for DoneAfterFirst {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, _sim: &mut Simulator) {
        self.ticks += 1;
    }

    fn is_done(&self) -> bool {
        self.ticks >= 1
    }
}

#[test]
fn run_stops_early_when_world_is_done() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime(1),
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );
    sim.schedule(
        SimTime(2),
        Push {
            id: 2,
            log: Arc::clone(&log),
        },
    );

    let mut world = DoneAfterFirst { ticks: 0 };
    sim.run(&mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1]);
    assert_eq!(sim.now(), SimTime(1));
}
