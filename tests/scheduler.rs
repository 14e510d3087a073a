//! Scheduler behaviour on simulated hardware.

use std::cell::{Cell, RefCell};

use atmega128_tickos::config::SchedulerConfig;
use atmega128_tickos::hal::{Prescaler, TickPeriod};
use atmega128_tickos::rtos::{Clock, FnTask, Scheduler, Task, Timestamp};
use atmega128_tickos::testing::SimTicker;
use atmega128_tickos::SchedulerError;

#[test]
fn stop_from_inside_a_task_ends_run_forever() {
    let clock = Clock::new();
    let sim = SimTicker::new(&clock);
    let scheduler: Scheduler<'_, _, 4> = Scheduler::new(&clock, &sim);
    let runs = Cell::new(0u32);

    // Period 0: due on every pass, so it stands in for the tick interrupt.
    let ticker = FnTask(|_| sim.advance(1));
    let stopper = FnTask(|_| {
        runs.set(runs.get() + 1);
        if runs.get() == 3 {
            scheduler.stop();
        }
    });
    scheduler.register(&ticker, 0).unwrap();
    scheduler.register(&stopper, 1).unwrap();

    scheduler.start();
    scheduler.run_forever();

    assert_eq!(runs.get(), 3);
    assert!(!scheduler.is_running());
    assert_eq!(clock.now(), 4);
    assert_eq!(sim.sleep_count(), 0);
}

#[test]
fn stop_lets_the_current_pass_finish() {
    let clock = Clock::new();
    let sim = SimTicker::new(&clock);
    let scheduler: Scheduler<'_, _, 4> = Scheduler::new(&clock, &sim);
    let stops = Cell::new(0u32);
    let later = Cell::new(0u32);

    let stopper = FnTask(|_| {
        stops.set(stops.get() + 1);
        scheduler.stop();
    });
    let follower = FnTask(|_| later.set(later.get() + 1));
    scheduler.register(&stopper, 0).unwrap();
    scheduler.register(&follower, 0).unwrap();

    scheduler.start();
    scheduler.run_forever();

    assert_eq!(stops.get(), 1);
    assert_eq!(later.get(), 1);
    assert!(!scheduler.is_running());
}

#[test]
fn low_power_parks_the_cpu_after_every_pass() {
    let clock = Clock::new();
    let sim = SimTicker::new(&clock);
    let awake = TickPeriod::new(Prescaler::Div64, 249);
    let asleep = TickPeriod::new(Prescaler::Div8, 124);
    let config = SchedulerConfig {
        awake_tick: awake,
        sleep_tick: asleep,
    };
    let scheduler: Scheduler<'_, _, 4> = Scheduler::with_config(&clock, &sim, config);
    let runs = Cell::new(0u32);

    let task = FnTask(|_| {
        runs.set(runs.get() + 1);
        match runs.get() {
            1 => scheduler.enter_low_power(),
            5 => scheduler.stop(),
            _ => {}
        }
    });
    scheduler.register(&task, 1).unwrap();
    scheduler.start();
    assert_eq!(sim.armed(), Some(awake));

    sim.advance(1);
    scheduler.run_forever();

    // Each park ends with exactly one tick, which makes the task due again.
    assert_eq!(runs.get(), 5);
    assert_eq!(sim.sleep_count(), 5);
    assert_eq!(clock.now(), 6);
    assert!(scheduler.is_low_power());
    assert_eq!(sim.armed(), Some(asleep));
}

#[test]
fn exit_low_power_restores_awake_tick() {
    let clock = Clock::new();
    let sim = SimTicker::new(&clock);
    let scheduler: Scheduler<'_, _, 4> = Scheduler::new(&clock, &sim);
    let config = scheduler.config();

    scheduler.start();
    scheduler.enter_low_power();
    assert_eq!(sim.armed(), Some(config.sleep_tick));
    scheduler.exit_low_power();
    assert_eq!(sim.armed(), Some(config.awake_tick));
    assert!(!scheduler.is_low_power());
}

struct HookCounter<'s> {
    sleeps: Cell<u32>,
    wakes: Cell<u32>,
    reenter: &'s dyn Fn(),
}

impl Task for HookCounter<'_> {
    fn run(&self, _now: Timestamp) {}

    fn sleep(&self) {
        self.sleeps.set(self.sleeps.get() + 1);
        (self.reenter)();
    }

    fn wake(&self) {
        self.wakes.set(self.wakes.get() + 1);
        (self.reenter)();
    }
}

#[test]
fn power_transitions_ignore_reentry_from_hooks() {
    let clock = Clock::new();
    let sim = SimTicker::new(&clock);
    let scheduler: Scheduler<'_, _, 4> = Scheduler::new(&clock, &sim);
    let reenter = || {
        if scheduler.is_low_power() {
            scheduler.enter_low_power();
        } else {
            scheduler.exit_low_power();
        }
    };
    let counter = HookCounter {
        sleeps: Cell::new(0),
        wakes: Cell::new(0),
        reenter: &reenter,
    };
    scheduler.register(&counter, 10).unwrap();
    scheduler.start();

    scheduler.enter_low_power();
    assert_eq!(counter.sleeps.get(), 1);
    scheduler.exit_low_power();
    assert_eq!(counter.wakes.get(), 1);
}

#[test]
fn task_registered_during_dispatch_runs_in_the_same_pass() {
    let clock = Clock::new();
    let sim = SimTicker::new(&clock);
    let log = RefCell::new(Vec::new());
    let late = FnTask(|now| log.borrow_mut().push(("late", now)));
    let scheduler: Scheduler<'_, _, 4> = Scheduler::new(&clock, &sim);
    let spawner = FnTask(|now| {
        log.borrow_mut().push(("spawner", now));
        if scheduler.len() == 1 {
            scheduler.register(&late, 0).unwrap();
        }
    });
    scheduler.register(&spawner, 5).unwrap();

    sim.advance(5);
    scheduler.dispatch();
    assert_eq!(*log.borrow(), [("spawner", 5), ("late", 5)]);
    assert_eq!(scheduler.len(), 2);
}

#[test]
fn periods_survive_counter_wrap() {
    let clock = Clock::new();
    let sim = SimTicker::new(&clock);
    sim.advance(65_530);
    let scheduler: Scheduler<'_, _, 4> = Scheduler::new(&clock, &sim);
    let seen = RefCell::new(Vec::new());
    let task = FnTask(|now| seen.borrow_mut().push(now));
    scheduler.register(&task, 10).unwrap();

    for _ in 0..20 {
        sim.advance(1);
        scheduler.dispatch();
    }
    assert_eq!(*seen.borrow(), [4, 14]);
}

#[test]
fn full_registry_reports_capacity() {
    let clock = Clock::new();
    let sim = SimTicker::new(&clock);
    let scheduler: Scheduler<'_, _, 1> = Scheduler::new(&clock, &sim);
    let task = FnTask(|_| {});
    assert!(scheduler.is_empty());
    scheduler.register(&task, 1).unwrap();

    let err = scheduler.register(&task, 1).unwrap_err();
    assert_eq!(err, SchedulerError::CapacityExceeded { capacity: 1 });
    assert_eq!(err.to_string(), "task registry full (1 slots)");
}

proptest::proptest! {
    /// One tick per pass: a task fires exactly at every multiple of its period.
    #[test]
    fn fires_once_per_period(period in 1u16..100, ticks in 0u16..1_000) {
        let clock = Clock::new();
        let sim = SimTicker::new(&clock);
        let scheduler: Scheduler<'_, _, 2> = Scheduler::new(&clock, &sim);
        let seen = RefCell::new(Vec::new());
        let task = FnTask(|now| seen.borrow_mut().push(now));
        scheduler.register(&task, period).unwrap();

        for _ in 0..ticks {
            sim.advance(1);
            scheduler.dispatch();
        }

        let seen = seen.borrow();
        assert_eq!(seen.len(), usize::from(ticks / period));
        for (i, now) in seen.iter().enumerate() {
            assert_eq!(usize::from(*now), (i + 1) * usize::from(period));
        }
    }

    /// With irregular gaps between passes a task is never early and never
    /// runs twice for one timestamp.
    #[test]
    fn never_runs_early(period in 1u16..50, steps in proptest::collection::vec(0u16..20, 1..200)) {
        let clock = Clock::new();
        let sim = SimTicker::new(&clock);
        let scheduler: Scheduler<'_, _, 2> = Scheduler::new(&clock, &sim);
        let seen = RefCell::new(Vec::new());
        let task = FnTask(|now| seen.borrow_mut().push(now));
        scheduler.register(&task, period).unwrap();

        for step in steps {
            sim.advance(step);
            scheduler.dispatch();
        }

        let mut last = 0;
        for &now in seen.borrow().iter() {
            assert!(now - last >= period, "ran at {} after {}", now, last);
            last = now;
        }
    }
}
