//! Cooperative periodic scheduler.
//!
//! Tasks are dispatched in registration order from a single foreground loop.
//! Every task in one pass sees the same timestamp. Nothing preempts a task;
//! the loop only parks the CPU after a full pass while in low-power mode.

use core::array;
use core::cell::{Cell, RefCell};

use super::clock::{Clock, Duration, Timestamp};
use super::task::{Task, TaskId, TaskSlot};
use crate::config::{SchedulerConfig, MAX_TASKS};
use crate::error::SchedulerError;
use crate::hal::{LowPowerCpu, TickPeriod, TickTimer};

/// Fixed-capacity task scheduler.
///
/// All operations take `&self`, so tasks may hold a reference to the
/// scheduler (for example to call [`stop`](Self::stop) or
/// [`enter_low_power`](Self::enter_low_power) from inside `run`).
pub struct Scheduler<'a, H, const N: usize = { MAX_TASKS }> {
    clock: &'a Clock,
    hw: RefCell<H>,
    config: SchedulerConfig,
    slots: [Cell<Option<TaskSlot<'a>>>; N],
    len: Cell<usize>,
    active: Cell<bool>,
    low_power: Cell<bool>,
}

impl<'a, H, const N: usize> Scheduler<'a, H, N>
where
    H: TickTimer + LowPowerCpu,
{
    /// Scheduler with the default tick programming
    pub fn new(clock: &'a Clock, hw: H) -> Self {
        Self::with_config(clock, hw, SchedulerConfig::default())
    }

    /// Scheduler with explicit tick programming
    pub fn with_config(clock: &'a Clock, hw: H, config: SchedulerConfig) -> Self {
        Self {
            clock,
            hw: RefCell::new(hw),
            config,
            slots: array::from_fn(|_| Cell::new(None)),
            len: Cell::new(0),
            active: Cell::new(false),
            low_power: Cell::new(false),
        }
    }

    /// Arm the periodic tick and mark the scheduler active and awake.
    ///
    /// Call before enabling interrupts globally.
    pub fn start(&self) {
        self.hw.borrow_mut().arm_periodic_tick(self.config.awake_tick);
        self.active.set(true);
        self.low_power.set(false);
        info!("scheduler started, {} tasks", self.len.get());
    }

    /// Append `task` to the dispatch order.
    ///
    /// The task first becomes due one full `period` after registration.
    pub fn register(&self, task: &'a dyn Task, period: Duration) -> Result<TaskId, SchedulerError> {
        let index = self.len.get();
        let Some(cell) = self.slots.get(index) else {
            warn!("task registry full ({} slots)", N);
            return Err(SchedulerError::CapacityExceeded { capacity: N });
        };

        cell.set(Some(TaskSlot {
            task,
            period,
            last_run: self.clock.now(),
        }));
        self.len.set(index + 1);
        debug!("task {} registered, period {} ms", index, period);
        Ok(TaskId(index))
    }

    /// Run one dispatch pass and return the timestamp it used.
    ///
    /// A task registered during the pass is visited in the same pass.
    pub fn dispatch(&self) -> Timestamp {
        let now = self.clock.now();
        let mut index = 0;
        while let Some(slot) = self.slot(index) {
            if slot.is_due(now) {
                slot.task.run(now);
                self.set_last_run(index, now);
            }
            index += 1;
        }
        now
    }

    /// Dispatch until [`stop`](Self::stop) is called.
    ///
    /// While in low-power mode the CPU is parked after every pass until the
    /// next tick interrupt.
    pub fn run_forever(&self) {
        self.active.set(true);
        while self.active.get() {
            self.dispatch();
            if self.low_power.get() {
                self.hw.borrow_mut().enter_low_power_cpu_state();
            }
        }
        info!("scheduler stopped");
    }

    /// Make `run_forever` return after the current pass
    pub fn stop(&self) {
        self.active.set(false);
    }

    /// Switch the tick to its sleep programming and call every task's
    /// `sleep` hook. No-op when already in low-power mode.
    pub fn enter_low_power(&self) {
        if self.low_power.get() {
            return;
        }
        critical_section::with(|_| {
            self.low_power.set(true);
            self.reprogram_tick(self.config.sleep_tick);
            self.for_each_task(|task| task.sleep());
        });
        info!("entered low-power mode");
    }

    /// Restore the awake tick programming and call every task's `wake` hook.
    /// No-op when not in low-power mode.
    pub fn exit_low_power(&self) {
        if !self.low_power.get() {
            return;
        }
        critical_section::with(|_| {
            self.reprogram_tick(self.config.awake_tick);
            self.low_power.set(false);
            self.for_each_task(|task| task.wake());
        });
        info!("left low-power mode");
    }

    /// Whether `run_forever` keeps looping
    pub fn is_running(&self) -> bool {
        self.active.get()
    }

    /// Whether low-power mode is active
    pub fn is_low_power(&self) -> bool {
        self.low_power.get()
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        self.len.get()
    }

    /// `true` when no task is registered
    pub fn is_empty(&self) -> bool {
        self.len.get() == 0
    }

    /// Maximum number of tasks
    pub fn capacity(&self) -> usize {
        N
    }

    /// Time base shared with the tick interrupt
    pub fn clock(&self) -> &'a Clock {
        self.clock
    }

    /// Tick programming in use
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    fn slot(&self, index: usize) -> Option<TaskSlot<'a>> {
        if index < self.len.get() {
            self.slots.get(index).and_then(Cell::get)
        } else {
            None
        }
    }

    fn set_last_run(&self, index: usize, now: Timestamp) {
        if let Some(cell) = self.slots.get(index) {
            if let Some(slot) = cell.get() {
                cell.set(Some(TaskSlot {
                    last_run: now,
                    ..slot
                }));
            }
        }
    }

    fn for_each_task(&self, mut f: impl FnMut(&'a dyn Task)) {
        let mut index = 0;
        while let Some(slot) = self.slot(index) {
            f(slot.task);
            index += 1;
        }
    }

    fn reprogram_tick(&self, period: TickPeriod) {
        let mut hw = self.hw.borrow_mut();
        hw.disarm_tick();
        hw.arm_periodic_tick(period);
    }
}

/// Builder-style registration.
///
/// ```
/// use atmega128_tickos::rtos::{Clock, FnTask, Scheduler, TaskBuilder};
/// use atmega128_tickos::testing::SimTicker;
///
/// let clock = Clock::new();
/// let sim = SimTicker::new(&clock);
/// let scheduler: Scheduler<'_, _, 4> = Scheduler::new(&clock, &sim);
/// let heartbeat = FnTask(|_now| {});
/// let id = TaskBuilder::new(&heartbeat).period(500).build(&scheduler).unwrap();
/// assert_eq!(id.index(), 0);
/// ```
pub struct TaskBuilder<'a> {
    task: &'a dyn Task,
    period: Duration,
}

impl<'a> TaskBuilder<'a> {
    /// Start building a registration for `task` (period defaults to 1000 ms)
    pub fn new(task: &'a dyn Task) -> Self {
        Self { task, period: 1000 }
    }

    /// Dispatch period in milliseconds
    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Register with `scheduler`
    pub fn build<H, const N: usize>(self, scheduler: &Scheduler<'a, H, N>) -> Result<TaskId, SchedulerError>
    where
        H: TickTimer + LowPowerCpu,
    {
        scheduler.register(self.task, self.period)
    }
}
