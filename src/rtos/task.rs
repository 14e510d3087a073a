//! Periodic task interface.

use super::clock::{Duration, Timestamp};

/// Work the scheduler dispatches periodically.
///
/// Every method runs to completion on the foreground loop and must not
/// block. The power hooks default to doing nothing.
pub trait Task {
    /// Periodic work; `now` is the timestamp shared by the whole dispatch pass
    fn run(&self, now: Timestamp);

    /// Called once when the scheduler enters low-power mode
    fn sleep(&self) {}

    /// Called once when the scheduler leaves low-power mode
    fn wake(&self) {}
}

/// Plain function or closure as a task without power hooks.
pub struct FnTask<F>(pub F);

impl<F: Fn(Timestamp)> Task for FnTask<F> {
    fn run(&self, now: Timestamp) {
        (self.0)(now)
    }
}

/// Registration order index of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// Position in the dispatch order, starting at zero
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One registry slot. `last_run` is the only field that changes after
/// registration.
#[derive(Clone, Copy)]
pub(crate) struct TaskSlot<'a> {
    pub(crate) task: &'a dyn Task,
    pub(crate) period: Duration,
    pub(crate) last_run: Timestamp,
}

impl<'a> TaskSlot<'a> {
    pub(crate) fn is_due(&self, now: Timestamp) -> bool {
        now.wrapping_sub(self.last_run) >= self.period
    }
}
