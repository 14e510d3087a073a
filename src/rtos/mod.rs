//! Tick clock, task interface and cooperative scheduler.

pub mod clock;
pub mod scheduler;
pub mod task;

pub use clock::{Clock, Duration, Timestamp};
pub use scheduler::{Scheduler, TaskBuilder};
pub use task::{FnTask, Task, TaskId};
