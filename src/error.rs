//! Scheduler errors

use thiserror::Error;

/// Errors reported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// Every task slot is already taken.
    #[error("task registry full ({capacity} slots)")]
    CapacityExceeded {
        /// Number of slots in the registry
        capacity: usize,
    },
}
