//! Configuration constants for the tick scheduler and its drivers

use crate::hal::timer::TickPeriod;

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// Length of one scheduler tick in milliseconds
pub const TICK_MS: u16 = 1;

/// Default number of task slots in a scheduler
pub const MAX_TASKS: usize = 16;

/// Debounced input sampling period in milliseconds
pub const DEBOUNCE_PERIOD_MS: u16 = 10;

/// Number of agreeing samples needed to commit a debounced transition
pub const DEBOUNCE_DEPTH: usize = 2;

/// Blink output update period in milliseconds
pub const BLINK_PERIOD_MS: u16 = 1;

/// Upper bound for any blink on/off phase in milliseconds
pub const MAX_PHASE_MS: u16 = 10_000;

/// Runtime scheduler configuration.
///
/// The tick must fire once per [`TICK_MS`] in both power modes; the two
/// periods exist because the timer may run from a different clock source
/// while the CPU sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulerConfig {
    /// Tick programming used while awake
    pub awake_tick: TickPeriod,
    /// Tick programming used while in low-power mode
    pub sleep_tick: TickPeriod,
}

impl SchedulerConfig {
    /// Same tick programming in both power modes
    pub const fn uniform(tick: TickPeriod) -> Self {
        Self {
            awake_tick: tick,
            sleep_tick: tick,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::uniform(TickPeriod::from_cpu_freq(CPU_FREQ_HZ))
    }
}
