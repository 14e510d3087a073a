//! Simulated hardware for host builds and tests.
//!
//! Everything here is `no_std` and allocation-free: state lives in `Cell`s
//! owned by the test, and the simulated peripherals borrow it.

use core::cell::Cell;

use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::hal::{DriveMode, LowPowerCpu, SetDriveMode, TickPeriod, TickTimer};
use crate::rtos::Clock;

/// Tick source and CPU stand-in.
///
/// [`advance`](Self::advance) plays the role of the tick interrupt. Parking
/// the CPU counts as exactly one tick, the way a real tick interrupt ends
/// the sleep.
pub struct SimTicker<'a> {
    clock: &'a Clock,
    armed: Cell<Option<TickPeriod>>,
    arm_count: Cell<u32>,
    disarm_count: Cell<u32>,
    sleep_count: Cell<u32>,
}

impl<'a> SimTicker<'a> {
    /// Unarmed ticker driving `clock`
    pub const fn new(clock: &'a Clock) -> Self {
        Self {
            clock,
            armed: Cell::new(None),
            arm_count: Cell::new(0),
            disarm_count: Cell::new(0),
            sleep_count: Cell::new(0),
        }
    }

    /// Deliver `ticks` tick interrupts
    pub fn advance(&self, ticks: u16) {
        for _ in 0..ticks {
            self.clock.tick();
        }
    }

    /// Current tick programming, `None` while disarmed
    pub fn armed(&self) -> Option<TickPeriod> {
        self.armed.get()
    }

    /// Number of `arm_periodic_tick` calls
    pub fn arm_count(&self) -> u32 {
        self.arm_count.get()
    }

    /// Number of `disarm_tick` calls
    pub fn disarm_count(&self) -> u32 {
        self.disarm_count.get()
    }

    /// Number of times the CPU was parked
    pub fn sleep_count(&self) -> u32 {
        self.sleep_count.get()
    }

    fn arm(&self, period: TickPeriod) {
        self.armed.set(Some(period));
        self.arm_count.set(self.arm_count.get() + 1);
    }

    fn disarm(&self) {
        self.armed.set(None);
        self.disarm_count.set(self.disarm_count.get() + 1);
    }

    fn park(&self) {
        self.sleep_count.set(self.sleep_count.get() + 1);
        self.clock.tick();
    }
}

impl TickTimer for SimTicker<'_> {
    fn arm_periodic_tick(&mut self, period: TickPeriod) {
        self.arm(period);
    }

    fn disarm_tick(&mut self) {
        self.disarm();
    }
}

impl LowPowerCpu for SimTicker<'_> {
    fn enter_low_power_cpu_state(&mut self) {
        self.park();
    }
}

impl TickTimer for &SimTicker<'_> {
    fn arm_periodic_tick(&mut self, period: TickPeriod) {
        self.arm(period);
    }

    fn disarm_tick(&mut self) {
        self.disarm();
    }
}

impl LowPowerCpu for &SimTicker<'_> {
    fn enter_low_power_cpu_state(&mut self) {
        self.park();
    }
}

/// Error returned by a [`SimPin`] whose line is set to fail reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

/// Electrical state of one simulated pin, shared between the test and the
/// [`SimPin`] handed to a driver.
pub struct SimLine {
    level: Cell<bool>,
    drive: Cell<Option<DriveMode>>,
    drive_changes: Cell<u32>,
    writes: Cell<u32>,
    fail_reads: Cell<bool>,
}

impl SimLine {
    /// Line at `level`, drive mode unconfigured
    pub const fn new(level: bool) -> Self {
        Self {
            level: Cell::new(level),
            drive: Cell::new(None),
            drive_changes: Cell::new(0),
            writes: Cell::new(0),
            fail_reads: Cell::new(false),
        }
    }

    /// Pin handle for a driver
    pub fn pin(&self) -> SimPin<'_> {
        SimPin { line: self }
    }

    /// Force the level seen by reads (an external signal)
    pub fn set_level(&self, level: bool) {
        self.level.set(level);
    }

    /// Current level
    pub fn level(&self) -> bool {
        self.level.get()
    }

    /// Last applied drive mode
    pub fn drive(&self) -> Option<DriveMode> {
        self.drive.get()
    }

    /// Number of `set_drive_mode` calls
    pub fn drive_changes(&self) -> u32 {
        self.drive_changes.get()
    }

    /// Number of level writes
    pub fn writes(&self) -> u32 {
        self.writes.get()
    }

    /// Make subsequent reads fail (or succeed again)
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }
}

/// Pin handle over a [`SimLine`].
pub struct SimPin<'a> {
    line: &'a SimLine,
}

impl InputPin for SimPin<'_> {
    type Error = SimPinError;

    fn is_high(&self) -> Result<bool, Self::Error> {
        if self.line.fail_reads.get() {
            return Err(SimPinError);
        }
        Ok(self.line.level.get())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl OutputPin for SimPin<'_> {
    type Error = SimPinError;

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }
}

impl SetDriveMode for SimPin<'_> {
    fn set_drive_mode(&mut self, mode: DriveMode) {
        self.line.drive.set(Some(mode));
        self.line.drive_changes.set(self.line.drive_changes.get() + 1);
    }
}

impl SimPin<'_> {
    fn write(&self, level: bool) {
        self.line.level.set(level);
        self.line.writes.set(self.line.writes.get() + 1);
    }
}

// The mock has no notion of drive modes; unit tests only check its levels.
#[cfg(test)]
impl SetDriveMode for embedded_hal_mock::pin::Mock {
    fn set_drive_mode(&mut self, _mode: DriveMode) {}
}
