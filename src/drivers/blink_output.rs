//! Multi-mode output sequencer.

use core::cell::{Cell, RefCell};

use embedded_hal::digital::v2::OutputPin;

use crate::config::MAX_PHASE_MS;
use crate::hal::{DriveMode, SetDriveMode};
use crate::rtos::{Clock, Duration, Task, Timestamp};

/// Output sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlinkMode {
    /// Held off
    Off,
    /// Off phase of a blink cycle
    BlinkOff,
    /// On phase of a blink cycle
    BlinkOn,
    /// Single on pulse, then `Off`
    Chirp,
    /// Held on
    On,
}

/// Electrical setup of a blink output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlinkConfig {
    /// Pin level that turns the load on
    pub active_high: bool,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self { active_high: true }
    }
}

/// On/off/blink/chirp sequencer for one output pin.
///
/// Register it with the scheduler every
/// [`BLINK_PERIOD_MS`](crate::config::BLINK_PERIOD_MS). Each dispatch
/// re-drives the pin with the level of the current mode.
pub struct BlinkOutput<'a, P> {
    pin: RefCell<P>,
    clock: &'a Clock,
    config: BlinkConfig,
    mode: Cell<BlinkMode>,
    on_time: Cell<Duration>,
    off_time: Cell<Duration>,
    phase_start: Cell<Timestamp>,
    output: Cell<bool>,
    awake: Cell<bool>,
    active_during_sleep: Cell<bool>,
}

impl<'a, P> BlinkOutput<'a, P>
where
    P: OutputPin + SetDriveMode,
{
    /// Active-high output, initially off
    pub fn new(pin: P, clock: &'a Clock) -> Self {
        Self::with_config(pin, clock, BlinkConfig::default())
    }

    /// Output with explicit polarity, initially off
    pub fn with_config(pin: P, clock: &'a Clock, config: BlinkConfig) -> Self {
        Self {
            pin: RefCell::new(pin),
            clock,
            config,
            mode: Cell::new(BlinkMode::Off),
            on_time: Cell::new(0),
            off_time: Cell::new(0),
            phase_start: Cell::new(0),
            output: Cell::new(false),
            awake: Cell::new(true),
            active_during_sleep: Cell::new(false),
        }
    }

    /// Enable the output driver.
    ///
    /// With `active_during_sleep` unset the pin is parked in high impedance
    /// while the scheduler is in low-power mode.
    pub fn start(&self, active_during_sleep: bool) {
        self.active_during_sleep.set(active_during_sleep);
        self.awake.set(true);
        self.pin.borrow_mut().set_drive_mode(DriveMode::Strong);
    }

    /// Hold the output on
    pub fn turn_on(&self) {
        self.set_mode(BlinkMode::On);
        self.drive(true);
    }

    /// Hold the output off
    pub fn turn_off(&self) {
        self.set_mode(BlinkMode::Off);
        self.drive(false);
    }

    /// Blink with the given on/off times in milliseconds, each capped at
    /// [`MAX_PHASE_MS`]. The off phase counts as already elapsed, so the
    /// output turns on at the first dispatch after this call.
    pub fn start_pulsing(&self, on_ms: Duration, off_ms: Duration) {
        let off = off_ms.min(MAX_PHASE_MS);
        self.on_time.set(on_ms.min(MAX_PHASE_MS));
        self.off_time.set(off);
        self.phase_start.set(self.clock.now().wrapping_sub(off));
        self.set_mode(BlinkMode::BlinkOff);
        self.drive(false);
    }

    /// Single pulse of `on_ms` milliseconds (capped at [`MAX_PHASE_MS`]),
    /// starting now
    pub fn start_one_shot(&self, on_ms: Duration) {
        self.on_time.set(on_ms.min(MAX_PHASE_MS));
        self.off_time.set(0);
        self.phase_start.set(self.clock.now());
        self.set_mode(BlinkMode::Chirp);
        self.drive(true);
    }

    /// Whether the load is currently driven on
    pub fn read_output(&self) -> bool {
        self.output.get()
    }

    /// Current mode
    pub fn mode(&self) -> BlinkMode {
        self.mode.get()
    }

    /// Effective on time after clamping
    pub fn on_time(&self) -> Duration {
        self.on_time.get()
    }

    /// Effective off time after clamping
    pub fn off_time(&self) -> Duration {
        self.off_time.get()
    }

    fn set_mode(&self, mode: BlinkMode) {
        if self.mode.replace(mode) != mode {
            trace!("blink mode {}", mode);
        }
    }

    // A parked pin is left alone: on AVR a write to an input enables its
    // pull-up. `wake` re-asserts the recorded level.
    fn drive(&self, on: bool) {
        self.output.set(on);
        if self.awake.get() {
            self.write_pin(on);
        }
    }

    fn write_pin(&self, on: bool) {
        let level = on == self.config.active_high;
        let mut pin = self.pin.borrow_mut();
        let result = if level { pin.set_high() } else { pin.set_low() };
        if result.is_err() {
            warn!("blink output write failed");
        }
    }

    fn next_phase(&self, now: Timestamp, mode: BlinkMode) {
        self.phase_start.set(now);
        self.set_mode(mode);
    }
}

impl<P> Task for BlinkOutput<'_, P>
where
    P: OutputPin + SetDriveMode,
{
    fn run(&self, now: Timestamp) {
        if !self.awake.get() {
            return;
        }
        let delta = now.wrapping_sub(self.phase_start.get());
        let on = match self.mode.get() {
            BlinkMode::BlinkOn if delta > self.on_time.get() => {
                self.next_phase(now, BlinkMode::BlinkOff);
                false
            }
            BlinkMode::BlinkOn => true,
            BlinkMode::BlinkOff if delta > self.off_time.get() => {
                self.next_phase(now, BlinkMode::BlinkOn);
                true
            }
            BlinkMode::BlinkOff => false,
            BlinkMode::Chirp if delta > self.on_time.get() => {
                self.next_phase(now, BlinkMode::Off);
                false
            }
            BlinkMode::Chirp => true,
            BlinkMode::On => true,
            BlinkMode::Off => false,
        };
        self.drive(on);
    }

    fn sleep(&self) {
        if !self.active_during_sleep.get() {
            self.awake.set(false);
            self.pin.borrow_mut().set_drive_mode(DriveMode::HighImpedance);
        }
    }

    fn wake(&self) {
        self.awake.set(true);
        self.pin.borrow_mut().set_drive_mode(DriveMode::Strong);
        self.write_pin(self.output.get());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::pin::{Mock as PinMock, State, Transaction};

    #[test]
    fn chirp_writes_exact_sequence() {
        let clock = Clock::new();
        let expectations = [
            Transaction::set(State::High),
            Transaction::set(State::High),
            Transaction::set(State::High),
            Transaction::set(State::Low),
            Transaction::set(State::Low),
        ];
        let mut pin = PinMock::new(&expectations);
        let led = BlinkOutput::new(pin.clone(), &clock);

        led.start_one_shot(2);
        led.run(1);
        led.run(2);
        led.run(3);
        assert_eq!(led.mode(), BlinkMode::Off);
        led.run(4);

        pin.done();
    }

    #[test]
    fn active_low_inverts_pin_level() {
        let clock = Clock::new();
        let expectations = [Transaction::set(State::Low), Transaction::set(State::High)];
        let mut pin = PinMock::new(&expectations);
        let led = BlinkOutput::with_config(pin.clone(), &clock, BlinkConfig { active_high: false });

        led.turn_on();
        assert!(led.read_output());
        led.turn_off();
        assert!(!led.read_output());

        pin.done();
    }

    #[test]
    fn asleep_output_is_not_driven() {
        let clock = Clock::new();
        let expectations = [Transaction::set(State::High)];
        let mut pin = PinMock::new(&expectations);
        let led = BlinkOutput::new(pin.clone(), &clock);

        led.start(false);
        led.turn_on();
        led.sleep();
        led.run(1);
        led.turn_off();
        led.run(2);

        pin.done();
    }
}
