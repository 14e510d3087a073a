//! Debounced digital input.

use core::cell::{Cell, RefCell};

use embedded_hal::digital::v2::InputPin;

use crate::config::DEBOUNCE_DEPTH;
use crate::hal::{DriveMode, SetDriveMode};
use crate::rtos::{Task, Timestamp};

/// Notification raised on a settled transition. Runs inside the dispatch
/// pass and must not block.
pub type Callback<'a> = &'a dyn Fn();

/// Debounced logical state of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputState {
    /// Not asserted
    Inactive,
    /// Asserted
    Active,
}

/// Electrical setup of a debounced input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DebounceConfig {
    /// Pin level that means [`InputState::Active`]
    pub active_level: bool,
    /// Drive mode applied on start and after wake
    pub awake_drive: DriveMode,
}

impl Default for DebounceConfig {
    /// Active-low push button with pull-up
    fn default() -> Self {
        Self {
            active_level: false,
            awake_drive: DriveMode::PullUp,
        }
    }
}

/// Digital input debounced by a two-sample majority filter.
///
/// Register it with the scheduler every [`DEBOUNCE_PERIOD_MS`](crate::config::DEBOUNCE_PERIOD_MS).
/// A transition commits when the last two samples agree on a state that
/// differs from the settled one, so one stray sample never gets through.
pub struct DebounceInput<'a, P> {
    pin: RefCell<P>,
    config: DebounceConfig,
    settled: Cell<InputState>,
    history: Cell<[InputState; DEBOUNCE_DEPTH]>,
    index: Cell<usize>,
    awake: Cell<bool>,
    active_during_sleep: Cell<bool>,
    on_activate: Cell<Option<Callback<'a>>>,
    on_deactivate: Cell<Option<Callback<'a>>>,
}

impl<'a, P> DebounceInput<'a, P>
where
    P: InputPin + SetDriveMode,
{
    /// Active-low pulled-up input
    pub fn new(pin: P) -> Self {
        Self::with_config(pin, DebounceConfig::default())
    }

    /// Input with explicit polarity and drive
    pub fn with_config(pin: P, config: DebounceConfig) -> Self {
        Self {
            pin: RefCell::new(pin),
            config,
            settled: Cell::new(InputState::Inactive),
            history: Cell::new([InputState::Inactive; DEBOUNCE_DEPTH]),
            index: Cell::new(0),
            awake: Cell::new(true),
            active_during_sleep: Cell::new(false),
            on_activate: Cell::new(None),
            on_deactivate: Cell::new(None),
        }
    }

    /// Configure the pin and install the transition callbacks.
    ///
    /// With `active_during_sleep` unset the input is parked in high
    /// impedance and stops sampling while the scheduler is in low-power mode.
    pub fn start(
        &self,
        on_activate: Option<Callback<'a>>,
        on_deactivate: Option<Callback<'a>>,
        active_during_sleep: bool,
    ) {
        self.pin.borrow_mut().set_drive_mode(self.config.awake_drive);
        self.active_during_sleep.set(active_during_sleep);
        self.awake.set(true);
        self.on_activate.set(on_activate);
        self.on_deactivate.set(on_deactivate);
    }

    /// Settled state
    pub fn read(&self) -> InputState {
        self.settled.get()
    }

    /// `true` when the settled state is [`InputState::Active`]
    pub fn is_active(&self) -> bool {
        self.settled.get() == InputState::Active
    }

    fn sample(&self) -> Option<InputState> {
        match self.pin.borrow().is_high() {
            Ok(high) if high == self.config.active_level => Some(InputState::Active),
            Ok(_) => Some(InputState::Inactive),
            Err(_) => {
                warn!("debounce input read failed, sample skipped");
                None
            }
        }
    }

    fn commit(&self, state: InputState) {
        self.settled.set(state);
        debug!("debounced input settled {}", state);
        let callback = match state {
            InputState::Active => self.on_activate.get(),
            InputState::Inactive => self.on_deactivate.get(),
        };
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl<P> Task for DebounceInput<'_, P>
where
    P: InputPin + SetDriveMode,
{
    fn run(&self, _now: Timestamp) {
        if !self.awake.get() {
            return;
        }
        let Some(reading) = self.sample() else {
            return;
        };

        let mut history = self.history.get();
        let index = self.index.get();
        if let Some(slot) = history.get_mut(index) {
            *slot = reading;
        }
        self.history.set(history);
        self.index.set((index + 1) % DEBOUNCE_DEPTH);

        if reading != self.settled.get() {
            let agreeing = history.iter().filter(|&&h| h == reading).count();
            if agreeing >= DEBOUNCE_DEPTH {
                self.commit(reading);
            }
        }
    }

    fn sleep(&self) {
        if !self.active_during_sleep.get() {
            self.awake.set(false);
            self.pin.borrow_mut().set_drive_mode(DriveMode::HighImpedance);
        }
    }

    fn wake(&self) {
        self.awake.set(true);
        self.pin.borrow_mut().set_drive_mode(self.config.awake_drive);
    }
}
