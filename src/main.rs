#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]

use core::cell::Cell;

use avr_device::atmega128a::Peripherals;
use panic_halt as _;

use atmega128_tickos::config::{BLINK_PERIOD_MS, DEBOUNCE_PERIOD_MS};
use atmega128_tickos::drivers::{BlinkOutput, DebounceInput};
use atmega128_tickos::hal::gpio::board::{BTN0, LED0, LED1};
use atmega128_tickos::hal::power::Power;
use atmega128_tickos::hal::timer::Timer0Tick;
use atmega128_tickos::hal::{LowPowerCpu, TickPeriod, TickTimer};
use atmega128_tickos::rtos::{Clock, Duration, FnTask, Scheduler, Task, Timestamp};

/// Inactivity before the board drops into low-power mode
const IDLE_TIMEOUT_MS: u16 = 5_000;
const IDLE_CHECK_MS: u16 = 100;

static CLOCK: Clock = Clock::new();

#[avr_device::interrupt(atmega128a)]
fn TIMER0_COMP() {
    CLOCK.tick();
}

// Timer0 and the sleep controller behind the scheduler's one hardware slot.
struct Board {
    tick: Timer0Tick,
    power: Power,
}

impl TickTimer for Board {
    fn arm_periodic_tick(&mut self, period: TickPeriod) {
        self.tick.arm_periodic_tick(period);
    }

    fn disarm_tick(&mut self) {
        self.tick.disarm_tick();
    }
}

impl LowPowerCpu for Board {
    fn enter_low_power_cpu_state(&mut self) {
        self.power.enter_low_power_cpu_state();
    }
}

#[allow(clippy::empty_loop)]
fn halt() -> ! {
    loop {}
}

#[avr_device::entry]
fn main() -> ! {
    let Some(dp) = Peripherals::take() else {
        halt();
    };

    let board = Board {
        tick: Timer0Tick::new(dp.TC0),
        power: Power::new(dp.CPU),
    };
    let scheduler: Scheduler<'_, Board> = Scheduler::new(&CLOCK, board);

    // Pins are only created here, after the peripherals were taken.
    let status = BlinkOutput::new(unsafe { LED0::steal() }, &CLOCK);
    let activity = BlinkOutput::new(unsafe { LED1::steal() }, &CLOCK);
    let last_activity: Cell<Timestamp> = Cell::new(0);

    let on_press = || {
        last_activity.set(CLOCK.now());
        scheduler.exit_low_power();
        activity.start_one_shot(50);
    };
    let on_release = || last_activity.set(CLOCK.now());
    let button = DebounceInput::new(unsafe { BTN0::steal() });

    let idle = FnTask(|now: Timestamp| {
        if now.wrapping_sub(last_activity.get()) > IDLE_TIMEOUT_MS {
            scheduler.enter_low_power();
        }
    });

    status.start(false);
    activity.start(false);
    button.start(Some(&on_press), Some(&on_release), true);
    status.start_pulsing(100, 900);

    let tasks: [(&dyn Task, Duration); 4] = [
        (&button, DEBOUNCE_PERIOD_MS),
        (&status, BLINK_PERIOD_MS),
        (&activity, BLINK_PERIOD_MS),
        (&idle, IDLE_CHECK_MS),
    ];
    for (task, period) in tasks {
        if scheduler.register(task, period).is_err() {
            halt();
        }
    }

    scheduler.start();
    unsafe { avr_device::interrupt::enable() };

    scheduler.run_forever();
    halt()
}
