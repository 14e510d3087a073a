//! Periodic tick source.
//!
//! The scheduler only needs two things from a hardware timer: arm a periodic
//! interrupt and disarm it again. [`TickPeriod`] carries the raw programming
//! (prescaler and compare value) so a power transition can switch clocking
//! without the core knowing the register layout.

use crate::config::TICK_MS;

/// Timer0 clock select values (CS02:0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Prescaler {
    /// Timer stopped
    Stop = 0,
    /// clk / 1
    Direct = 1,
    /// clk / 8
    Div8 = 2,
    /// clk / 32
    Div32 = 3,
    /// clk / 64
    Div64 = 4,
    /// clk / 128
    Div128 = 5,
    /// clk / 256
    Div256 = 6,
    /// clk / 1024
    Div1024 = 7,
}

impl Prescaler {
    const RUNNING: [Prescaler; 7] = [
        Prescaler::Direct,
        Prescaler::Div8,
        Prescaler::Div32,
        Prescaler::Div64,
        Prescaler::Div128,
        Prescaler::Div256,
        Prescaler::Div1024,
    ];

    /// Clock divisor, `0` when stopped
    pub const fn divisor(self) -> u32 {
        match self {
            Prescaler::Stop => 0,
            Prescaler::Direct => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div32 => 32,
            Prescaler::Div64 => 64,
            Prescaler::Div128 => 128,
            Prescaler::Div256 => 256,
            Prescaler::Div1024 => 1024,
        }
    }
}

/// Hardware programming for one periodic tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickPeriod {
    /// Timer clock select
    pub prescaler: Prescaler,
    /// Compare-match value; the timer counts `compare + 1` steps per tick
    pub compare: u8,
}

impl TickPeriod {
    /// Explicit prescaler and compare value
    pub const fn new(prescaler: Prescaler, compare: u8) -> Self {
        Self { prescaler, compare }
    }

    /// Smallest prescaler that fits one [`TICK_MS`] tick into the 8-bit
    /// compare register at `cpu_hz`. Saturates at `/1024` with compare 255.
    pub const fn from_cpu_freq(cpu_hz: u32) -> Self {
        let cycles = cpu_hz / 1000 * TICK_MS as u32;
        let mut i = 0;
        while i < Prescaler::RUNNING.len() {
            let prescaler = Prescaler::RUNNING[i];
            let counts = cycles / prescaler.divisor();
            if counts >= 1 && counts <= 256 {
                return Self::new(prescaler, (counts - 1) as u8);
            }
            i += 1;
        }
        Self::new(Prescaler::Div1024, u8::MAX)
    }
}

/// A periodic hardware tick whose interrupt handler calls
/// [`Clock::tick`](crate::rtos::Clock::tick).
pub trait TickTimer {
    /// Start (or restart) the periodic interrupt
    fn arm_periodic_tick(&mut self, period: TickPeriod);

    /// Stop the periodic interrupt
    fn disarm_tick(&mut self);
}

#[cfg(all(target_arch = "avr", feature = "atmega128"))]
mod atmega128 {
    use super::{TickPeriod, TickTimer};
    use avr_device::atmega128a::TC0;

    const CS_MASK: u8 = 0x07;
    const WGM01: u8 = 1 << 3;
    const OCIE0: u8 = 1 << 1;

    /// Timer/Counter0 in CTC mode raising `TIMER0_COMP` once per tick.
    pub struct Timer0Tick {
        tc0: TC0,
    }

    impl Timer0Tick {
        /// Take ownership of TC0; the timer stays stopped until armed
        pub fn new(tc0: TC0) -> Self {
            tc0.tccr0.write(|w| unsafe { w.bits(0) });
            Self { tc0 }
        }
    }

    impl TickTimer for Timer0Tick {
        fn arm_periodic_tick(&mut self, period: TickPeriod) {
            self.tc0.tccr0.write(|w| unsafe { w.bits(0) });
            self.tc0.tcnt0.write(|w| unsafe { w.bits(0) });
            self.tc0.ocr0.write(|w| unsafe { w.bits(period.compare) });
            self.tc0.timsk.modify(|r, w| unsafe { w.bits(r.bits() | OCIE0) });
            self.tc0
                .tccr0
                .write(|w| unsafe { w.bits(WGM01 | (period.prescaler as u8 & CS_MASK)) });
        }

        fn disarm_tick(&mut self) {
            self.tc0.tccr0.modify(|r, w| unsafe { w.bits(r.bits() & !CS_MASK) });
            self.tc0.timsk.modify(|r, w| unsafe { w.bits(r.bits() & !OCIE0) });
        }
    }
}

#[cfg(all(target_arch = "avr", feature = "atmega128"))]
pub use atmega128::Timer0Tick;
