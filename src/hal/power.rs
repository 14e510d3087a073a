//! CPU low-power state.

/// Parks the CPU until the next interrupt.
///
/// Returning from [`enter_low_power_cpu_state`](Self::enter_low_power_cpu_state)
/// means an interrupt (normally the scheduler tick) has fired.
pub trait LowPowerCpu {
    /// Sleep until the next interrupt
    fn enter_low_power_cpu_state(&mut self);
}

#[cfg(all(target_arch = "avr", feature = "atmega128"))]
mod atmega128 {
    use super::LowPowerCpu;
    use avr_device::atmega128a::CPU;

    const SE: u8 = 1 << 5;
    const SM_MASK: u8 = 0b0001_1100;

    /// MCUCR sleep modes (SM2:0)
    #[derive(Clone, Copy)]
    #[repr(u8)]
    pub enum SleepMode {
        /// CPU halted, timers running
        Idle = 0,
        /// ADC noise reduction
        AdcNoiseReduction = 1,
        /// Only asynchronous wake sources
        PowerDown = 2,
        /// Timer0 keeps running from its asynchronous clock
        PowerSave = 3,
        /// Oscillator kept running
        Standby = 6,
        /// Power-save with oscillator kept running
        ExtendedStandby = 7,
    }

    impl SleepMode {
        // SM0 -> bit 3, SM1 -> bit 4, SM2 -> bit 2
        fn mcucr_bits(self) -> u8 {
            let v = self as u8;
            ((v & 0b001) << 3) | ((v & 0b010) << 3) | (v & 0b100)
        }
    }

    /// Sleep controller. Idle mode keeps Timer0 clocked from the CPU clock,
    /// so the tick interrupt wakes the core.
    pub struct Power {
        cpu: CPU,
        mode: SleepMode,
    }

    impl Power {
        /// Take ownership of the CPU control registers
        pub fn new(cpu: CPU) -> Self {
            Self {
                cpu,
                mode: SleepMode::Idle,
            }
        }

        /// Sleep mode used by the next `enter_low_power_cpu_state`
        pub fn set_sleep_mode(&mut self, mode: SleepMode) {
            self.mode = mode;
        }
    }

    impl LowPowerCpu for Power {
        fn enter_low_power_cpu_state(&mut self) {
            let bits = self.mode.mcucr_bits();
            self.cpu
                .mcucr
                .modify(|r, w| unsafe { w.bits((r.bits() & !SM_MASK) | bits | SE) });
            avr_device::asm::sleep();
            self.cpu.mcucr.modify(|r, w| unsafe { w.bits(r.bits() & !SE) });
        }
    }
}

#[cfg(all(target_arch = "avr", feature = "atmega128"))]
pub use atmega128::{Power, SleepMode};
