//! Pin capabilities.
//!
//! Reading and writing levels goes through the `embedded-hal` digital
//! traits; electrical configuration goes through [`SetDriveMode`], which the
//! drivers only touch during start, sleep and wake transitions.

/// Electrical configuration of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveMode {
    /// Input with pull-up resistor
    PullUp,
    /// Input with pull-down resistor
    PullDown,
    /// Digital input, no pull (also used to park a pin while asleep)
    HighImpedance,
    /// Push-pull output
    Strong,
}

/// Change a pin's drive mode at runtime.
pub trait SetDriveMode {
    /// Apply `mode` to the pin
    fn set_drive_mode(&mut self, mode: DriveMode);
}

impl<T: SetDriveMode + ?Sized> SetDriveMode for &mut T {
    fn set_drive_mode(&mut self, mode: DriveMode) {
        (**self).set_drive_mode(mode);
    }
}

#[cfg(all(target_arch = "avr", feature = "atmega128"))]
mod atmega128 {
    use super::{DriveMode, SetDriveMode};
    use avr_device::atmega128a::{PORTA, PORTB, PORTC, PORTD, PORTE, PORTF};
    use core::convert::Infallible;
    use core::marker::PhantomData;
    use embedded_hal::digital::v2::{InputPin, OutputPin};

    /// One port bit whose direction and pull-up are switched at runtime.
    pub struct Pin<PORT, const P: u8> {
        _port: PhantomData<PORT>,
    }

    impl<PORT, const P: u8> Pin<PORT, P> {
        /// # Safety
        ///
        /// At most one `Pin` may exist per port bit.
        pub const unsafe fn steal() -> Self {
            Self { _port: PhantomData }
        }
    }

    macro_rules! impl_port {
        ($PORT:ident, $pin:ident, $ddr:ident, $port:ident) => {
            impl<const P: u8> SetDriveMode for Pin<$PORT, P> {
                fn set_drive_mode(&mut self, mode: DriveMode) {
                    let regs = unsafe { &*$PORT::ptr() };
                    match mode {
                        DriveMode::Strong => {
                            regs.$ddr.modify(|r, w| unsafe { w.bits(r.bits() | (1 << P)) });
                        }
                        DriveMode::PullUp => {
                            regs.$ddr.modify(|r, w| unsafe { w.bits(r.bits() & !(1 << P)) });
                            regs.$port.modify(|r, w| unsafe { w.bits(r.bits() | (1 << P)) });
                        }
                        // No pull-down on this part; park it floating instead.
                        DriveMode::PullDown | DriveMode::HighImpedance => {
                            regs.$ddr.modify(|r, w| unsafe { w.bits(r.bits() & !(1 << P)) });
                            regs.$port.modify(|r, w| unsafe { w.bits(r.bits() & !(1 << P)) });
                        }
                    }
                }
            }

            impl<const P: u8> InputPin for Pin<$PORT, P> {
                type Error = Infallible;

                fn is_high(&self) -> Result<bool, Self::Error> {
                    let regs = unsafe { &*$PORT::ptr() };
                    Ok(regs.$pin.read().bits() & (1 << P) != 0)
                }

                fn is_low(&self) -> Result<bool, Self::Error> {
                    self.is_high().map(|high| !high)
                }
            }

            impl<const P: u8> OutputPin for Pin<$PORT, P> {
                type Error = Infallible;

                fn set_high(&mut self) -> Result<(), Self::Error> {
                    let regs = unsafe { &*$PORT::ptr() };
                    regs.$port.modify(|r, w| unsafe { w.bits(r.bits() | (1 << P)) });
                    Ok(())
                }

                fn set_low(&mut self) -> Result<(), Self::Error> {
                    let regs = unsafe { &*$PORT::ptr() };
                    regs.$port.modify(|r, w| unsafe { w.bits(r.bits() & !(1 << P)) });
                    Ok(())
                }
            }
        };
    }

    impl_port!(PORTA, pina, ddra, porta);
    impl_port!(PORTB, pinb, ddrb, portb);
    impl_port!(PORTC, pinc, ddrc, portc);
    impl_port!(PORTD, pind, ddrd, portd);
    impl_port!(PORTE, pine, ddre, porte);
    impl_port!(PORTF, pinf, ddrf, portf);

    /// BigAVR2 board pin assignments
    pub mod board {
        use super::*;

        /// Status LED
        pub type LED0 = Pin<PORTA, 0>;
        /// Activity LED
        pub type LED1 = Pin<PORTA, 1>;

        /// User push button (active low)
        pub type BTN0 = Pin<PORTB, 0>;
    }
}

#[cfg(all(target_arch = "avr", feature = "atmega128"))]
pub use atmega128::{board, Pin};
