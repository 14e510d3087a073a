//! Cooperative tick-driven task scheduler for the ATmega128.
//!
//! The core is hardware-agnostic and `no_std`:
//!
//! - [`rtos::Clock`] - monotonic millisecond counter fed by a tick interrupt
//! - [`rtos::Scheduler`] - periodic dispatch with low-power transitions
//! - [`drivers::DebounceInput`] - 2-sample debounced digital input
//! - [`drivers::BlinkOutput`] - on/off/blink/chirp output sequencer
//!
//! Hardware is reached only through the capability traits in [`hal`].
//! With the `atmega128` feature on an AVR target, [`hal`] also provides
//! register-level implementations for the ATmega128.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(
    all(target_arch = "avr", feature = "atmega128"),
    feature(abi_avr_interrupt)
)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]

#[macro_use]
mod fmt;

pub mod config;
pub mod drivers;
pub mod error;
pub mod hal;
pub mod rtos;
pub mod testing;

pub use error::SchedulerError;
pub use rtos::{Clock, Duration, Scheduler, Task, TaskId, Timestamp};
