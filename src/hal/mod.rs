//! Capability interfaces between the scheduler core and the hardware.

pub mod gpio;
pub mod power;
pub mod timer;

// Re-export commonly used types
pub use gpio::{DriveMode, SetDriveMode};
pub use power::LowPowerCpu;
pub use timer::{Prescaler, TickPeriod, TickTimer};
