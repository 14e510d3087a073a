//! Client state machines driven by the scheduler.

pub mod blink_output;
pub mod debounce_input;

pub use blink_output::{BlinkConfig, BlinkMode, BlinkOutput};
pub use debounce_input::{Callback, DebounceConfig, DebounceInput, InputState};
