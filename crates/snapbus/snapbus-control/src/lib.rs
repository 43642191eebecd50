pub mod control_core;
pub mod failsafe;

pub use control_core::ControlCore;
pub use failsafe::{FailsafeEvent, FailsafeMonitor};
