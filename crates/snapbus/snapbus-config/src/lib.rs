pub mod config;

pub use config::{ConfigError, ControlConfig, InputConfig, RcConfig, RoverConfig, SlotConfig};
