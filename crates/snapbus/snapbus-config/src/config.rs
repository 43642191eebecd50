use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RoverConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default)]
    pub slot: SlotConfig,
    #[serde(default)]
    pub rc: RcConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

/// Reader back-off shared by every bus.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SlotConfig {
    #[serde(default = "defaults::spin_limit")]
    pub spin_limit: u32,
}

/// RC publisher task: cadence and publish gate.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RcConfig {
    #[serde(default = "defaults::period_ms")]
    pub period_ms: u64,
    /// Publish when any channel moves more than this (0 = any change).
    #[serde(default)]
    pub epsilon: f32,
    /// Heartbeat (0 = disabled).
    #[serde(default)]
    pub min_interval_ms: u64,
    #[serde(default = "defaults::stack_size")]
    pub stack_size: usize,
    /// Consumers treat frames older than this as a stalled producer.
    #[serde(default = "defaults::stale_after_ms")]
    pub stale_after_ms: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct InputConfig {
    #[serde(default = "defaults::period_ms")]
    pub period_ms: u64,
    #[serde(default = "defaults::stack_size")]
    pub stack_size: usize,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ControlConfig {
    #[serde(default = "defaults::period_ms")]
    pub period_ms: u64,
    #[serde(default = "defaults::stack_size")]
    pub stack_size: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn spin_limit() -> u32 {
        64
    }

    pub fn period_ms() -> u64 {
        10
    }

    pub fn stack_size() -> usize {
        64 * 1024
    }

    pub fn stale_after_ms() -> u64 {
        250
    }
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            spin_limit: defaults::spin_limit(),
        }
    }
}

impl Default for RcConfig {
    fn default() -> Self {
        Self {
            period_ms: defaults::period_ms(),
            epsilon: 0.0,
            min_interval_ms: 0,
            stack_size: defaults::stack_size(),
            stale_after_ms: defaults::stale_after_ms(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            period_ms: defaults::period_ms(),
            stack_size: defaults::stack_size(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            period_ms: defaults::period_ms(),
            stack_size: defaults::stack_size(),
        }
    }
}

impl Default for RoverConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            slot: SlotConfig::default(),
            rc: RcConfig::default(),
            input: InputConfig::default(),
            control: ControlConfig::default(),
        }
    }
}

impl RcConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

impl InputConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl ControlConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl RoverConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&toml_to_str)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let rover_config: RoverConfig = toml::from_str(toml_str)?;
        rover_config.validate()?;
        Ok(rover_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot.spin_limit == 0 {
            return Err(invalid("slot.spin_limit", "must be at least 1"));
        }
        if !self.rc.epsilon.is_finite() || self.rc.epsilon < 0.0 {
            return Err(invalid(
                "rc.epsilon",
                format!("must be finite and >= 0, got {}", self.rc.epsilon),
            ));
        }
        for (field, period_ms) in [
            ("rc.period_ms", self.rc.period_ms),
            ("input.period_ms", self.input.period_ms),
            ("control.period_ms", self.control.period_ms),
        ] {
            if period_ms == 0 {
                return Err(invalid(field, "period must be non-zero"));
            }
        }
        if self.rc.min_interval_ms != 0 && self.rc.min_interval_ms < self.rc.period_ms {
            return Err(invalid(
                "rc.min_interval_ms",
                "heartbeat shorter than the sampling period",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
