#![forbid(unsafe_code)]

/// Indicator mode requested by the control core.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Indicator {
    #[default]
    Off = 0,
    Left,
    Right,
    Hazard,
}

/// High-level intent resolved from raw inputs.
///
/// Services (motor, steering, lights) consume this bus rather than the raw
/// input or RC buses, which keeps authority decisions in one place.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlSnapshot {
    /// 0..100 %. Services may clamp.
    pub throttle_cmd_pct: f32,
    pub horn_cmd: bool,
    pub indicator_cmd: Indicator,
    /// Stamp of the input scan this command was derived from.
    pub stamp_ms: u32,
}
