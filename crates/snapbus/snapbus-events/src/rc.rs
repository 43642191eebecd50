#![forbid(unsafe_code)]

/// Number of mapped remote-control roles.
pub const RC_CHANNELS: usize = 10;

/// Logical remote-control roles, in receiver channel order.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RcRole {
    Steering = 0,   // ch1, right stick horizontal
    Direction = 1,  // ch2, right stick vertical
    Speed = 2,      // ch3, left stick vertical
    Indicators = 3, // ch4, left stick horizontal
    Volume = 4,     // ch5, knob A
    Power = 5,      // ch6, knob B
    Override = 6,   // ch7, switch A
    Lights = 7,     // ch8, switch B
    Mode = 8,       // ch9, switch C (3 position)
    Obstacle = 9,   // ch10, switch D
}

impl RcRole {
    pub const ALL: [RcRole; RC_CHANNELS] = [
        RcRole::Steering,
        RcRole::Direction,
        RcRole::Speed,
        RcRole::Indicators,
        RcRole::Volume,
        RcRole::Power,
        RcRole::Override,
        RcRole::Lights,
        RcRole::Mode,
        RcRole::Obstacle,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One decoded remote-control frame.
///
/// `out` holds engineering units per role (e.g. -100..100 for sticks,
/// 0/1/2 for switches). `failsafe` is set while the link is untrustworthy.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RcSnapshot {
    pub out: [f32; RC_CHANNELS],
    pub failsafe: bool,
    /// Sample time, microseconds since boot.
    pub stamp_us: u64,
}

impl RcSnapshot {
    #[inline]
    pub fn get(&self, role: RcRole) -> f32 {
        self.out[role.index()]
    }

    /// Age of this frame at `now_us`; zero if the stamp is in the future.
    #[inline]
    pub fn age_us(&self, now_us: u64) -> u64 {
        now_us.saturating_sub(self.stamp_us)
    }
}
