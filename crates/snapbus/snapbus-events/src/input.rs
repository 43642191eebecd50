#![forbid(unsafe_code)]

/// Buttons the control policy cares about.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonIndex {
    Accelerator = 0,
    Horn = 1,
    IndicatorLeft = 2,
    IndicatorRight = 3,
}

impl ButtonIndex {
    pub const COUNT: usize = 4;

    pub const ALL: [ButtonIndex; Self::COUNT] = [
        ButtonIndex::Accelerator,
        ButtonIndex::Horn,
        ButtonIndex::IndicatorLeft,
        ButtonIndex::IndicatorRight,
    ];

    #[inline]
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Debounced button levels, one bit per [`ButtonIndex`].
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ButtonSet(pub u32);

impl ButtonSet {
    #[inline]
    pub fn test(self, button: ButtonIndex) -> bool {
        self.0 & button.bit() != 0
    }

    #[inline]
    pub fn set(&mut self, button: ButtonIndex, pressed: bool) {
        if pressed {
            self.0 |= button.bit();
        } else {
            self.0 &= !button.bit();
        }
    }

    #[inline]
    pub fn with(mut self, button: ButtonIndex) -> Self {
        self.set(button, true);
        self
    }

    /// Buttons whose level differs between `self` and `other`.
    #[inline]
    pub fn changed(self, other: ButtonSet) -> ButtonSet {
        ButtonSet(self.0 ^ other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Input scan result published on the input bus.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub buttons: ButtonSet,
    /// Scan time, milliseconds since boot (wraps after ~49 days).
    pub stamp_ms: u32,
}
