pub mod control;
pub mod input;
pub mod rc;

pub use control::{ControlSnapshot, Indicator};
pub use input::{ButtonIndex, ButtonSet, InputState};
pub use rc::{RC_CHANNELS, RcRole, RcSnapshot};

// Every payload here travels through a seqlock slot and is copied byte for
// byte, so each one is `Copy`, owns no heap data and has a fixed layout.
