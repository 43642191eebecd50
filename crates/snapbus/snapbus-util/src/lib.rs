pub mod clock;
pub mod timestamp;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use timestamp::{mono_now_ms32, mono_now_us};
