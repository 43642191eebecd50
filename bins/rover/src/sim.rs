//! Host stand-ins for the vehicle's input drivers.

use snapbus_events::{ButtonIndex, ButtonSet, InputState, RC_CHANNELS, RcRole};
use snapbus_publisher::{SampleSource, copy_channels};
use snapbus_util::mono_now_ms32;
use std::time::{Duration, Instant};

/// Fake receiver: sweeps the throttle stick, holds the switches and drops
/// the link for `dropout` at the end of every `cycle`.
pub struct SimulatedRcLink {
    start: Instant,
    cycle: Duration,
    dropout: Duration,
    frame: [f32; RC_CHANNELS],
    failsafe: bool,
}

impl SimulatedRcLink {
    pub fn new(cycle: Duration, dropout: Duration) -> Self {
        Self {
            start: Instant::now(),
            cycle,
            dropout: dropout.min(cycle),
            frame: [0.0; RC_CHANNELS],
            failsafe: false,
        }
    }

    fn phase(&self) -> Duration {
        let cycle_ns = self.cycle.as_nanos().max(1);
        Duration::from_nanos((self.start.elapsed().as_nanos() % cycle_ns) as u64)
    }
}

impl SampleSource for SimulatedRcLink {
    fn update(&mut self) {
        let phase = self.phase();
        self.failsafe = phase >= self.cycle - self.dropout;

        let t = phase.as_secs_f32() / self.cycle.as_secs_f32();
        // Receivers report whole units; keep the sweep quantized the same way.
        let speed = (100.0 * (std::f32::consts::PI * t).sin()).round();
        let steering = (100.0 * (2.0 * std::f32::consts::PI * t).sin()).round();

        self.frame = [0.0; RC_CHANNELS];
        self.frame[RcRole::Speed.index()] = speed;
        self.frame[RcRole::Steering.index()] = steering;
        self.frame[RcRole::Lights.index()] = 1.0;
        self.frame[RcRole::Mode.index()] = 1.0;
    }

    fn read(&self, dst: &mut [f32]) -> usize {
        copy_channels(&self.frame, dst)
    }

    fn ok(&self) -> bool {
        !self.failsafe
    }
}

/// Fake debounced button matrix following a fixed press pattern.
pub struct SimulatedButtons {
    start: Instant,
}

impl SimulatedButtons {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn scan(&self) -> InputState {
        let ms = self.start.elapsed().as_millis() as u64;
        let mut buttons = ButtonSet::default();
        // Accelerator held for 2 s out of every 3 s.
        buttons.set(ButtonIndex::Accelerator, ms % 3_000 < 2_000);
        // Short horn tap every 4 s.
        buttons.set(ButtonIndex::Horn, ms % 4_000 < 150);
        // Alternate indicators every 5 s.
        let left = (ms / 5_000) % 2 == 0;
        buttons.set(ButtonIndex::IndicatorLeft, left);
        buttons.set(ButtonIndex::IndicatorRight, !left);

        InputState {
            buttons,
            stamp_ms: mono_now_ms32(),
        }
    }
}

impl Default for SimulatedButtons {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_link_starts_healthy_and_fills_all_channels() {
        let mut link = SimulatedRcLink::new(Duration::from_secs(10), Duration::from_secs(1));
        link.update();
        assert!(link.ok());

        let mut dst = [f32::NAN; RC_CHANNELS];
        assert_eq!(link.read(&mut dst), RC_CHANNELS);
        assert!(dst.iter().all(|v| v.is_finite()));
        assert_eq!(dst[RcRole::Lights.index()], 1.0);
        assert_eq!(link.read(&mut []), 0);
    }

    #[test]
    fn rc_link_drops_out_at_end_of_cycle() {
        let mut link = SimulatedRcLink::new(Duration::from_millis(20), Duration::from_millis(20));
        link.update();
        assert!(!link.ok(), "dropout covering the whole cycle is always failsafe");
    }

    #[test]
    fn buttons_start_with_accelerator_and_left_indicator() {
        let state = SimulatedButtons::new().scan();
        assert!(state.buttons.test(ButtonIndex::Accelerator));
        assert!(state.buttons.test(ButtonIndex::IndicatorLeft));
        assert!(!state.buttons.test(ButtonIndex::IndicatorRight));
    }
}
