//! Publish gate: decides, once per sampling tick, whether a fresh sample is
//! worth broadcasting.
//!
//! Rules, in priority order:
//! 1. The first sample is always published (seed).
//! 2. A health flag that differs from the previous tick publishes immediately.
//! 3. A field that moved more than `epsilon` from the last published value
//!    publishes.
//! 4. If nothing was published for `min_interval`, a heartbeat publishes.
//! 5. Otherwise the tick is skipped.

use std::time::Duration;

/// Thresholds for one publisher.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GatePolicy {
    /// Absolute per-field change needed to publish. `0.0` publishes on any
    /// detectable difference.
    pub epsilon: f32,
    /// Heartbeat period. `Duration::ZERO` disables the heartbeat.
    pub min_interval: Duration,
}

impl GatePolicy {
    pub fn new(epsilon: f32, min_interval: Duration) -> Self {
        Self {
            epsilon,
            min_interval,
        }
    }

    /// Publish on every change, no heartbeat.
    pub fn always() -> Self {
        Self::new(0.0, Duration::ZERO)
    }

    #[inline]
    fn min_interval_us(&self) -> u64 {
        self.min_interval.as_micros() as u64
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::always()
    }
}

/// Outcome of one gate evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    /// Nothing published yet.
    Seed,
    /// Source health flipped since the previous tick.
    HealthChanged { healthy: bool },
    /// Largest per-field change exceeded epsilon.
    Changed { max_delta: f32 },
    /// `min_interval` elapsed without a publish.
    Heartbeat,
    Skip,
}

impl Decision {
    #[inline]
    pub fn should_publish(&self) -> bool {
        !matches!(self, Decision::Skip)
    }
}

/// Per-publisher gate state. Owned by one publisher loop, never shared.
#[derive(Clone, Debug)]
pub struct PublishGate<const N: usize> {
    policy: GatePolicy,
    last_values: [f32; N],
    last_publish_us: Option<u64>,
    prev_healthy: Option<bool>,
}

impl<const N: usize> PublishGate<N> {
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            policy,
            last_values: [0.0; N],
            last_publish_us: None,
            prev_healthy: None,
        }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Values of the last published sample.
    pub fn last_values(&self) -> &[f32; N] {
        &self.last_values
    }

    pub fn last_publish_us(&self) -> Option<u64> {
        self.last_publish_us
    }

    /// Decides without touching state.
    pub fn evaluate(&self, values: &[f32; N], healthy: bool, now_us: u64) -> Decision {
        let Some(last_us) = self.last_publish_us else {
            return Decision::Seed;
        };

        if self.prev_healthy.is_some_and(|prev| prev != healthy) {
            return Decision::HealthChanged { healthy };
        }

        let max_delta = max_abs_delta(&self.last_values, values);
        if max_delta > self.policy.epsilon {
            return Decision::Changed { max_delta };
        }

        let interval = self.policy.min_interval_us();
        if interval > 0 && now_us.saturating_sub(last_us) >= interval {
            return Decision::Heartbeat;
        }

        Decision::Skip
    }

    /// Records the tick. Health is tracked every tick; values and the publish
    /// clock only move when `decision` publishes.
    pub fn commit(&mut self, values: &[f32; N], healthy: bool, now_us: u64, decision: Decision) {
        self.prev_healthy = Some(healthy);
        if decision.should_publish() {
            self.last_values = *values;
            self.last_publish_us = Some(now_us);
        }
    }

    /// `evaluate` followed by `commit`.
    pub fn tick(&mut self, values: &[f32; N], healthy: bool, now_us: u64) -> Decision {
        let decision = self.evaluate(values, healthy, now_us);
        self.commit(values, healthy, now_us, decision);
        decision
    }
}

/// Largest absolute per-field difference.
///
/// Identical bit patterns count as no change. A NaN on either side of a
/// differing pair counts as an infinite change, so a field entering or leaving
/// NaN always exceeds epsilon.
pub fn max_abs_delta<const N: usize>(a: &[f32; N], b: &[f32; N]) -> f32 {
    a.iter().zip(b.iter()).fold(0.0f32, |acc, (&x, &y)| {
        let d = if x.to_bits() == y.to_bits() {
            0.0
        } else if x.is_nan() || y.is_nan() {
            f32::INFINITY
        } else {
            (x - y).abs()
        };
        acc.max(d)
    })
}
