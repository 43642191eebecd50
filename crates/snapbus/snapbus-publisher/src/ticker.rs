use std::time::{Duration, Instant};

/// Fixed-period pacing for a periodic task.
///
/// Each `wait` sleeps until the next deadline, then advances the deadline by
/// one period, so the cadence does not drift with the work done per tick. A
/// task that overran by more than a period is re-anchored to now instead of
/// running a burst of back-to-back ticks to catch up.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    pub fn starting_at(start: Instant, period: Duration) -> Self {
        assert!(!period.is_zero(), "ticker period must be non-zero");
        Self {
            period,
            next: start + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Blocks until the next deadline. Returns how many whole periods were
    /// missed (0 when on time).
    pub fn wait(&mut self) -> u32 {
        let now = Instant::now();
        if now < self.next {
            std::thread::sleep(self.next - now);
            self.next += self.period;
            return 0;
        }

        let late = now - self.next;
        let missed = (late.as_nanos() / self.period.as_nanos()) as u32;
        if missed == 0 {
            self.next += self.period;
        } else {
            self.next = now + self.period;
        }
        missed
    }
}
