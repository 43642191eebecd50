//! Bounded spin-then-yield policy used by snapshot readers.
//!
//! A reader that finds a write in progress first spins with `spin_loop` hints.
//! Once it has spun `spin_limit` times it hands the rest of its time slice back
//! to the scheduler through a [`Relax`] strategy, then starts spinning again.
//! The strategy is injected so the same retry loop runs on a real scheduler
//! (`ThreadYield`), on a single-threaded host (`SpinOnly`) or in code that may
//! execute from interrupt context (`IsrGuarded`).

/// Spin iterations before a reader yields. 32..128 is typical for a dual-core MCU.
pub const DEFAULT_SPIN_LIMIT: u32 = 64;

/// Capability to voluntarily give up the processor.
pub trait Relax {
    fn relax(&self);
}

/// Yields the current OS thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadYield;

impl Relax for ThreadYield {
    #[inline]
    fn relax(&self) {
        std::thread::yield_now();
    }
}

/// Never yields; only emits a spin hint.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpinOnly;

impl Relax for SpinOnly {
    #[inline(always)]
    fn relax(&self) {
        std::hint::spin_loop();
    }
}

/// Wraps another strategy and skips the yield while `in_isr()` reports
/// interrupt context. Yielding from an ISR is undefined on most RTOS kernels.
#[derive(Clone, Copy, Debug)]
pub struct IsrGuarded<R> {
    inner: R,
    in_isr: fn() -> bool,
}

impl<R: Relax> IsrGuarded<R> {
    pub fn new(inner: R, in_isr: fn() -> bool) -> Self {
        Self { inner, in_isr }
    }
}

impl<R: Relax> Relax for IsrGuarded<R> {
    #[inline]
    fn relax(&self) {
        if (self.in_isr)() {
            std::hint::spin_loop();
        } else {
            self.inner.relax();
        }
    }
}

impl<R: Relax + ?Sized> Relax for &R {
    #[inline]
    fn relax(&self) {
        (**self).relax();
    }
}

/// Per-read retry state.
///
/// `snooze()` spins until `spin_limit` is reached, then calls the strategy once
/// and resets the spin budget.
#[derive(Debug)]
pub struct Backoff {
    spin_limit: u32,
    spins: u32,
    retries: u32,
    yields: u32,
}

impl Backoff {
    pub fn new(spin_limit: u32) -> Self {
        Self {
            spin_limit: spin_limit.max(1),
            spins: 0,
            retries: 0,
            yields: 0,
        }
    }

    #[inline]
    pub fn snooze<R: Relax>(&mut self, relax: &R) {
        self.retries = self.retries.wrapping_add(1);
        if self.spins < self.spin_limit {
            self.spins += 1;
            std::hint::spin_loop();
        } else {
            self.spins = 0;
            self.yields = self.yields.wrapping_add(1);
            relax.relax();
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn yields(&self) -> u32 {
        self.yields
    }
}
