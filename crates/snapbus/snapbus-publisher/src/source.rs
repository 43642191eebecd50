use snapbus_events::{RC_CHANNELS, RcSnapshot};

/// Upstream producer adapter (RC decoder, button scanner, motor status).
///
/// Implemented by the driver layer; the publisher only calls these three.
pub trait SampleSource {
    /// Pulls fresh raw data. May block briefly on a hardware read.
    fn update(&mut self);

    /// Copies up to `dst.len()` channel values in engineering units and
    /// returns how many were written. An empty `dst` is a no-op.
    fn read(&self, dst: &mut [f32]) -> usize;

    /// Health indicator; `false` while the source is in failsafe.
    fn ok(&self) -> bool;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn update(&mut self) {
        (**self).update();
    }

    fn read(&self, dst: &mut [f32]) -> usize {
        (**self).read(dst)
    }

    fn ok(&self) -> bool {
        (**self).ok()
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn update(&mut self) {
        (**self).update();
    }

    fn read(&self, dst: &mut [f32]) -> usize {
        (**self).read(dst)
    }

    fn ok(&self) -> bool {
        (**self).ok()
    }
}

/// A snapshot type a publisher can build from one sample.
pub trait ChannelSnapshot<const N: usize>: Copy {
    fn compose(values: &[f32; N], healthy: bool, stamp_us: u64) -> Self;
}

impl ChannelSnapshot<RC_CHANNELS> for RcSnapshot {
    #[inline]
    fn compose(values: &[f32; RC_CHANNELS], healthy: bool, stamp_us: u64) -> Self {
        RcSnapshot {
            out: *values,
            failsafe: !healthy,
            stamp_us,
        }
    }
}

/// Generic channel frame for sources without a dedicated payload type.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sampled<const N: usize> {
    pub values: [f32; N],
    pub healthy: bool,
    pub stamp_us: u64,
}

impl<const N: usize> Default for Sampled<N> {
    fn default() -> Self {
        Self {
            values: [0.0; N],
            healthy: false,
            stamp_us: 0,
        }
    }
}

impl<const N: usize> ChannelSnapshot<N> for Sampled<N> {
    #[inline]
    fn compose(values: &[f32; N], healthy: bool, stamp_us: u64) -> Self {
        Self {
            values: *values,
            healthy,
            stamp_us,
        }
    }
}

/// Copies `src` into `dst`, truncating to the shorter of the two.
#[inline]
pub fn copy_channels(src: &[f32], dst: &mut [f32]) -> usize {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}
