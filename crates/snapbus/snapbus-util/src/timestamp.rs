//! Monotonic timebase for snapshot stamps.
//!
//! Stamps and durations must never go backwards, so wall-clock time is not
//! used here. Microsecond resolution matches what the stamps carry.

#[inline(always)]
#[cfg(target_os = "macos")]
#[allow(deprecated)]
pub fn mono_now_us() -> u64 {
    use std::sync::OnceLock;
    static TIMEBASE: OnceLock<(u64, u64)> = OnceLock::new();
    let (numer, denom) = *TIMEBASE.get_or_init(|| {
        let mut info = libc::mach_timebase_info_data_t { numer: 0, denom: 0 };
        let rc = unsafe { libc::mach_timebase_info(&mut info) };
        if rc != 0 || info.denom == 0 {
            (1, 1)
        } else {
            (info.numer as u64, info.denom as u64)
        }
    });
    let t = unsafe { libc::mach_absolute_time() } as u128;
    (((t * numer as u128) / denom as u128) / 1_000) as u64
}

#[inline(always)]
#[cfg(not(target_os = "macos"))]
pub fn mono_now_us() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    (ts.tv_sec as u64) * 1_000_000 + (ts.tv_nsec as u64) / 1_000
}

/// 32-bit millisecond clock; wraps after ~49 days.
#[inline(always)]
pub fn mono_now_ms32() -> u32 {
    (mono_now_us() / 1_000) as u32
}
