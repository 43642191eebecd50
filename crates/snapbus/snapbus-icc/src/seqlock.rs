//! Seqlock snapshot slot: one writer, any number of non-blocking readers.
//!
//! The slot holds the latest value of a plain `Copy` record. The writer bumps a
//! sequence counter before and after copying the value in; readers use the
//! counter to detect that a copy overlapped a write and retry.
//!
//! # Protocol
//!
//! **Writer:**
//! 1. Increment seq to odd (signals "write in progress")
//! 2. Write data
//! 3. Increment seq to even (signals "write complete")
//!
//! **Reader:**
//! 1. Read seq; if odd, back off (spin, then yield) and retry
//! 2. Copy data
//! 3. Read seq again; if changed, retry from step 1
//! 4. Return data (guaranteed consistent)
//!
//! # Single writer
//!
//! The protocol has no mutual exclusion between writers. Instead of checking
//! this at runtime, a shared slot is only writable through the one
//! [`SnapshotWriter`] returned by [`SnapshotSlot::into_channel`]; it is not
//! `Clone` and `publish` takes `&mut self`.
//!
//! # Sequence wraparound
//!
//! The counter is a `u32` and wraps. Parity survives the wrap because 2^32 is
//! even. Compare sequences for inequality, or use [`seq_after`].

use crate::relax::{Backoff, DEFAULT_SPIN_LIMIT, Relax, ThreadYield};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering, fence};

/// Retry accounting for one successful read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Attempts discarded because a write was in progress or overlapped the copy.
    pub retries: u32,
    /// Times the reader handed its time slice back to the scheduler.
    pub yields: u32,
}

/// A single value protected by a sequence lock.
///
/// # Memory Layout
///
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │ seq: AtomicU32 │ spin_limit │ relax: R │ data: T          │
/// └──────────────────────────────────────────────────────────┘
/// ```
///
/// Aligned to a cache line so two slots never share one.
///
/// # Sequence Number Semantics
///
/// - **Even**: Data is stable, safe to read
/// - **Odd**: Write in progress, readers must wait
#[repr(C, align(64))]
pub struct SnapshotSlot<T: Copy, R = ThreadYield> {
    seq: AtomicU32,
    spin_limit: u32,
    relax: R,
    data: UnsafeCell<T>,
}

// SAFETY: all shared access to `data` goes through the seqlock protocol; only
// the unique writer handle mutates it and readers copy it out by value.
unsafe impl<T: Copy + Send, R: Sync> Sync for SnapshotSlot<T, R> {}

impl<T: Copy> SnapshotSlot<T, ThreadYield> {
    /// Creates a slot holding `initial`, yielding the OS thread under contention.
    pub fn new(initial: T) -> Self {
        Self::with_relax(initial, ThreadYield, DEFAULT_SPIN_LIMIT)
    }

    /// Creates a shared slot and returns its writer and a first reader.
    pub fn channel(initial: T) -> (SnapshotWriter<T>, SnapshotReader<T>) {
        Self::new(initial).into_channel()
    }
}

impl<T: Copy, R: Relax> SnapshotSlot<T, R> {
    /// Creates a slot with an explicit yield strategy and spin bound.
    pub fn with_relax(initial: T, relax: R, spin_limit: u32) -> Self {
        Self {
            seq: AtomicU32::new(0),
            spin_limit,
            relax,
            data: UnsafeCell::new(initial),
        }
    }

    /// Publishes `value` while the slot is still exclusively owned.
    ///
    /// Used to seed a slot before any reader exists. Advances the sequence by
    /// one publish (two steps) so change cursors see the seed as new.
    pub fn seed(&mut self, value: T) {
        *self.data.get_mut() = value;
        let seq = self.seq.get_mut();
        *seq = seq.wrapping_add(2);
    }

    /// Moves the slot behind an `Arc` and splits it into its writer and a reader.
    pub fn into_channel(self) -> (SnapshotWriter<T, R>, SnapshotReader<T, R>) {
        let slot = Arc::new(self);
        (
            SnapshotWriter {
                slot: Arc::clone(&slot),
            },
            SnapshotReader { slot },
        )
    }

    /// Writes `value` using the seqlock protocol.
    ///
    /// # Safety
    /// The caller must be the only thread writing to this slot. Concurrent
    /// writers corrupt the sequence parity and can tear the stored value.
    #[inline(always)]
    unsafe fn write(&self, value: T) {
        let s0 = self.seq.load(Ordering::Relaxed);
        // Mark write-in-progress (odd sequence number)
        self.seq.store(s0.wrapping_add(1), Ordering::Relaxed);
        // Orders the odd store before the data stores for any reader that
        // later observes part of the new data.
        fence(Ordering::Release);
        // SAFETY: single writer; readers only copy through `read_raw` and
        // discard anything observed while seq is odd or changed.
        unsafe { ptr::write_volatile(self.data.get(), value) };
        // Mark write-complete (even sequence number)
        self.seq.store(s0.wrapping_add(2), Ordering::Release);
    }

    /// Returns the latest complete value, retrying while a write overlaps.
    #[inline]
    pub fn read(&self) -> T {
        self.read_raw(&mut Backoff::new(self.spin_limit)).0
    }

    /// Alias of [`read`](Self::read), the consumer-facing name.
    #[inline]
    pub fn peek(&self) -> T {
        self.read()
    }

    /// Returns the value together with the (even) sequence it was published at.
    #[inline]
    pub fn read_versioned(&self) -> (T, u32) {
        self.read_raw(&mut Backoff::new(self.spin_limit))
    }

    /// Like [`read`](Self::read), also reporting how hard the read had to retry.
    pub fn read_with_stats(&self) -> (T, ReadStats) {
        let mut backoff = Backoff::new(self.spin_limit);
        let (value, _) = self.read_raw(&mut backoff);
        let stats = ReadStats {
            retries: backoff.retries(),
            yields: backoff.yields(),
        };
        (value, stats)
    }

    /// Current sequence counter. A single atomic load; never blocks.
    #[inline(always)]
    pub fn sequence(&self) -> u32 {
        self.seq.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn read_raw(&self, backoff: &mut Backoff) -> (T, u32) {
        loop {
            let s1 = self.seq.load(Ordering::Acquire);

            if s1 & 1 == 0 {
                // The copy may race with a writer, so it lands in `MaybeUninit`
                // and is only assumed valid once the sequence check passes.
                // SAFETY: the pointer is valid and aligned for T; the bytes
                // are not interpreted as T until validated below.
                let copy = unsafe { ptr::read_volatile(self.data.get() as *const MaybeUninit<T>) };
                fence(Ordering::Acquire);
                let s2 = self.seq.load(Ordering::Relaxed);
                if s1 == s2 {
                    // SAFETY: no write overlapped the copy, so it holds exactly
                    // the bytes of one published T.
                    return (unsafe { copy.assume_init() }, s1);
                }
            }

            backoff.snooze(&self.relax);
        }
    }

    #[cfg(test)]
    pub(crate) fn with_sequence(initial: T, relax: R, seq: u32) -> Self {
        let slot = Self::with_relax(initial, relax, DEFAULT_SPIN_LIMIT);
        slot.seq.store(seq, Ordering::Relaxed);
        slot
    }
}

/// The unique writing end of a shared [`SnapshotSlot`].
///
/// `Send` so it can move to the producer task; not `Clone`.
pub struct SnapshotWriter<T: Copy, R = ThreadYield> {
    slot: Arc<SnapshotSlot<T, R>>,
}

impl<T: Copy, R: Relax> SnapshotWriter<T, R> {
    /// Publishes `value`. Never blocks and never waits for readers.
    #[inline(always)]
    pub fn publish(&mut self, value: T) {
        // SAFETY: `SnapshotWriter` is the only handle that can write, it is
        // not `Clone`, and `&mut self` rules out concurrent calls through it.
        unsafe { self.slot.write(value) }
    }

    /// Returns a new reader on the same slot.
    pub fn reader(&self) -> SnapshotReader<T, R> {
        SnapshotReader {
            slot: Arc::clone(&self.slot),
        }
    }

    #[inline(always)]
    pub fn sequence(&self) -> u32 {
        self.slot.sequence()
    }

    /// Latest published value, as a reader would see it.
    pub fn last(&self) -> T {
        self.slot.read()
    }
}

/// A reading end of a shared [`SnapshotSlot`]. Cheap to clone.
pub struct SnapshotReader<T: Copy, R = ThreadYield> {
    slot: Arc<SnapshotSlot<T, R>>,
}

impl<T: Copy, R> Clone for SnapshotReader<T, R> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Copy, R: Relax> SnapshotReader<T, R> {
    #[inline]
    pub fn read(&self) -> T {
        self.slot.read()
    }

    #[inline]
    pub fn peek(&self) -> T {
        self.slot.read()
    }

    #[inline]
    pub fn read_versioned(&self) -> (T, u32) {
        self.slot.read_versioned()
    }

    pub fn read_with_stats(&self) -> (T, ReadStats) {
        self.slot.read_with_stats()
    }

    #[inline(always)]
    pub fn sequence(&self) -> u32 {
        self.slot.sequence()
    }

    /// True if anything was published since `seen` was sampled.
    #[inline(always)]
    pub fn has_changed_since(&self, seen: u32) -> bool {
        self.slot.sequence() != seen
    }
}

/// Wraparound-safe "`a` was published after `b`".
///
/// Serial-number comparison: correct while the two sequences are less than
/// 2^31 steps apart.
#[inline(always)]
pub fn seq_after(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relax::SpinOnly;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Sample {
        a: u64,
        b: f32,
        ok: bool,
    }

    #[test]
    fn read_before_publish_returns_initial_value() {
        let initial = Sample {
            a: 7,
            b: 1.5,
            ok: true,
        };
        let (_writer, reader) = SnapshotSlot::channel(initial);
        assert_eq!(reader.read(), initial);
        assert_eq!(reader.sequence(), 0);
    }

    #[test]
    fn publish_advances_sequence_by_two() {
        let (mut writer, reader) = SnapshotSlot::channel(Sample::default());
        writer.publish(Sample {
            a: 1,
            ..Sample::default()
        });
        assert_eq!(reader.sequence(), 2);
        writer.publish(Sample {
            a: 2,
            ..Sample::default()
        });
        assert_eq!(reader.sequence(), 4);
        assert_eq!(reader.peek().a, 2);
        assert_eq!(writer.last().a, 2);
    }

    #[test]
    fn seed_is_visible_to_readers_created_later() {
        let mut slot = SnapshotSlot::with_relax(Sample::default(), SpinOnly, 8);
        let seeded = Sample {
            a: 42,
            b: -3.0,
            ok: true,
        };
        slot.seed(seeded);
        let (writer, reader) = slot.into_channel();

        let late = writer.reader();
        assert_eq!(reader.read(), seeded);
        assert_eq!(late.read(), seeded);
        assert_eq!(late.sequence(), 2);
    }

    #[test]
    fn uncontended_read_never_retries() {
        let (mut writer, reader) = SnapshotSlot::channel(0u64);
        writer.publish(9);
        let (v, stats) = reader.read_with_stats();
        assert_eq!(v, 9);
        assert_eq!(stats, ReadStats::default());
    }

    #[test]
    fn read_versioned_reports_publish_sequence() {
        let (mut writer, reader) = SnapshotSlot::channel(0u32);
        writer.publish(5);
        writer.publish(6);
        assert_eq!(reader.read_versioned(), (6, 4));
    }

    #[test]
    fn sequence_wraps_and_stays_even() {
        let slot = SnapshotSlot::with_sequence(0u8, SpinOnly, u32::MAX - 1);
        let (mut writer, reader) = slot.into_channel();
        let before = reader.sequence();

        writer.publish(1);
        let after = reader.sequence();

        assert_eq!(after, 0);
        assert_eq!(after & 1, 0);
        assert!(reader.has_changed_since(before));
        assert!(seq_after(after, before));
        assert_eq!(reader.read(), 1);
    }

    #[test]
    fn seq_after_handles_wrap() {
        assert!(seq_after(2, 0));
        assert!(!seq_after(0, 2));
        assert!(!seq_after(4, 4));
        assert!(seq_after(1, u32::MAX - 1));
        assert!(!seq_after(u32::MAX - 1, 1));
    }

    #[test]
    fn slot_is_cache_line_aligned() {
        assert_eq!(std::mem::align_of::<SnapshotSlot<u8>>(), 64);
    }
}
