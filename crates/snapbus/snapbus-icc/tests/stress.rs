//! Multi-threaded stress tests for the snapshot slot.
//!
//! One writer thread publishes a long run of self-checking records while
//! several reader threads copy the slot as fast as they can. Every copy must
//! pass its own consistency check.
//!
//! ```bash
//! cargo test -p snapbus-icc --test stress -- --nocapture
//! ```

use snapbus_events::{RC_CHANNELS, RcSnapshot};
use snapbus_icc::{SnapshotSlot, SpinOnly, seq_after};
use std::io::Write;
use std::sync::Barrier;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

macro_rules! log {
    ($($arg:tt)*) => {{
        let _ = writeln!(std::io::stderr(), $($arg)*);
        let _ = std::io::stderr().flush();
    }};
}

const PUBLISH_COUNT: u64 = 100_000;
const READERS: usize = 4;

/// Record whose last field is derived from all the others.
#[derive(Clone, Copy, Debug, Default)]
struct Checked {
    id: u64,
    a: u64,
    b: u64,
    c: u64,
    stamp_us: u64,
    chk: u64,
}

impl Checked {
    fn new(id: u64) -> Self {
        let a = id.wrapping_mul(31);
        let b = id ^ 0xA5A5_A5A5_A5A5_A5A5;
        let c = id.rotate_left(17);
        let stamp_us = id * 10;
        Self {
            id,
            a,
            b,
            c,
            stamp_us,
            chk: checksum(id, a, b, c, stamp_us),
        }
    }

    fn is_consistent(&self) -> bool {
        self.chk == checksum(self.id, self.a, self.b, self.c, self.stamp_us)
    }
}

fn checksum(id: u64, a: u64, b: u64, c: u64, stamp: u64) -> u64 {
    id.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ a.rotate_left(7)
        ^ b.rotate_left(13)
        ^ c.rotate_left(29)
        ^ stamp.rotate_left(41)
}

/// Readers never observe a record mixing fields from two publishes.
#[test]
fn no_torn_reads_under_concurrent_publish() {
    let mut slot = SnapshotSlot::new(Checked::default());
    slot.seed(Checked::new(0));
    let (mut writer, reader) = slot.into_channel();
    let done = AtomicBool::new(false);
    let start = Barrier::new(READERS + 1);

    let results: Vec<(u64, u64, u64)> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..READERS)
            .map(|_| {
                let reader = reader.clone();
                let done = &done;
                let start = &start;
                s.spawn(move || {
                    start.wait();
                    let mut reads = 0u64;
                    let mut torn = 0u64;
                    let mut last_id = 0u64;
                    while !done.load(Ordering::Acquire) {
                        let v = reader.read();
                        if !v.is_consistent() {
                            torn += 1;
                        }
                        assert!(v.id >= last_id, "ids went backwards: {} -> {}", last_id, v.id);
                        last_id = v.id;
                        reads += 1;
                    }
                    (reads, torn, last_id)
                })
            })
            .collect();

        start.wait();
        for id in 1..=PUBLISH_COUNT {
            writer.publish(Checked::new(id));
        }
        done.store(true, Ordering::Release);

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, (reads, torn, last_id)) in results.iter().enumerate() {
        log!("[READER {i}] reads={reads} torn={torn} last_id={last_id}");
        assert_eq!(*torn, 0, "reader {i} observed torn records");
        assert!(*reads > 0);
    }
    assert_eq!(reader.read().id, PUBLISH_COUNT);
}

/// Same property on the real RC payload: every channel carries the same value.
#[test]
fn rc_snapshot_channels_stay_coherent() {
    let (mut writer, reader) = SnapshotSlot::channel(RcSnapshot::default());
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        for _ in 0..2 {
            let reader = reader.clone();
            let done = &done;
            s.spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let snap = reader.peek();
                    let first = snap.out[0];
                    assert!(
                        snap.out.iter().all(|&v| v == first),
                        "mixed channels: {:?}",
                        snap.out
                    );
                    assert_eq!(snap.stamp_us, first as u64);
                    assert_eq!(snap.failsafe, (first as u64) % 2 == 1);
                }
            });
        }

        for i in 0..20_000u64 {
            writer.publish(RcSnapshot {
                out: [i as f32; RC_CHANNELS],
                failsafe: i % 2 == 1,
                stamp_us: i,
            });
        }
        done.store(true, Ordering::Release);
    });
}

/// Sequences seen by a reader over time never move backwards.
#[test]
fn sequence_is_monotonic_for_every_reader() {
    let (mut writer, reader) = SnapshotSlot::channel(0u64);
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        for _ in 0..READERS {
            let reader = reader.clone();
            let done = &done;
            s.spawn(move || {
                let mut prev = reader.sequence();
                while !done.load(Ordering::Acquire) {
                    let cur = reader.sequence();
                    assert!(cur == prev || seq_after(cur, prev), "{cur} before {prev}");
                    prev = cur;

                    let (_, versioned) = reader.read_versioned();
                    assert_eq!(versioned & 1, 0, "validated reads carry an even sequence");
                }
            });
        }

        for i in 0..PUBLISH_COUNT {
            writer.publish(i);
        }
        done.store(true, Ordering::Release);
    });

    assert_eq!(reader.sequence(), (PUBLISH_COUNT * 2) as u32);
}

/// Busy readers cannot hold back the writer: publishing the full run with
/// readers hammering the slot finishes well inside a generous bound.
#[test]
fn writer_is_not_blocked_by_spinning_readers() {
    let slot = SnapshotSlot::with_relax(Checked::default(), SpinOnly, u32::MAX);
    let (mut writer, reader) = slot.into_channel();
    let done = AtomicBool::new(false);

    let (elapsed, worst) = std::thread::scope(|s| {
        for _ in 0..READERS {
            let reader = reader.clone();
            let done = &done;
            s.spawn(move || {
                while !done.load(Ordering::Acquire) {
                    std::hint::black_box(reader.read());
                }
            });
        }

        let start = Instant::now();
        let mut worst = Duration::ZERO;
        for id in 0..PUBLISH_COUNT {
            let t0 = Instant::now();
            writer.publish(Checked::new(id));
            worst = worst.max(t0.elapsed());
        }
        let elapsed = start.elapsed();
        done.store(true, Ordering::Release);
        (elapsed, worst)
    });

    log!("[WRITER] {PUBLISH_COUNT} publishes in {elapsed:?}, worst single publish {worst:?}");
    assert!(elapsed < Duration::from_secs(10), "writer stalled: {elapsed:?}");
}
