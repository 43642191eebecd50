//! Three ways to hand a `Frame` from the writer task to the UI task.

use crate::frame::Frame;
use snapbus_icc::{SnapshotReader, SnapshotSlot, SnapshotWriter};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// How long the race writer leaves the board half-updated.
pub const TEAR_WINDOW: Duration = Duration::from_millis(42);

pub trait BoardWriter: Send + 'static {
    fn write(&mut self, frame: Frame);
}

pub trait BoardReader: Send + 'static {
    fn read(&self) -> Frame;
}

/// Per-field atomics with no frame-level synchronization.
#[derive(Debug)]
struct RaceCells {
    score: AtomicI32,
    inning: AtomicI32,
    chk: AtomicI32,
    stamp_us: AtomicU64,
}

pub struct RaceWriter {
    cells: Arc<RaceCells>,
    tear_window: Duration,
    flip: bool,
}

#[derive(Clone)]
pub struct RaceReader {
    cells: Arc<RaceCells>,
}

pub fn race(initial: Frame, tear_window: Duration) -> (RaceWriter, RaceReader) {
    let cells = Arc::new(RaceCells {
        score: AtomicI32::new(initial.score),
        inning: AtomicI32::new(initial.inning),
        chk: AtomicI32::new(initial.chk),
        stamp_us: AtomicU64::new(initial.stamp_us),
    });
    (
        RaceWriter {
            cells: Arc::clone(&cells),
            tear_window,
            flip: false,
        },
        RaceReader { cells },
    )
}

impl BoardWriter for RaceWriter {
    fn write(&mut self, frame: Frame) {
        let c = &self.cells;
        // Alternate which field goes stale so both orders are visible.
        if self.flip {
            c.inning.store(frame.inning, Ordering::Relaxed);
            std::thread::sleep(self.tear_window);
            c.chk.store(frame.chk, Ordering::Relaxed);
        } else {
            c.chk.store(frame.chk, Ordering::Relaxed);
            c.inning.store(frame.inning, Ordering::Relaxed);
            std::thread::sleep(self.tear_window);
        }
        c.score.store(frame.score, Ordering::Relaxed);
        c.stamp_us.store(frame.stamp_us, Ordering::Relaxed);
        self.flip = !self.flip;
    }
}

impl BoardReader for RaceReader {
    fn read(&self) -> Frame {
        let c = &self.cells;
        Frame {
            score: c.score.load(Ordering::Relaxed),
            inning: c.inning.load(Ordering::Relaxed),
            chk: c.chk.load(Ordering::Relaxed),
            stamp_us: c.stamp_us.load(Ordering::Relaxed),
        }
    }
}

/// Whole frame behind a mutex. Consistent, but the writer waits on readers.
#[derive(Clone)]
pub struct MutexBoard {
    frame: Arc<Mutex<Frame>>,
}

pub fn mutex(initial: Frame) -> (MutexBoard, MutexBoard) {
    let board = MutexBoard {
        frame: Arc::new(Mutex::new(initial)),
    };
    (board.clone(), board)
}

impl BoardWriter for MutexBoard {
    fn write(&mut self, frame: Frame) {
        // A poisoned lock still guards a whole frame; Frame has no invariant a
        // panicking reader could break.
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = frame;
    }
}

impl BoardReader for MutexBoard {
    fn read(&self) -> Frame {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn snapshot(initial: Frame) -> (SnapshotWriter<Frame>, SnapshotReader<Frame>) {
    let mut slot = SnapshotSlot::new(Frame::default());
    slot.seed(initial);
    slot.into_channel()
}

impl BoardWriter for SnapshotWriter<Frame> {
    fn write(&mut self, frame: Frame) {
        self.publish(frame);
    }
}

impl BoardReader for SnapshotReader<Frame> {
    fn read(&self) -> Frame {
        SnapshotReader::read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_board_delivers_the_last_write() {
        let first = Frame::new(3, 2, 10);
        let second = Frame::new(4, 2, 20);

        let (mut w, r) = race(first, Duration::ZERO);
        assert_eq!(r.read(), first);
        w.write(second);
        w.write(second);
        assert_eq!(r.read(), second);

        let (mut w, r) = mutex(first);
        assert_eq!(r.read(), first);
        w.write(second);
        assert_eq!(r.read(), second);

        let (mut w, r) = snapshot(first);
        assert_eq!(BoardReader::read(&r), first);
        w.write(second);
        assert_eq!(BoardReader::read(&r), second);
    }

    #[test]
    fn race_board_exposes_half_written_frames() {
        let old = Frame::new(5, 1, 1);
        let new = Frame::new(6, 1, 2);
        let (mut w, r) = race(old, Duration::from_millis(200));

        std::thread::scope(|s| {
            s.spawn(|| w.write(new));
            // Inside the tear window chk is new but score is still old.
            std::thread::sleep(Duration::from_millis(50));
            let seen = r.read();
            assert_eq!(seen.chk, new.chk);
            assert_eq!(seen.score, old.score);
            assert!(!seen.is_consistent());
        });
        assert!(r.read().is_consistent());
    }
}
