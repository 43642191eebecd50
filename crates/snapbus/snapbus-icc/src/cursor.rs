//! Change-gated consumption of a snapshot slot.

use crate::relax::Relax;
use crate::seqlock::SnapshotReader;

/// Remembers the last sequence a consumer handled so identical snapshots are
/// not reprocessed.
///
/// A fresh cursor has seen nothing, so its first `poll` always yields the
/// current value (the seed).
#[derive(Clone, Copy, Debug, Default)]
pub struct ChangeCursor {
    seen: Option<u32>,
}

impl ChangeCursor {
    pub fn new() -> Self {
        Self { seen: None }
    }

    /// Returns the latest snapshot if it was published after the last one
    /// this cursor returned, `None` otherwise.
    ///
    /// Costs one atomic load when nothing changed.
    pub fn poll<T: Copy, R: Relax>(&mut self, reader: &SnapshotReader<T, R>) -> Option<T> {
        if self.seen == Some(reader.sequence()) {
            return None;
        }
        // The sequence recorded is the one the copy was validated against,
        // which may be newer than the one loaded above.
        let (value, seq) = reader.read_versioned();
        if self.seen == Some(seq) {
            return None;
        }
        self.seen = Some(seq);
        Some(value)
    }

    /// Marks everything up to the current sequence as handled.
    pub fn mark_seen<T: Copy, R: Relax>(&mut self, reader: &SnapshotReader<T, R>) {
        self.seen = Some(reader.sequence() & !1);
    }

    pub fn last_seen(&self) -> Option<u32> {
        self.seen
    }
}
