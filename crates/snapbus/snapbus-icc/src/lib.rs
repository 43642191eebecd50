//! Lock-free snapshot exchange for sharing live state across cores.
//!
//! One producer task owns a [`SnapshotWriter`]; any number of consumer tasks
//! hold [`SnapshotReader`]s and always observe either the old or the new value
//! of a record, never a mix. Readers never block the writer.

mod cursor;
mod relax;
mod seqlock;

pub use cursor::ChangeCursor;
pub use relax::{Backoff, DEFAULT_SPIN_LIMIT, IsrGuarded, Relax, SpinOnly, ThreadYield};
pub use seqlock::{ReadStats, SnapshotReader, SnapshotSlot, SnapshotWriter, seq_after};
