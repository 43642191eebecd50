//! Change-gated RC consumer that reacts to link failsafe transitions.

use snapbus_events::{RcRole, RcSnapshot};
use snapbus_icc::{ChangeCursor, Relax, SnapshotReader, ThreadYield};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailsafeEvent {
    Engaged,
    Cleared,
}

pub struct FailsafeMonitor<R = ThreadYield> {
    rc: SnapshotReader<RcSnapshot, R>,
    cursor: ChangeCursor,
    in_failsafe: bool,
    stale_after: Duration,
    latest: Option<RcSnapshot>,
}

impl<R: Relax> FailsafeMonitor<R> {
    pub fn new(rc: SnapshotReader<RcSnapshot, R>, stale_after: Duration) -> Self {
        Self {
            rc,
            cursor: ChangeCursor::new(),
            in_failsafe: false,
            stale_after,
            latest: None,
        }
    }

    /// Processes the latest RC frame if one was published since the last
    /// poll. Returns a transition event, if any.
    pub fn poll(&mut self) -> Option<FailsafeEvent> {
        let snap = self.cursor.poll(&self.rc)?;
        self.latest = Some(snap);

        let event = match (self.in_failsafe, snap.failsafe) {
            (false, true) => {
                warn!(stamp_us = snap.stamp_us, "RC failsafe engaged, stop vehicle");
                Some(FailsafeEvent::Engaged)
            }
            (true, false) => {
                info!(stamp_us = snap.stamp_us, "RC failsafe cleared");
                Some(FailsafeEvent::Cleared)
            }
            _ => None,
        };
        self.in_failsafe = snap.failsafe;

        if !snap.failsafe {
            debug!(speed = snap.get(RcRole::Speed), "rc frame");
        }
        event
    }

    pub fn in_failsafe(&self) -> bool {
        self.in_failsafe
    }

    pub fn latest(&self) -> Option<&RcSnapshot> {
        self.latest.as_ref()
    }

    /// True if no frame was seen yet or the newest one is older than the
    /// stale threshold. A stalled producer shows up here, not in the slot.
    pub fn is_stale(&self, now_us: u64) -> bool {
        let limit = self.stale_after.as_micros() as u64;
        self.latest.is_none_or(|s| s.age_us(now_us) > limit)
    }
}
