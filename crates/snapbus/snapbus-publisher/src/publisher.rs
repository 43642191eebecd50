//! Periodic publisher: sample a source, gate it, push it into a snapshot slot.
//!
//! Each `step` is one pass of `Idle -> Sampling -> (Publish | Skip) -> Idle`.
//! The hosting task calls it at a fixed period for its whole lifetime.

use crate::gate::{Decision, GatePolicy, PublishGate};
use crate::source::{ChannelSnapshot, SampleSource};
use crate::task::{Shutdown, TaskSpec, spawn_periodic};
use crate::ticker::Ticker;
use snapbus_icc::{Relax, SnapshotReader, SnapshotWriter};
use snapbus_util::Clock;
use std::io;
use std::thread::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Per-decision tick counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublisherStats {
    pub ticks: u64,
    pub published: u64,
    pub seeds: u64,
    pub health_changes: u64,
    pub changes: u64,
    pub heartbeats: u64,
    pub skipped: u64,
}

impl PublisherStats {
    fn record(&mut self, decision: Decision) {
        self.ticks += 1;
        match decision {
            Decision::Seed => self.seeds += 1,
            Decision::HealthChanged { .. } => self.health_changes += 1,
            Decision::Changed { .. } => self.changes += 1,
            Decision::Heartbeat => self.heartbeats += 1,
            Decision::Skip => self.skipped += 1,
        }
        if decision.should_publish() {
            self.published += 1;
        }
    }
}

/// Owns a source, the writing end of one slot and the gate between them.
pub struct Publisher<S, T: Copy, C, R, const N: usize> {
    label: String,
    source: S,
    writer: SnapshotWriter<T, R>,
    gate: PublishGate<N>,
    clock: C,
    stats: PublisherStats,
}

impl<S, T, C, R, const N: usize> Publisher<S, T, C, R, N>
where
    S: SampleSource,
    T: ChannelSnapshot<N>,
    C: Clock,
    R: Relax,
{
    pub fn new(source: S, writer: SnapshotWriter<T, R>, policy: GatePolicy, clock: C) -> Self {
        Self {
            label: "publisher".to_owned(),
            source,
            writer,
            gate: PublishGate::new(policy),
            clock,
            stats: PublisherStats::default(),
        }
    }

    /// Name used in log lines.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// One sampling tick. Returns what the gate decided.
    pub fn step(&mut self) -> Decision {
        self.source.update();

        // Channels the source does not fill stay at zero.
        let mut values = [0.0f32; N];
        self.source.read(&mut values);
        let healthy = self.source.ok();
        // Stamped at sample time so consumers measure sampling latency, not
        // scheduling jitter.
        let stamp_us = self.clock.now_us();

        let decision = self.gate.tick(&values, healthy, stamp_us);
        match decision {
            Decision::HealthChanged { healthy: false } => {
                warn!(publisher = %self.label, stamp_us, "source unhealthy, publishing failsafe")
            }
            Decision::HealthChanged { healthy: true } => {
                info!(publisher = %self.label, stamp_us, "source healthy again")
            }
            _ => trace!(publisher = %self.label, ?decision, stamp_us, "tick"),
        }

        if decision.should_publish() {
            self.writer.publish(T::compose(&values, healthy, stamp_us));
        }
        self.stats.record(decision);
        decision
    }

    /// Steps once per `ticker` period until `shutdown` trips.
    pub fn run(&mut self, ticker: &mut Ticker, shutdown: &Shutdown) {
        debug!(publisher = %self.label, period = ?ticker.period(), "publisher loop started");
        while !shutdown.is_triggered() {
            self.step();
            ticker.wait();
        }
        debug!(publisher = %self.label, stats = ?self.stats, "publisher loop stopped");
    }

    pub fn reader(&self) -> SnapshotReader<T, R> {
        self.writer.reader()
    }

    pub fn stats(&self) -> PublisherStats {
        self.stats
    }

    pub fn gate(&self) -> &PublishGate<N> {
        &self.gate
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Hosts `publisher` on its own periodic thread.
///
/// The publisher comes back through the join handle once `shutdown` trips,
/// so its stats can be inspected.
pub fn spawn_publisher<S, T, C, R, const N: usize>(
    spec: TaskSpec,
    shutdown: Shutdown,
    publisher: Publisher<S, T, C, R, N>,
) -> io::Result<JoinHandle<Publisher<S, T, C, R, N>>>
where
    S: SampleSource + Send + 'static,
    T: ChannelSnapshot<N> + Send + 'static,
    C: Clock + Send + 'static,
    R: Relax + Send + Sync + 'static,
{
    spawn_periodic(spec, shutdown, publisher, |p| {
        p.step();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Sampled, copy_channels};
    use snapbus_events::{RC_CHANNELS, RcRole, RcSnapshot};
    use snapbus_icc::SnapshotSlot;
    use snapbus_util::ManualClock;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Replays a fixed list of (values, healthy) samples, advancing a shared
    /// clock on every `update` to model time spent in the hardware read.
    struct Scripted<const N: usize> {
        script: VecDeque<([f32; N], bool)>,
        current: ([f32; N], bool),
        clock: ManualClock,
        read_cost: Duration,
        updates: usize,
    }

    impl<const N: usize> Scripted<N> {
        fn new(script: Vec<([f32; N], bool)>, clock: ManualClock) -> Self {
            Self {
                script: script.into(),
                current: ([0.0; N], true),
                clock,
                read_cost: Duration::ZERO,
                updates: 0,
            }
        }
    }

    impl<const N: usize> SampleSource for Scripted<N> {
        fn update(&mut self) {
            self.updates += 1;
            self.clock.advance(self.read_cost);
            if let Some(next) = self.script.pop_front() {
                self.current = next;
            }
        }

        fn read(&self, dst: &mut [f32]) -> usize {
            copy_channels(&self.current.0, dst)
        }

        fn ok(&self) -> bool {
            self.current.1
        }
    }

    #[test]
    fn change_gate_drives_slot_publishes() {
        let clock = ManualClock::new(0);
        let source = Scripted::new(
            vec![([10.0], true), ([12.0], true), ([16.0], true), ([16.1], true)],
            clock.clone(),
        );
        let (writer, reader) = SnapshotSlot::channel(Sampled::<1>::default());
        let mut publisher = Publisher::new(
            source,
            writer,
            GatePolicy::new(5.0, Duration::ZERO),
            clock.clone(),
        );

        let mut seqs = Vec::new();
        for _ in 0..4 {
            publisher.step();
            seqs.push(reader.sequence());
            clock.advance(Duration::from_millis(10));
        }

        // Publishes on samples 1 and 3 only.
        assert_eq!(seqs, vec![2, 2, 4, 4]);
        assert_eq!(reader.read().values, [16.0]);

        let stats = publisher.stats();
        assert_eq!(stats.ticks, 4);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.seeds, 1);
        assert_eq!(stats.changes, 1);
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn failsafe_transition_publishes_immediately() {
        let clock = ManualClock::new(0);
        let mut steady = [0.0; RC_CHANNELS];
        steady[RcRole::Speed.index()] = 30.0;
        let source = Scripted::new(
            vec![(steady, true), (steady, true), (steady, false)],
            clock.clone(),
        );
        let (writer, reader) = SnapshotSlot::channel(RcSnapshot::default());
        let mut publisher = Publisher::new(
            source,
            writer,
            GatePolicy::new(f32::INFINITY, Duration::from_secs(60)),
            clock.clone(),
        )
        .with_label("rc");

        assert_eq!(publisher.step(), Decision::Seed);
        assert_eq!(publisher.step(), Decision::Skip);
        assert_eq!(
            publisher.step(),
            Decision::HealthChanged { healthy: false }
        );

        let snap = reader.read();
        assert!(snap.failsafe);
        assert_eq!(snap.get(RcRole::Speed), 30.0);
        assert_eq!(publisher.stats().health_changes, 1);
    }

    #[test]
    fn stamp_is_taken_after_sampling() {
        let clock = ManualClock::new(1_000);
        let mut source = Scripted::new(vec![([1.0, 2.0], true)], clock.clone());
        source.read_cost = Duration::from_micros(250);
        let (writer, reader) = SnapshotSlot::channel(Sampled::<2>::default());
        let mut publisher = Publisher::new(source, writer, GatePolicy::always(), clock.clone());

        publisher.step();
        // Publishing happens later than the stamp; the stamp must not move.
        clock.advance(Duration::from_millis(5));

        let snap = reader.read();
        assert_eq!(snap.stamp_us, 1_250);
        assert_eq!(snap.values, [1.0, 2.0]);
        assert!(snap.healthy);
    }

    #[test]
    fn short_source_leaves_extra_channels_zero() {
        let clock = ManualClock::new(0);
        let source = Scripted::new(vec![([7.0], true)], clock.clone());

        struct Widen(Scripted<1>);
        impl SampleSource for Widen {
            fn update(&mut self) {
                self.0.update();
            }
            fn read(&self, dst: &mut [f32]) -> usize {
                self.0.read(dst)
            }
            fn ok(&self) -> bool {
                self.0.ok()
            }
        }

        let (writer, reader) = SnapshotSlot::channel(Sampled::<3>::default());
        let mut publisher = Publisher::new(Widen(source), writer, GatePolicy::always(), clock);
        publisher.step();
        assert_eq!(reader.read().values, [7.0, 0.0, 0.0]);
    }

    #[test]
    fn run_stops_on_shutdown() {
        let clock = ManualClock::new(0);
        let source = Scripted::new(vec![([1.0], true)], clock.clone());
        let (writer, _reader) = SnapshotSlot::channel(Sampled::<1>::default());
        let mut publisher = Publisher::new(source, writer, GatePolicy::always(), clock);

        let shutdown = Shutdown::new();
        shutdown.trigger();
        publisher.run(&mut Ticker::new(Duration::from_millis(1)), &shutdown);
        assert_eq!(publisher.stats().ticks, 0);
        assert_eq!(publisher.source().updates, 0);
    }
}
