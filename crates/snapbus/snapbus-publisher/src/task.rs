//! Hosting for periodic tasks on OS threads.

use crate::ticker::Ticker;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// Cooperative stop signal shared by a host and its tasks.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Name, stack and cadence of a periodic task.
#[derive(Clone, Debug)]
pub struct TaskSpec {
    pub name: String,
    pub stack_size: usize,
    pub period: Duration,
}

impl TaskSpec {
    pub const DEFAULT_STACK: usize = 64 * 1024;

    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            stack_size: Self::DEFAULT_STACK,
            period,
        }
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }
}

/// Runs `step(&mut state)` once per period on a named thread until
/// `shutdown` trips (at least once), then hands `state` back through the join handle.
pub fn spawn_periodic<S, F>(
    spec: TaskSpec,
    shutdown: Shutdown,
    mut state: S,
    mut step: F,
) -> io::Result<JoinHandle<S>>
where
    S: Send + 'static,
    F: FnMut(&mut S) + Send + 'static,
{
    let TaskSpec {
        name,
        stack_size,
        period,
    } = spec;

    std::thread::Builder::new()
        .name(name.clone())
        .stack_size(stack_size)
        .spawn(move || {
            debug!(task = %name, ?period, "task started");
            let mut ticker = Ticker::new(period);
            let mut overruns = 0u64;
            loop {
                step(&mut state);
                if shutdown.is_triggered() {
                    break;
                }
                overruns += u64::from(ticker.wait());
            }
            debug!(task = %name, overruns, "task stopped");
            state
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_until_shutdown_and_returns_state() {
        let shutdown = Shutdown::new();
        let handle = spawn_periodic(
            TaskSpec::new("counter", Duration::from_millis(1)),
            shutdown.clone(),
            0u32,
            |n| *n += 1,
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(30));
        shutdown.trigger();
        let count = handle.join().unwrap();
        assert!(count > 0);
    }

    #[test]
    fn thread_carries_task_name() {
        let shutdown = Shutdown::new();
        let handle = spawn_periodic(
            TaskSpec::new("rc-pub", Duration::from_millis(1)).stack_size(128 * 1024),
            shutdown.clone(),
            None::<String>,
            |name| *name = std::thread::current().name().map(str::to_owned),
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(10));
        shutdown.trigger();
        assert_eq!(handle.join().unwrap().as_deref(), Some("rc-pub"));
    }
}
