mod sim;

use anyhow::Context;
use clap::Parser;
use sim::{SimulatedButtons, SimulatedRcLink};
use snapbus_config::RoverConfig;
use snapbus_control::{ControlCore, FailsafeMonitor};
use snapbus_events::{ControlSnapshot, InputState, RcSnapshot};
use snapbus_icc::{SnapshotSlot, ThreadYield};
use snapbus_publisher::{GatePolicy, Publisher, Shutdown, TaskSpec, spawn_periodic, spawn_publisher};
use snapbus_util::{MonotonicClock, mono_now_ms32, mono_now_us};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Host simulation of the vehicle's task set wired through snapshot buses.
#[derive(Parser, Debug)]
#[command(name = "rover")]
struct Args {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many seconds (runs until Ctrl-C when omitted).
    #[arg(short, long)]
    duration_secs: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => RoverConfig::load(path.display().to_string())
            .with_context(|| format!("loading {}", path.display()))?,
        None => RoverConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_thread_names(true).init();

    info!(?cfg, "rover starting");
    let spin_limit = cfg.slot.spin_limit;

    // Seed every bus before any consumer starts so nobody acts on zeroes.
    let buttons = SimulatedButtons::new();
    let mut input_slot = SnapshotSlot::with_relax(InputState::default(), ThreadYield, spin_limit);
    input_slot.seed(buttons.scan());
    let (mut input_writer, input_reader) = input_slot.into_channel();

    let mut control_slot =
        SnapshotSlot::with_relax(ControlSnapshot::default(), ThreadYield, spin_limit);
    control_slot.seed(ControlCore::<ThreadYield>::resolve(&input_reader.peek()));
    let (control_writer, control_reader) = control_slot.into_channel();

    let mut rc_slot = SnapshotSlot::with_relax(RcSnapshot::default(), ThreadYield, spin_limit);
    rc_slot.seed(RcSnapshot {
        failsafe: true,
        stamp_us: mono_now_us(),
        ..RcSnapshot::default()
    });
    let (rc_writer, rc_reader) = rc_slot.into_channel();

    let shutdown = Shutdown::new();

    let rc_publisher = Publisher::new(
        SimulatedRcLink::new(Duration::from_secs(6), Duration::from_millis(800)),
        rc_writer,
        GatePolicy::new(cfg.rc.epsilon, cfg.rc.min_interval()),
        MonotonicClock,
    )
    .with_label("rc");
    let rc_task = spawn_publisher(
        TaskSpec::new("rc-pub", cfg.rc.period()).stack_size(cfg.rc.stack_size),
        shutdown.clone(),
        rc_publisher,
    )
    .context("spawning rc publisher")?;

    let input_task = spawn_periodic(
        TaskSpec::new("input", cfg.input.period()).stack_size(cfg.input.stack_size),
        shutdown.clone(),
        buttons,
        move |buttons| input_writer.publish(buttons.scan()),
    )
    .context("spawning input scanner")?;

    let control_task = spawn_periodic(
        TaskSpec::new("control", cfg.control.period()).stack_size(cfg.control.stack_size),
        shutdown.clone(),
        ControlCore::new(input_reader, control_writer),
        |core| {
            core.step();
        },
    )
    .context("spawning control core")?;

    let monitor = FailsafeMonitor::new(rc_reader, cfg.rc.stale_after());
    let monitor_task = spawn_periodic(
        TaskSpec::new("monitor", cfg.control.period()),
        shutdown.clone(),
        (monitor, false),
        |(monitor, stale)| {
            monitor.poll();
            let now_stale = monitor.is_stale(mono_now_us());
            if now_stale && !*stale {
                warn!("rc bus stale, producer stalled");
            }
            *stale = now_stale;
        },
    )
    .context("spawning failsafe monitor")?;

    let mut status_seen = 0u32;
    let deadline = args.duration_secs.map(Duration::from_secs);
    let started = std::time::Instant::now();
    loop {
        std::thread::sleep(Duration::from_secs(1));
        let seq = control_reader.sequence();
        if seq != status_seen {
            status_seen = seq;
            let cmd = control_reader.peek();
            info!(
                throttle = cmd.throttle_cmd_pct,
                horn = cmd.horn_cmd,
                indicator = ?cmd.indicator_cmd,
                age_ms = mono_now_ms32().wrapping_sub(cmd.stamp_ms),
                "control"
            );
        }
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
    }

    shutdown.trigger();
    let rc = rc_task
        .join()
        .map_err(|_| anyhow::anyhow!("rc publisher panicked"))?;
    input_task
        .join()
        .map_err(|_| anyhow::anyhow!("input scanner panicked"))?;
    control_task
        .join()
        .map_err(|_| anyhow::anyhow!("control core panicked"))?;
    let (monitor, _) = monitor_task
        .join()
        .map_err(|_| anyhow::anyhow!("failsafe monitor panicked"))?;

    info!(stats = ?rc.stats(), failsafe = monitor.in_failsafe(), "rover stopped");
    Ok(())
}
