mod board;
mod frame;

use anyhow::Context;
use board::{BoardReader, BoardWriter, TEAR_WINDOW};
use clap::{Parser, ValueEnum};
use frame::{Frame, umpire_call};
use snapbus_publisher::{Shutdown, TaskSpec, spawn_periodic};
use snapbus_util::mono_now_us;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PUB_PERIOD: Duration = Duration::from_millis(1000 / 30);
const UI_PERIOD: Duration = Duration::from_millis(1000 / 30);
/// Simulated render work done after the copy, outside any lock.
const UI_RENDER: Duration = Duration::from_micros(420);

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Fields written one at a time with no frame-level protection.
    Race,
    /// Whole frame copied under a mutex.
    Mutex,
    /// Frame published through a snapshot slot.
    Snapshot,
}

/// Scoreboard demo: a writer task updates a frame, a UI task copies it and
/// counts torn frames per second.
#[derive(Parser, Debug)]
#[command(name = "scoreboard")]
struct Args {
    #[arg(short, long, value_enum, default_value_t = Mode::Snapshot)]
    mode: Mode,

    #[arg(short, long, default_value_t = 10)]
    duration_secs: u64,
}

#[derive(Debug, Default)]
struct UiState {
    reads: u64,
    torn: u64,
    eps: u64,
    window_start: Option<Instant>,
    max_lat_us: u64,
    max_age_ms: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let initial = Frame::default();
    let duration = Duration::from_secs(args.duration_secs);
    let ui = match args.mode {
        Mode::Race => {
            let (w, r) = board::race(initial, TEAR_WINDOW);
            run(args.mode, w, r, duration)?
        }
        Mode::Mutex => {
            let (w, r) = board::mutex(initial);
            run(args.mode, w, r, duration)?
        }
        Mode::Snapshot => {
            let (w, r) = board::snapshot(initial);
            run(args.mode, w, r, duration)?
        }
    };

    info!(
        mode = ?args.mode,
        reads = ui.reads,
        torn = ui.torn,
        max_lat_us = ui.max_lat_us,
        max_age_ms = ui.max_age_ms,
        "run finished"
    );
    Ok(())
}

fn run<W: BoardWriter, R: BoardReader>(
    mode: Mode,
    writer: W,
    reader: R,
    duration: Duration,
) -> anyhow::Result<UiState> {
    let shutdown = Shutdown::new();
    let epoch = Instant::now();

    let writer_task = spawn_periodic(
        TaskSpec::new("writer", PUB_PERIOD),
        shutdown.clone(),
        writer,
        move |w| {
            let t_ms = epoch.elapsed().as_millis() as u64;
            w.write(Frame::at(t_ms, mono_now_us()));
        },
    )
    .context("spawning writer")?;

    let ui_task = spawn_periodic(
        TaskSpec::new("ui", UI_PERIOD),
        shutdown.clone(),
        (reader, UiState::default()),
        move |(reader, ui)| {
            let t0 = Instant::now();
            let f = reader.read();
            let lat_us = t0.elapsed().as_micros() as u64;
            std::thread::sleep(UI_RENDER);

            if !f.is_consistent() {
                ui.eps += 1;
                ui.torn += 1;
            }
            let age_ms = f.age_ms(mono_now_us());
            ui.reads += 1;
            ui.max_lat_us = ui.max_lat_us.max(lat_us);
            ui.max_age_ms = ui.max_age_ms.max(age_ms);

            let now = Instant::now();
            let window = ui.window_start.get_or_insert(now);
            if now.duration_since(*window) >= Duration::from_secs(1) {
                info!(
                    ?mode,
                    eps = ui.eps,
                    lat_us,
                    age_ms,
                    score = f.score,
                    inning = f.inning,
                    call = umpire_call(epoch.elapsed().as_millis() as u64),
                    "tick"
                );
                ui.eps = 0;
                ui.window_start = Some(now);
            }
        },
    )
    .context("spawning ui")?;

    std::thread::sleep(duration);
    shutdown.trigger();
    writer_task
        .join()
        .map_err(|_| anyhow::anyhow!("writer panicked"))?;
    let (_, ui) = ui_task.join().map_err(|_| anyhow::anyhow!("ui panicked"))?;
    Ok(ui)
}
