use std::hint::black_box;
use std::mem::{align_of, size_of};
use std::time::{Duration, Instant};

use snapbus_events::{ControlSnapshot, InputState, RC_CHANNELS, RcSnapshot};
use snapbus_icc::{DEFAULT_SPIN_LIMIT, SnapshotSlot};
use snapbus_perf::*;
use snapbus_publisher::{GatePolicy, PublishGate};
use snapbus_util::mono_now_us;

const CONTENTION_PUBLISHES: usize = 200_000;

fn main() {
    let rusage_start = capture_rusage();
    let ncpu = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    let mut results: Vec<BenchResult> = Vec::new();

    print_banner(ncpu);
    section_memory_layout();
    section_clock(&mut results);
    section_slot(&mut results);
    section_gate(&mut results);
    let contention = section_contention(ncpu);

    let rusage_end = capture_rusage();
    section_resources(&rusage_start, &rusage_end);

    save_results(&results, &contention, ncpu, &rusage_start, &rusage_end);
}

fn print_banner(ncpu: usize) {
    let bar = "\u{2550}".repeat(90);
    println!("\n{bar}");
    println!("  SNAPBUS PERFORMANCE REPORT");
    println!("  slot micro + gate + publish latency under reader contention");
    println!("{bar}\n");

    let os = run_cmd("uname", &["-srm"]).unwrap_or_else(|| "unknown".into());
    println!("  OS:    {}", os.trim());
    println!("  CPUs:  {ncpu}");
}

fn section_memory_layout() {
    section_header("MEMORY LAYOUT");

    println!("  {:<34} {:>8} {:>8} {:>12}", "Type", "Size", "Align", "Cache Lines");
    println!("  {}", "\u{2500}".repeat(66));

    let rows: &[(&str, usize, usize)] = &[
        ("RcSnapshot", size_of::<RcSnapshot>(), align_of::<RcSnapshot>()),
        ("InputState", size_of::<InputState>(), align_of::<InputState>()),
        (
            "ControlSnapshot",
            size_of::<ControlSnapshot>(),
            align_of::<ControlSnapshot>(),
        ),
        (
            "SnapshotSlot<RcSnapshot>",
            size_of::<SnapshotSlot<RcSnapshot>>(),
            align_of::<SnapshotSlot<RcSnapshot>>(),
        ),
    ];
    for &(name, size, align) in rows {
        println!(
            "  {:<34} {:>6} B {:>6} B {:>12}",
            name,
            size,
            align,
            size.div_ceil(64)
        );
    }
}

fn section_clock(results: &mut Vec<BenchResult>) {
    section_header("CLOCK CALIBRATION");
    print_table_header();

    for r in [
        measure_batched("mono_now_us()", 1000, 10_000, 100, || {
            black_box(mono_now_us());
        }),
        measure_batched("Instant::now()", 1000, 10_000, 100, || {
            black_box(Instant::now());
        }),
    ] {
        print_result_row(&r);
        results.push(r);
    }
}

fn section_slot(results: &mut Vec<BenchResult>) {
    section_header("SNAPSHOT SLOT (single thread)");
    print_table_header();

    let (mut writer, reader) = SnapshotSlot::channel(RcSnapshot::default());
    let mut i = 0u64;
    let publish = measure_batched("publish RcSnapshot", 1000, 10_000, 100, || {
        i += 1;
        writer.publish(black_box(make_test_rc(i)));
    });
    let read = measure_batched("read RcSnapshot", 1000, 10_000, 100, || {
        black_box(reader.read());
    });
    let seq = measure_batched("sequence", 1000, 10_000, 100, || {
        black_box(reader.sequence());
    });

    for r in [publish, read, seq] {
        print_result_row(&r);
        results.push(r);
    }
}

fn section_gate(results: &mut Vec<BenchResult>) {
    section_header("PUBLISH GATE");
    print_table_header();

    let mut gate =
        PublishGate::<RC_CHANNELS>::new(GatePolicy::new(0.5, Duration::from_millis(200)));
    let values = [12.0f32; RC_CHANNELS];
    let mut now_us = 0u64;
    let r = measure_batched("gate tick (steady input)", 1000, 10_000, 100, || {
        now_us += 10_000;
        black_box(gate.tick(&values, true, now_us));
    });
    print_result_row(&r);
    results.push(r);
}

fn section_contention(ncpu: usize) -> Vec<ContentionResult> {
    section_header("PUBLISH LATENCY UNDER READER CONTENTION");

    println!(
        "  {:<8} {:>8} {:>8} {:>8} {:>8} {:>12} {:>10} {:>10}",
        "readers", "p50", "p99", "p99.9", "max", "reads", "retry%", "yields"
    );
    println!("  {}", "\u{2500}".repeat(84));

    // Leave one core for the writer.
    let max_readers = ncpu.saturating_sub(1).clamp(1, 8);
    let mut out = Vec::new();
    for readers in 0..=max_readers {
        let r = measure_publish_contention(readers, CONTENTION_PUBLISHES, DEFAULT_SPIN_LIMIT);
        println!(
            "  {:<8} {:>8} {:>8} {:>8} {:>8} {:>12} {:>9.3}% {:>10}",
            r.readers,
            r.publish_ns.p50,
            r.publish_ns.p99,
            r.publish_ns.p999,
            r.publish_ns.max,
            r.reads,
            r.retry_ratio() * 100.0,
            r.yields,
        );
        out.push(r);
    }

    println!("\n  * Latencies in ns per publish; readers never take a lock the writer waits on.");
    out
}

fn section_resources(start: &ResourceSnapshot, end: &ResourceSnapshot) {
    section_header("RESOURCE USAGE");

    println!(
        "  Peak RSS:                    {}",
        format_bytes(end.max_rss_bytes as u64)
    );
    println!(
        "  Voluntary ctx switches:      {}",
        end.vol_ctx_switches.saturating_sub(start.vol_ctx_switches)
    );
    println!(
        "  Involuntary ctx switches:    {}",
        end.invol_ctx_switches.saturating_sub(start.invol_ctx_switches)
    );
    println!(
        "  User CPU time:               {:.3}s",
        end.user_time_us.saturating_sub(start.user_time_us) as f64 / 1e6
    );
    println!(
        "  System CPU time:             {:.3}s",
        end.sys_time_us.saturating_sub(start.sys_time_us) as f64 / 1e6
    );
}

fn save_results(
    results: &[BenchResult],
    contention: &[ContentionResult],
    ncpu: usize,
    rusage_start: &ResourceSnapshot,
    rusage_end: &ResourceSnapshot,
) {
    let timestamp = run_cmd("date", &["+%Y%m%d_%H%M%S"])
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".into());

    let results_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/results");
    let _ = std::fs::create_dir_all(results_dir);
    let json_path = format!("{results_dir}/{timestamp}_report.json");

    let output = serde_json::json!({
        "report_type": "snapbus",
        "timestamp": timestamp,
        "ncpu": ncpu,
        "micro_benchmarks": results,
        "contention": contention,
        "resources": {
            "start": rusage_start,
            "end": rusage_end,
        },
    });

    let written = serde_json::to_string_pretty(&output)
        .map_err(std::io::Error::other)
        .and_then(|json| std::fs::write(&json_path, json));
    match written {
        Ok(()) => println!("\n  Results saved to: {json_path}\n"),
        Err(e) => eprintln!("\n  [failed to save results: {e}]\n"),
    }
}

fn run_cmd(cmd: &str, args: &[&str]) -> Option<String> {
    let out = std::process::Command::new(cmd).args(args).output().ok()?;
    if out.status.success() {
        String::from_utf8(out.stdout).ok()
    } else {
        None
    }
}
