use snapbus_events::RcSnapshot;
use snapbus_icc::{SnapshotSlot, ThreadYield};
use std::hint::black_box;
use std::sync::Barrier;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

// ─── Statistics ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub stddev: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BenchResult {
    pub name: String,
    pub unit: String,
    pub stats: Stats,
}

/// Sorts `samples` in place and summarizes them. Panics on an empty slice.
pub fn compute_stats(samples: &mut [u64]) -> Stats {
    assert!(!samples.is_empty(), "cannot compute stats on empty samples");
    samples.sort_unstable();

    let count = samples.len();
    let mean = samples.iter().map(|&x| x as f64).sum::<f64>() / count as f64;
    let variance = samples
        .iter()
        .map(|&x| (x as f64 - mean).powi(2))
        .sum::<f64>()
        / count as f64;

    Stats {
        min: samples[0],
        max: samples[count - 1],
        mean,
        stddev: variance.sqrt(),
        p50: nearest_rank(samples, 50.0),
        p90: nearest_rank(samples, 90.0),
        p99: nearest_rank(samples, 99.0),
        p999: nearest_rank(samples, 99.9),
        count,
    }
}

fn nearest_rank(sorted: &[u64], pct: f64) -> u64 {
    let rank = (pct / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

// ─── Measurement Harness ────────────────────────────────────────────────────

/// Times `batches` runs of `batch_size` calls and records the per-call mean of
/// each batch, amortizing clock overhead.
pub fn measure_batched<F: FnMut()>(
    name: &str,
    batches: usize,
    batch_size: usize,
    warmup: usize,
    mut f: F,
) -> BenchResult {
    for _ in 0..warmup * batch_size {
        f();
    }

    let mut samples: Vec<u64> = (0..batches)
        .map(|_| {
            let start = Instant::now();
            for _ in 0..batch_size {
                f();
            }
            let per_op = start.elapsed().as_nanos() / batch_size as u128;
            (per_op as u64).max(1)
        })
        .collect();

    BenchResult {
        name: name.to_string(),
        unit: "ns/op".to_string(),
        stats: compute_stats(&mut samples),
    }
}

// ─── Contention ─────────────────────────────────────────────────────────────

/// Publish latency with `readers` threads spinning on the same slot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContentionResult {
    pub readers: usize,
    pub spin_limit: u32,
    pub publish_ns: Stats,
    pub reads: u64,
    pub retries: u64,
    pub yields: u64,
}

impl ContentionResult {
    /// Share of reads that had to retry at least once.
    pub fn retry_ratio(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.retries as f64 / self.reads as f64
        }
    }
}

pub fn make_test_rc(i: u64) -> RcSnapshot {
    RcSnapshot {
        out: std::array::from_fn(|ch| (i as f32) + ch as f32 * 0.5),
        failsafe: i % 64 == 0,
        stamp_us: i,
    }
}

/// Publishes `publishes` RC frames while `readers` threads copy the slot in a
/// tight loop, timing every publish individually.
pub fn measure_publish_contention(
    readers: usize,
    publishes: usize,
    spin_limit: u32,
) -> ContentionResult {
    let slot = SnapshotSlot::with_relax(make_test_rc(0), ThreadYield, spin_limit);
    let (mut writer, reader) = slot.into_channel();
    let done = AtomicBool::new(false);
    let start = Barrier::new(readers + 1);

    let (mut samples, totals) = std::thread::scope(|s| {
        let handles: Vec<_> = (0..readers)
            .map(|_| {
                let reader = reader.clone();
                let done = &done;
                let start = &start;
                s.spawn(move || {
                    start.wait();
                    let mut reads = 0u64;
                    let (mut retries, mut yields) = (0u64, 0u64);
                    while !done.load(Ordering::Acquire) {
                        let (snap, stats) = reader.read_with_stats();
                        black_box(snap);
                        retries += u64::from(stats.retries);
                        yields += u64::from(stats.yields);
                        reads += 1;
                    }
                    (reads, retries, yields)
                })
            })
            .collect();

        start.wait();
        let mut samples = Vec::with_capacity(publishes);
        for i in 0..publishes as u64 {
            let frame = make_test_rc(i + 1);
            let t0 = Instant::now();
            writer.publish(black_box(frame));
            samples.push(t0.elapsed().as_nanos() as u64);
        }
        done.store(true, Ordering::Release);

        let totals = handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .fold((0u64, 0u64, 0u64), |acc, (reads, retries, yields)| {
                (acc.0 + reads, acc.1 + retries, acc.2 + yields)
            });
        (samples, totals)
    });

    let (reads, retries, yields) = totals;
    ContentionResult {
        readers,
        spin_limit,
        publish_ns: compute_stats(&mut samples),
        reads,
        retries,
        yields,
    }
}

// ─── Resource Usage ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, serde::Serialize)]
pub struct ResourceSnapshot {
    pub max_rss_bytes: i64,
    pub vol_ctx_switches: i64,
    pub invol_ctx_switches: i64,
    pub user_time_us: i64,
    pub sys_time_us: i64,
}

pub fn capture_rusage() -> ResourceSnapshot {
    // SAFETY: rusage is plain data and getrusage only writes into it.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    #[cfg(target_os = "linux")]
    let max_rss_bytes = usage.ru_maxrss * 1024;
    #[cfg(not(target_os = "linux"))]
    let max_rss_bytes = usage.ru_maxrss;
    ResourceSnapshot {
        max_rss_bytes,
        vol_ctx_switches: usage.ru_nvcsw,
        invol_ctx_switches: usage.ru_nivcsw,
        user_time_us: usage.ru_utime.tv_sec * 1_000_000 + usage.ru_utime.tv_usec as i64,
        sys_time_us: usage.ru_stime.tv_sec * 1_000_000 + usage.ru_stime.tv_usec as i64,
    }
}

// ─── Display ────────────────────────────────────────────────────────────────

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    match bytes {
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

pub fn print_table_header() {
    println!(
        "  {:<34} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  unit",
        "Benchmark", "min", "p50", "p90", "p99", "p99.9", "max",
    );
    println!("  {}", "─".repeat(96));
}

pub fn print_result_row(r: &BenchResult) {
    println!(
        "  {:<34} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  {}",
        r.name,
        r.stats.min,
        r.stats.p50,
        r.stats.p90,
        r.stats.p99,
        r.stats.p999,
        r.stats.max,
        r.unit,
    );
}

pub fn section_header(title: &str) {
    println!("\n{}", "─".repeat(90));
    println!("  {title}");
    println!("{}\n", "─".repeat(90));
}
