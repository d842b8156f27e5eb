//! Example: Peak Single-Precision FLOP/s, Timed vs Counted
//!
//! Runs a fused multiply-add kernel on every worker twice:
//!
//! 1. **Manual**: each worker times its own loop of `num_iter` kernel calls;
//!    per-worker flops and MFLOP/s are summed
//! 2. **Counted**: the same budget goes through [`MetricGroupScheduler`], split
//!    across the 7 counter groups, with a software counter backend reporting
//!    retired vector instructions and MFLOP/s for the `FLOPS_SP` group
//!
//! The CSV line printed at the end compares the two; the difference factors
//! grow when `num_iter` is small or not a multiple of the group count.
//!
//! **Usage**:
//! ```text
//! cargo run --release --example peakflops -- <array_n> <num_iter>
//! ```
//!
//! **Outputs** (under the system temp directory, `satmap_peakflops/`):
//! - `peakflops_sp.json`: results document
//! - `peakflops_sp.svg`: saturation diagram

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use satmap::measure::{
    CaptureBackend, CaptureConfig, CaptureReport, MetricGroupScheduler, MetricKind, RegionAggregator,
    RegionReport, SchedulerConfig, ThreadReport,
};
use satmap::measure::scheduler::RECOMMENDED_MIN_BUDGET;
use satmap::output::{render_diagram, Exporter, JsonExporter};
use satmap::results::{session_info, SP_OPS_PER_VECTOR};
use satmap::{ExperientialProfile, SessionResults};

const CSV_HEADER: &str =
    "array_n,array_size_bytes,num_i,manual_flops,measured_flops,manual_rate,measured_rate,flops_diff,rate_diff";

const REGION: &str = "peakflops_sp";
const FLOPS_GROUP: &str = "FLOPS_SP";

/// Fused multiply-adds per array element
const FMA_PER_ELEMENT: usize = 15;
/// Counted flops per array element (the running sum is not counted)
const FLOPS_PER_ELEMENT: u64 = 2 * FMA_PER_ELEMENT as u64;

// =================================================================================================
// Kernel
// =================================================================================================

fn peakflops_sp(array: &[f32]) -> f32 {
    let mut acc = 0.0f32;
    for &x in array {
        let mut a = x;
        for _ in 0..FMA_PER_ELEMENT {
            a = a.mul_add(0.999_99, 1.0e-5);
        }
        acc += a;
    }
    acc
}

// =================================================================================================
// Software counter backend
// =================================================================================================

/// Flops executed per hardware thread since the last `open`
#[derive(Debug, Default)]
struct FlopCounters {
    per_thread: Mutex<BTreeMap<usize, u64>>,
}

impl FlopCounters {
    fn add(&self, thread: usize, flops: u64) {
        *self.per_thread.lock().entry(thread).or_insert(0) += flops;
    }

    fn take(&self) -> BTreeMap<usize, u64> {
        std::mem::take(&mut *self.per_thread.lock())
    }
}

/// Capture backend fed by the workload itself
///
/// Only the `FLOPS_SP` group reports anything, the way a hardware group only
/// reports the events it programs.
#[derive(Debug, Default)]
struct SoftwareCounterBackend {
    counters: Arc<FlopCounters>,
    group: String,
    registered: Mutex<BTreeSet<String>>,
    running: Mutex<BTreeMap<(String, usize), Instant>>,
    elapsed: Mutex<BTreeMap<(String, usize), f64>>,
}

impl SoftwareCounterBackend {
    fn new(counters: Arc<FlopCounters>) -> Self {
        Self {
            counters,
            ..Self::default()
        }
    }
}

impl CaptureBackend for SoftwareCounterBackend {
    fn open(&mut self, config: &CaptureConfig) -> satmap::Result<()> {
        self.group = config.event_group.clone();
        self.counters.take();
        self.elapsed.lock().clear();
        Ok(())
    }

    fn register_region(&self, tag: &str, _thread: usize) -> satmap::Result<()> {
        self.registered.lock().insert(tag.to_string());
        Ok(())
    }

    fn start_region(&self, tag: &str, thread: usize) -> satmap::Result<()> {
        if !self.registered.lock().contains(tag) {
            return Err(satmap::Error::capture(format!("region '{tag}' started before registration")));
        }
        self.running.lock().insert((tag.to_string(), thread), Instant::now());
        Ok(())
    }

    fn stop_region(&self, tag: &str, thread: usize) -> satmap::Result<f64> {
        let key = (tag.to_string(), thread);
        let started = self
            .running
            .lock()
            .remove(&key)
            .ok_or_else(|| satmap::Error::capture(format!("region '{tag}' stopped on thread {thread} without start")))?;
        let secs = started.elapsed().as_secs_f64();
        self.elapsed.lock().insert(key, secs);
        Ok(secs)
    }

    fn next_group(&mut self) -> satmap::Result<()> {
        Ok(())
    }

    fn read_results(&mut self) -> satmap::Result<CaptureReport> {
        if self.group != FLOPS_GROUP {
            return Ok(CaptureReport::default());
        }

        let flops = self.counters.take();
        let mut regions: BTreeMap<String, Vec<ThreadReport>> = BTreeMap::new();

        for ((tag, thread), secs) in self.elapsed.lock().iter() {
            let count = flops.get(thread).copied().unwrap_or(0) as f64;
            let vector = MetricKind::SpVectorInstructions.external_name().into_owned();
            let rate = MetricKind::SpFlopRate.external_name().into_owned();

            regions.entry(tag.clone()).or_default().push(ThreadReport {
                thread: *thread,
                events: BTreeMap::from([(vector, Some(count / SP_OPS_PER_VECTOR))]),
                metrics: BTreeMap::from([(rate, Some(count * 1.0e-6 / secs))]),
            });
        }

        Ok(CaptureReport {
            regions: regions
                .into_iter()
                .map(|(tag, threads)| RegionReport { tag, group: 0, threads })
                .collect(),
        })
    }
}

// =================================================================================================
// Main
// =================================================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let (Some(n), Some(num_i)) = (
        args.get(1).and_then(|a| a.parse::<usize>().ok()),
        args.get(2).and_then(|a| a.parse::<u64>().ok()),
    ) else {
        eprintln!("usage: {} <array_n> <num_iter>", args[0]);
        println!("{CSV_HEADER}");
        return Ok(());
    };

    let bytes = n * std::mem::size_of::<f32>();
    let scheduler = MetricGroupScheduler::new(SchedulerConfig::default())?;
    let threads = scheduler.config().threads.clone();
    let groups = scheduler.config().groups.len() as u64;

    if num_i < RECOMMENDED_MIN_BUDGET {
        eprintln!(
            "WARNING: num_i should be above {RECOMMENDED_MIN_BUDGET} to minimize error. \
             The counted kernel runs num_i / {groups} times per group, so the integer \
             division error will be high."
        );
    }

    eprintln!("═══════════════════════════════════════════════════════");
    eprintln!("  Peak SP FLOP/s: manual timing vs counters");
    eprintln!("═══════════════════════════════════════════════════════\n");
    eprintln!("array n: {n} array size bytes: {bytes} num iterations: {num_i}");
    eprintln!("workers: {}\n", threads.len());

    let array: Vec<f32> = (0..n).map(|i| 1.0 + (i % 7) as f32 * 0.125).collect();

    // ====== Manual timing ======

    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads.len()).build()?;
    let per_worker: Vec<(f64, f64)> = pool.broadcast(|_| {
        let start = Instant::now();
        for _ in 0..num_i {
            black_box(peakflops_sp(black_box(&array)));
        }
        let secs = start.elapsed().as_secs_f64();
        let flops = (num_i * n as u64 * FLOPS_PER_ELEMENT) as f64;
        (flops, flops * 1.0e-6 / secs)
    });
    let manual_flops: f64 = per_worker.iter().map(|(flops, _)| flops).sum();
    let manual_rate: f64 = per_worker.iter().map(|(_, rate)| rate).sum();

    // ====== Counted ======

    let counters = Arc::new(FlopCounters::default());
    let mut session = RegionAggregator::open(SoftwareCounterBackend::new(Arc::clone(&counters)));
    let per_call = n as u64 * FLOPS_PER_ELEMENT;

    let outcome = scheduler.run(&mut session, REGION, num_i, |ctx| {
        black_box(peakflops_sp(black_box(&array)));
        counters.add(ctx.thread, per_call);
    })?;
    if !outcome.is_completed() {
        return Err("budget too small for the counter groups".into());
    }

    let aggregates = session.compute_aggregates()?;
    let vector = aggregates
        .value(REGION, MetricKind::SpVectorInstructions)
        .unwrap_or(0.0);
    // one group ran 1/groups of the budget
    let measured_flops = vector * SP_OPS_PER_VECTOR * groups as f64;
    let measured_rate = aggregates.value(REGION, MetricKind::SpFlopRate).unwrap_or(0.0);

    // ====== Report ======

    let profile = ExperientialProfile::default();
    let parameters = format!("array n: {n} array size bytes: {bytes} num iterations: {num_i}");
    let results = SessionResults::from_aggregator(&session, &profile, session_info(&profile, &threads, parameters))?;
    eprintln!("{}", results.aggregate_report());
    eprintln!("{}", results.saturation_report());

    let out_dir = std::env::temp_dir().join("satmap_peakflops");
    std::fs::create_dir_all(&out_dir)?;
    let json = out_dir.join(format!("{REGION}.json"));
    JsonExporter::default().export(&results, &json)?;
    let svg = out_dir.join(format!("{REGION}.svg"));
    render_diagram(&results.to_diagram_input(), REGION, &profile, &svg, None)?;
    eprintln!("  → {:?}", json);
    eprintln!("  → {:?}\n", svg);

    session.close()?;

    println!("{CSV_HEADER}");
    println!(
        "{},{},{},{},{},{},{},{},{}",
        n,
        bytes,
        num_i,
        manual_flops,
        measured_flops,
        manual_rate,
        measured_rate,
        (manual_flops - measured_flops).abs() / manual_flops,
        (manual_rate - measured_rate).abs() / manual_rate
    );

    Ok(())
}
