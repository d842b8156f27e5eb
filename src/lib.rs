//! satmap: hardware saturation mapping
//!
//! Measures how close a code region comes to the machine's experiential peaks
//! (floating-point throughput, per-level memory bandwidth, functional-unit port
//! usage) and draws the result as a memory-hierarchy diagram.
//!
//! # Architecture
//!
//! satmap is built on two principles:
//!
//! 1. **Separation of capture and interpretation**
//!    - A capture backend reports raw per-thread counters ([`measure::CaptureBackend`])
//!    - The aggregator, saturation and color layers only see typed metrics
//!
//! 2. **One pass per counter group**
//!    - Hardware can only count a few events at once, so the workload is run
//!      once per group on a worker pool and the partial results are merged
//!
//! # Quick Start
//!
//! ```rust
//! use satmap::measure::{
//!     CaptureReport, MetricGroupScheduler, RegionAggregator, RegionReport, ReplayBackend,
//!     SchedulerConfig, ThreadReport,
//! };
//! use satmap::{ExperientialProfile, SessionResults};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> satmap::Result<()> {
//! // 1. Scripted counter results, one report per group
//! let report = |name: &str, value: f64| CaptureReport {
//!     regions: vec![RegionReport {
//!         tag: "triad".into(),
//!         group: 0,
//!         threads: vec![ThreadReport {
//!             thread: 0,
//!             events: BTreeMap::new(),
//!             metrics: BTreeMap::from([(name.to_string(), Some(value))]),
//!         }],
//!     }],
//! };
//! let backend = ReplayBackend::new(vec![
//!     report("AVX SP [MFLOP/s]", 91799.0),
//!     report("Memory bandwidth [MBytes/s]", 12104.0),
//! ]);
//!
//! // 2. Run the workload once per group
//! let config = SchedulerConfig::default()
//!     .with_groups(["FLOPS_SP", "MEM_DP"])
//!     .with_threads(vec![0]);
//! let scheduler = MetricGroupScheduler::new(config)?;
//! let mut session = RegionAggregator::open(backend);
//! scheduler.run(&mut session, "triad", 2000, |_| {
//!     std::hint::black_box((0..64).map(|i| i as f64).sum::<f64>());
//! })?;
//!
//! // 3. Compare against the machine profile
//! let profile = ExperientialProfile::default();
//! let results = SessionResults::from_aggregator(&session, &profile, Default::default())?;
//! println!("{}", results.saturation_report());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`measure`]: capture seam, metric catalogue, aggregation and scheduling
//! - [`profile`]: experiential peaks and topology of the target machine
//! - [`saturation`]: ratio to peak and its log scale
//! - [`color`]: discrete palettes and continuous color scales
//! - [`results`]: frozen session results and text reports
//! - [`output`]: diagrams, swatches and data export

pub mod color;
pub mod error;
pub mod measure;
pub mod output;
pub mod profile;
pub mod results;
pub mod saturation;

pub use error::{Error, Result};
pub use profile::ExperientialProfile;
pub use results::SessionResults;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use satmap::prelude::*;
    //! ```
    pub use crate::color::{ColorScale, Palette, Rgb};
    pub use crate::error::{Error, Result};
    pub use crate::measure::{
        AggregateSet, CaptureBackend, MetricGroupScheduler, MetricKind, RegionAggregator,
        ReplayBackend, SchedulerConfig,
    };
    pub use crate::output::{render_diagram, CsvExporter, DiagramConfig, DiagramInput, Exporter, JsonExporter};
    pub use crate::profile::ExperientialProfile;
    pub use crate::results::SessionResults;
    pub use crate::saturation::{saturate, scale_ratio, SaturationCalculator};
}
