//! Measurement sessions
//!
//! - [`capture`]: the hardware counter seam ([`CaptureBackend`]) and its result format
//! - [`replay`]: an in-process backend serving scripted or recorded results
//! - [`metrics`]: closed catalogue of metric kinds and their aggregation
//! - [`aggregator`]: per-session region/sample store and aggregation
//! - [`scheduler`]: one workload pass per counter group on a worker pool
//!
//! # Example
//!
//! ```rust,ignore
//! use satmap::measure::*;
//!
//! let mut session = RegionAggregator::open(ReplayBackend::from_files(paths));
//! let scheduler = MetricGroupScheduler::new(SchedulerConfig::default())?;
//! scheduler.run(&mut session, "triad", 7000, |_| triad(&mut a, &b, &c))?;
//!
//! let aggregates = session.compute_aggregates()?;
//! let runtime = session.runtime("triad");
//! session.close()?;
//! ```

pub mod aggregator;
pub mod capture;
pub mod metrics;
pub mod replay;
pub mod scheduler;

pub use aggregator::{AggregateKey, AggregateSet, RegionAggregator};
pub use capture::{
    read_result_file, write_result_file, AccessMode, CaptureBackend, CaptureConfig,
    CaptureReport, RegionReport, ThreadReport,
};
pub use metrics::{AggregationKind, MemoryLevel, MetricKind, Traffic};
pub use replay::{ReplayBackend, ReplaySource};
pub use scheduler::{
    MetricGroupScheduler, ScheduleOutcome, ScheduleStatus, SchedulerConfig, WorkerContext,
};
