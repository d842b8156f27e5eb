//! Session results
//!
//! [`SessionResults`] is the frozen outcome of one measurement session:
//! aggregate scalars, per-region runtimes and saturation ratios against a
//! machine profile. It converts to the diagram input document
//! ([`SessionResults::to_diagram_input`]), flattens to export records
//! ([`SessionResults::records`]) and prints the two text reports.
//!
//! # Example
//!
//! ```rust,ignore
//! let results = SessionResults::from_aggregator(&session, &profile, info)?;
//! println!("{}", results.aggregate_report());
//! println!("{}", results.saturation_report());
//! results.to_diagram_input().to_json_file("results.json")?;
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;

use crate::error::Result;
use crate::measure::aggregator::{AggregateSet, RegionAggregator};
use crate::measure::capture::CaptureBackend;
use crate::measure::metrics::{AggregationKind, MemoryLevel, MetricKind, Traffic};
use crate::output::diagram::input::{DiagramInput, ProcessorInfo, RegionResults, SessionInfo};
use crate::profile::ExperientialProfile;
use crate::saturation::SaturationCalculator;

/// Floating-point operations per retired 256-bit packed single-precision instruction
pub const SP_OPS_PER_VECTOR: f64 = 8.0;

// =================================================================================================
// Session info
// =================================================================================================

/// Processor model name as reported by the OS
pub fn processor_name() -> String {
    fs::read_to_string("/proc/cpuinfo")
        .ok()
        .and_then(|text| {
            text.lines()
                .find(|line| line.starts_with("model name"))
                .and_then(|line| line.split_once(':'))
                .map(|(_, name)| name.trim().to_string())
        })
        .unwrap_or_else(|| "unknown processor".to_string())
}

/// Session description for a run on `threads` of the profiled machine
pub fn session_info(profile: &ExperientialProfile, threads: &[usize], parameters: impl Into<String>) -> SessionInfo {
    let topology = &profile.topology;
    let affinity = threads
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",");

    SessionInfo {
        processor: ProcessorInfo {
            name: processor_name(),
            num_sockets: topology.num_sockets,
            num_numa_nodes: topology.num_numa_nodes(),
            num_hw_threads: topology.num_hw_threads(),
            num_threads_in_use: threads.len(),
            affinity,
        },
        parameters: parameters.into(),
    }
}

// =================================================================================================
// Records
// =================================================================================================

/// Which figure a record carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordKind {
    Aggregate(AggregationKind),
    /// Unscaled fraction of the experiential peak
    Saturation,
    /// Maximum wall time over all stops, seconds
    Runtime,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Aggregate(kind) => kind.as_str(),
            RecordKind::Saturation => "saturation",
            RecordKind::Runtime => "max",
        }
    }
}

/// One exported scalar
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub region: String,
    pub metric: String,
    pub kind: RecordKind,
    pub value: f64,
}

/// Metric name used for region wall time in records
pub const REGION_RUNTIME_NAME: &str = "Region wall time [s]";

// =================================================================================================
// Session results
// =================================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SessionResults {
    pub info: SessionInfo,
    pub aggregates: AggregateSet,
    /// Maximum wall time per region
    pub runtimes: BTreeMap<String, f64>,
    /// Unscaled saturation ratios per region
    pub ratios: BTreeMap<String, BTreeMap<MetricKind, f64>>,
    pub profile: ExperientialProfile,
}

impl SessionResults {
    pub fn new(
        aggregates: AggregateSet,
        runtimes: BTreeMap<String, f64>,
        profile: &ExperientialProfile,
        info: SessionInfo,
    ) -> Self {
        let calculator = SaturationCalculator::new(profile);
        let regions: BTreeSet<String> = aggregates
            .regions()
            .into_iter()
            .map(String::from)
            .chain(runtimes.keys().cloned())
            .collect();

        let ratios = regions
            .into_iter()
            .map(|tag| {
                let ratios = calculator.ratios(&aggregates, &tag);
                (tag, ratios)
            })
            .collect();

        Self {
            info,
            aggregates,
            runtimes,
            ratios,
            profile: profile.clone(),
        }
    }

    /// Snapshot of an open session
    ///
    /// Fails for a session aborted by a capture error.
    pub fn from_aggregator<B: CaptureBackend>(
        session: &RegionAggregator<B>,
        profile: &ExperientialProfile,
        info: SessionInfo,
    ) -> Result<Self> {
        Ok(Self::new(session.compute_aggregates()?, session.runtimes(), profile, info))
    }

    /// Every region that produced samples or was stopped at least once
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.ratios.keys().map(String::as_str)
    }

    pub fn ratio(&self, tag: &str, metric: MetricKind) -> Option<f64> {
        self.ratios.get(tag).and_then(|r| r.get(&metric)).copied()
    }

    /// Metrics every region is expected to report
    pub fn expected_metrics(&self) -> Vec<MetricKind> {
        MetricKind::all(self.profile.topology.ports_per_core)
    }

    /// Diagram sections of one region; expected metrics nobody measured are `null`
    pub fn region_results(&self, tag: &str) -> RegionResults {
        let mut results = RegionResults {
            runtime: self.runtimes.get(tag).copied(),
            ..RegionResults::default()
        };

        for metric in self.expected_metrics() {
            let name = metric.external_name().into_owned();
            let kind = metric.aggregation();
            let value = self.aggregates.get(tag, metric, kind);
            match kind {
                AggregationKind::Sum => results.sum.insert(name.clone(), value),
                AggregationKind::GeometricMean => results.geometric_mean.insert(name.clone(), value),
            };

            if self.profile.peak_for(metric).is_some() {
                results.saturation.insert(name, self.ratio(tag, metric));
            }
        }

        results
    }

    /// The document the diagram renderer reads
    pub fn to_diagram_input(&self) -> DiagramInput {
        DiagramInput {
            info: self.info.clone(),
            results: self
                .regions()
                .map(|tag| (tag.to_string(), self.region_results(tag)))
                .collect(),
        }
    }

    /// Every measured scalar, region by region
    pub fn records(&self) -> Vec<ResultRecord> {
        let mut records = Vec::new();

        for tag in self.regions() {
            if let Some(runtime) = self.runtimes.get(tag) {
                records.push(ResultRecord {
                    region: tag.to_string(),
                    metric: REGION_RUNTIME_NAME.to_string(),
                    kind: RecordKind::Runtime,
                    value: *runtime,
                });
            }
            records.extend(self.aggregates.region(tag).map(|(key, value)| ResultRecord {
                region: tag.to_string(),
                metric: key.metric.external_name().into_owned(),
                kind: RecordKind::Aggregate(key.kind),
                value,
            }));
            if let Some(ratios) = self.ratios.get(tag) {
                records.extend(ratios.iter().map(|(metric, ratio)| ResultRecord {
                    region: tag.to_string(),
                    metric: metric.external_name().into_owned(),
                    kind: RecordKind::Saturation,
                    value: *ratio,
                }));
            }
        }

        records
    }

    pub fn aggregate_report(&self) -> AggregateReport<'_> {
        AggregateReport(self)
    }

    pub fn saturation_report(&self) -> SaturationReport<'_> {
        SaturationReport(self)
    }
}

// =================================================================================================
// Text reports
// =================================================================================================

/// Runtimes, computation and memory aggregates of every region
pub struct AggregateReport<'a>(&'a SessionResults);

/// Share of each experiential peak used by every region
pub struct SaturationReport<'a>(&'a SessionResults);

fn write_value(f: &mut fmt::Formatter<'_>, label: &str, value: Option<f64>, exponent: bool) -> fmt::Result {
    match value {
        Some(v) if exponent => writeln!(f, "{label}: {v:.3e}"),
        Some(v) => writeln!(f, "{label}: {v:.3}"),
        None => writeln!(f, "{label}: n/a"),
    }
}

impl fmt::Display for AggregateReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let results = self.0;
        writeln!(f, "----- begin aggregate report -----")?;
        writeln!(f, "regions with a runtime: {}", results.runtimes.len())?;
        for (tag, runtime) in &results.runtimes {
            writeln!(f, "Runtime for {tag}: {runtime:.6}")?;
        }

        for tag in results.regions() {
            let value = |metric: MetricKind| results.aggregates.value(tag, metric);
            let vectors = value(MetricKind::SpVectorInstructions);

            writeln!(f, "\n=== {tag} ===")?;
            writeln!(f, "-- computation --")?;
            write_value(f, &format!("Aggregate {}", MetricKind::SpVectorInstructions), vectors, true)?;
            write_value(f, "Total FP ops", vectors.map(|v| v * SP_OPS_PER_VECTOR), true)?;

            writeln!(f, "-- computation rates --")?;
            for metric in [MetricKind::SpFlopRate, MetricKind::DpFlopRate] {
                write_value(f, &format!("Aggregate {metric}"), value(metric), false)?;
            }

            writeln!(f, "-- memory --")?;
            for level in [MemoryLevel::L2, MemoryLevel::L3, MemoryLevel::Ram] {
                let metric = MetricKind::bandwidth(level, Traffic::Total);
                write_value(f, &format!("Aggregate {metric}"), value(metric), false)?;
            }
        }
        writeln!(f, "----- end aggregate report -----")
    }
}

impl fmt::Display for SaturationReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let results = self.0;
        let rows = [
            ("SP flop performance", MetricKind::SpFlopRate),
            ("DP flop performance", MetricKind::DpFlopRate),
            ("L2 bandwidth", MetricKind::bandwidth(MemoryLevel::L2, Traffic::Total)),
            ("L3 bandwidth", MetricKind::bandwidth(MemoryLevel::L3, Traffic::Total)),
            ("RAM bandwidth", MetricKind::bandwidth(MemoryLevel::Ram, Traffic::Total)),
        ];

        writeln!(f, "----- begin saturation level report -----")?;
        for tag in results.regions() {
            writeln!(f, "=== {tag} ===")?;
            for (label, metric) in rows {
                let percent = results.ratio(tag, metric).map(|r| r * 100.0);
                write_value(f, &format!("Percentage of available {label} used"), percent, false)?;
            }
        }
        writeln!(f, "----- end saturation level report -----")
    }
}

// =================================================================================================
// Tests
// =================================================================================================
