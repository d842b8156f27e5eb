//! Metric catalogue
//!
//! The capture backend reports events and derived metrics by name. Names are
//! mapped onto [`MetricKind`] exactly once, when samples enter the aggregator;
//! everything downstream (aggregation, saturation, diagram bindings, export)
//! works on the enum.
//!
//! # Aggregation
//!
//! Every kind knows how it is combined across hardware threads and groups:
//!
//! | Kind | Aggregation |
//! |------|-------------|
//! | flop counts / rates, bandwidths, runtime | [`AggregationKind::Sum`] |
//! | port usage ratios | [`AggregationKind::GeometricMean`] |

use std::borrow::Cow;
use std::fmt;

// =================================================================================================
// Memory hierarchy identifiers
// =================================================================================================

/// Level of the memory hierarchy a bandwidth metric refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryLevel {
    L1,
    L2,
    L3,
    Ram,
}

impl MemoryLevel {
    /// Label used in diagrams and reports
    pub fn label(&self) -> &'static str {
        match self {
            MemoryLevel::L1 => "L1",
            MemoryLevel::L2 => "L2",
            MemoryLevel::L3 => "L3",
            MemoryLevel::Ram => "RAM",
        }
    }
}

/// Direction of traffic for a bandwidth metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Traffic {
    /// Read + write
    Total,
    /// Towards the core
    Load,
    /// Away from the core (stores / evictions)
    Store,
}

// =================================================================================================
// Aggregation kinds
// =================================================================================================

/// How per-thread, per-group entries of one metric are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AggregationKind {
    /// Summed across hardware threads and across every group that measured it
    Sum,
    /// Geometric mean across hardware threads (and groups)
    GeometricMean,
}

impl AggregationKind {
    /// Section name used in exported results
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Sum => "sum",
            AggregationKind::GeometricMean => "geometric_mean",
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =================================================================================================
// Metric kinds (type-safe identifiers)
// =================================================================================================

/// Known metric kinds
///
/// Names the capture backend reports that do not map to a variant are dropped
/// at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    /// Retired 256-bit packed single-precision instructions (raw event)
    SpVectorInstructions,

    /// Retired 256-bit packed double-precision instructions (raw event)
    DpVectorInstructions,

    /// Single-precision MFLOP/s
    SpFlopRate,

    /// Double-precision MFLOP/s
    DpFlopRate,

    /// Bandwidth in MBytes/s at one level of the hierarchy
    Bandwidth { level: MemoryLevel, traffic: Traffic },

    /// Runtime reported by the counter backend (seconds)
    Runtime,

    /// Fraction of cycles a functional-unit port was busy
    PortUsage(u8),
}

/// External identifiers with a fixed spelling
const CATALOGUE: &[(&str, MetricKind)] = &[
    ("FP_ARITH_INST_RETIRED_256B_PACKED_SINGLE", MetricKind::SpVectorInstructions),
    ("FP_ARITH_INST_RETIRED_256B_PACKED_DOUBLE", MetricKind::DpVectorInstructions),
    ("AVX SP [MFLOP/s]", MetricKind::SpFlopRate),
    ("AVX DP [MFLOP/s]", MetricKind::DpFlopRate),
    ("L2 bandwidth [MBytes/s]", MetricKind::bandwidth(MemoryLevel::L2, Traffic::Total)),
    ("L2 load bandwidth [MBytes/s]", MetricKind::bandwidth(MemoryLevel::L2, Traffic::Load)),
    ("L2 evict bandwidth [MBytes/s]", MetricKind::bandwidth(MemoryLevel::L2, Traffic::Store)),
    ("L3 bandwidth [MBytes/s]", MetricKind::bandwidth(MemoryLevel::L3, Traffic::Total)),
    ("L3 load bandwidth [MBytes/s]", MetricKind::bandwidth(MemoryLevel::L3, Traffic::Load)),
    ("L3 evict bandwidth [MBytes/s]", MetricKind::bandwidth(MemoryLevel::L3, Traffic::Store)),
    ("Memory bandwidth [MBytes/s]", MetricKind::bandwidth(MemoryLevel::Ram, Traffic::Total)),
    ("Memory read bandwidth [MBytes/s]", MetricKind::bandwidth(MemoryLevel::Ram, Traffic::Load)),
    ("Memory write bandwidth [MBytes/s]", MetricKind::bandwidth(MemoryLevel::Ram, Traffic::Store)),
    ("Runtime (RDTSC) [s]", MetricKind::Runtime),
];

const PORT_PREFIX: &str = "Port";
const PORT_SUFFIX: &str = " usage ratio";

impl MetricKind {
    /// Shorthand for a bandwidth kind
    pub const fn bandwidth(level: MemoryLevel, traffic: Traffic) -> Self {
        MetricKind::Bandwidth { level, traffic }
    }

    /// Map an external identifier onto a metric kind
    ///
    /// # Example
    ///
    /// ```rust
    /// use satmap::measure::MetricKind;
    ///
    /// assert_eq!(MetricKind::from_external("AVX SP [MFLOP/s]"), Some(MetricKind::SpFlopRate));
    /// assert_eq!(MetricKind::from_external("Port3 usage ratio"), Some(MetricKind::PortUsage(3)));
    /// assert_eq!(MetricKind::from_external("Branch misprediction rate"), None);
    /// ```
    pub fn from_external(name: &str) -> Option<Self> {
        if let Some((_, kind)) = CATALOGUE.iter().find(|(external, _)| *external == name) {
            return Some(*kind);
        }

        name.strip_prefix(PORT_PREFIX)
            .and_then(|rest| rest.strip_suffix(PORT_SUFFIX))
            .and_then(|index| index.parse::<u8>().ok())
            .map(MetricKind::PortUsage)
    }

    /// External identifier of this kind (also the key used in exports)
    pub fn external_name(&self) -> Cow<'static, str> {
        if let MetricKind::PortUsage(port) = self {
            return Cow::Owned(format!("{PORT_PREFIX}{port}{PORT_SUFFIX}"));
        }

        CATALOGUE
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(external, _)| Cow::Borrowed(*external))
            // Every non-port variant has a catalogue entry except L1 bandwidths,
            // which the counter groups never report.
            .unwrap_or_else(|| Cow::Owned(format!("{self:?}")))
    }

    /// How this metric is combined across threads and groups
    pub fn aggregation(&self) -> AggregationKind {
        match self {
            MetricKind::PortUsage(_) => AggregationKind::GeometricMean,
            _ => AggregationKind::Sum,
        }
    }

    /// Raw hardware event (as opposed to a derived metric)
    pub fn is_event(&self) -> bool {
        matches!(self, MetricKind::SpVectorInstructions | MetricKind::DpVectorInstructions)
    }

    /// Every catalogued kind plus `ports` port-usage kinds
    pub fn all(ports: u8) -> Vec<MetricKind> {
        CATALOGUE
            .iter()
            .map(|(_, kind)| *kind)
            .chain((0..ports).map(MetricKind::PortUsage))
            .collect()
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.external_name())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
