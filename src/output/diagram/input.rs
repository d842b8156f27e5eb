//! Diagram input contract
//!
//! The renderer reads a JSON document of the shape
//!
//! ```json
//! {
//!   "info": {
//!     "processor": { "name": "...", "num_sockets": 1, "num_numa_nodes": 1,
//!                    "num_hw_threads": 4, "num_threads_in_use": 4, "affinity": "0,2,1,3" },
//!     "parameters": "array n: 4096"
//!   },
//!   "results": {
//!     "<region>": {
//!       "saturation":     { "<metric>": 0.42, "<metric>": null },
//!       "geometric_mean": { "Port0 usage ratio": 0.3 },
//!       "sum":            { "AVX SP [MFLOP/s]": 77104.2 }
//!     }
//!   }
//! }
//! ```
//!
//! `null` means the metric was expected but not measured; a missing key means
//! it does not apply. Metric names are parsed into [`MetricKind`] once, by
//! [`RegionValues::from_results`]; names that do not parse are dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::measure::metrics::MetricKind;

// =================================================================================================
// Wire format
// =================================================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorInfo {
    pub name: String,
    pub num_sockets: usize,
    pub num_numa_nodes: usize,
    pub num_hw_threads: usize,
    pub num_threads_in_use: usize,
    /// Hardware threads in use, as a human-readable list
    pub affinity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub processor: ProcessorInfo,
    /// Free-form description of the run (problem size, iterations, ...)
    #[serde(default)]
    pub parameters: String,
}

/// Results of one region, one map per aggregation section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionResults {
    #[serde(default)]
    pub saturation: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub geometric_mean: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub sum: BTreeMap<String, Option<f64>>,
    /// Maximum wall time of the region in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramInput {
    pub info: SessionInfo,
    pub results: BTreeMap<String, RegionResults>,
}

impl DiagramInput {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn region(&self, name: &str) -> Option<&RegionResults> {
        self.results.get(name)
    }

    /// Description block printed under the diagram title
    pub fn description(&self) -> String {
        let p = &self.info.processor;
        let mut text = String::new();

        if !self.info.parameters.is_empty() {
            text.push_str(&self.info.parameters);
            text.push_str("\n\n");
        }

        let rows = [
            ("Processor:", p.name.clone()),
            ("Num sockets:", p.num_sockets.to_string()),
            ("Num NUMA nodes:", p.num_numa_nodes.to_string()),
            ("Num HW threads:", p.num_hw_threads.to_string()),
            ("Num HW threads in use:", p.num_threads_in_use.to_string()),
            ("Affinity (which threads are being used):", p.affinity.clone()),
        ];
        for (label, value) in rows {
            text.push_str(&format!("{label} {value}\n"));
        }

        text.push('\n');
        text.push_str(
            "Note: L1 cache is currently not measured and therefore will appear white. \
             This is not an indication of L1 cache saturation.",
        );
        text
    }
}

// =================================================================================================
// Typed view
// =================================================================================================

/// Aggregation section a value is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// Fraction of experiential peak
    Saturation,
    GeometricMean,
    Sum,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Saturation => "saturation",
            Section::GeometricMean => "geometric_mean",
            Section::Sum => "sum",
        }
    }
}

/// The value a diagram element is colored by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricBinding {
    pub section: Section,
    pub metric: MetricKind,
}

impl MetricBinding {
    pub fn saturation(metric: MetricKind) -> Self {
        Self {
            section: Section::Saturation,
            metric,
        }
    }

    pub fn geometric_mean(metric: MetricKind) -> Self {
        Self {
            section: Section::GeometricMean,
            metric,
        }
    }
}

impl fmt::Display for MetricBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.section.as_str(), self.metric)
    }
}

/// Region results keyed by parsed metric kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionValues {
    values: BTreeMap<MetricBinding, Option<f64>>,
}

impl RegionValues {
    pub fn from_results(results: &RegionResults) -> Self {
        let sections = [
            (Section::Saturation, &results.saturation),
            (Section::GeometricMean, &results.geometric_mean),
            (Section::Sum, &results.sum),
        ];

        let mut values = BTreeMap::new();
        for (section, map) in sections {
            for (name, value) in map {
                match MetricKind::from_external(name) {
                    Some(metric) => {
                        values.insert(MetricBinding { section, metric }, *value);
                    }
                    None => log::debug!("ignoring unknown metric '{name}' in {}", section.as_str()),
                }
            }
        }
        Self { values }
    }

    /// `None` = not applicable, `Some(None)` = not measured
    pub fn get(&self, binding: MetricBinding) -> Option<Option<f64>> {
        self.values.get(&binding).copied()
    }

    /// Measured value, if any
    pub fn value(&self, binding: MetricBinding) -> Option<f64> {
        self.get(binding).flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::metrics::{MemoryLevel, Traffic};

    const DOC: &str = r#"{
        "info": {
            "processor": {
                "name": "Intel(R) Core(TM) i5-6300U CPU @ 2.40GHz",
                "num_sockets": 1, "num_numa_nodes": 1, "num_hw_threads": 4,
                "num_threads_in_use": 4, "affinity": "0,2,1,3"
            },
            "parameters": "array n: 4096"
        },
        "results": {
            "triad": {
                "saturation": {
                    "Memory bandwidth [MBytes/s]": 0.4,
                    "AVX DP [MFLOP/s]": null,
                    "Branch rate": 0.1
                },
                "geometric_mean": { "Port0 usage ratio": 0.25 }
            }
        }
    }"#;

    #[test]
    fn test_parse_contract() {
        let input = DiagramInput::from_json_str(DOC).unwrap();
        assert_eq!(input.info.processor.num_hw_threads, 4);
        let region = input.region("triad").unwrap();
        assert_eq!(region.saturation["AVX DP [MFLOP/s]"], None);
        assert!(region.sum.is_empty());
    }

    #[test]
    fn test_null_and_absent_differ() {
        let input = DiagramInput::from_json_str(DOC).unwrap();
        let values = RegionValues::from_results(input.region("triad").unwrap());

        let ram = MetricBinding::saturation(MetricKind::bandwidth(MemoryLevel::Ram, Traffic::Total));
        let dp = MetricBinding::saturation(MetricKind::DpFlopRate);
        let sp = MetricBinding::saturation(MetricKind::SpFlopRate);

        assert_eq!(values.value(ram), Some(0.4));
        assert_eq!(values.get(dp), Some(None));
        assert_eq!(values.get(sp), None);
        // unknown name dropped
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_description_lines() {
        let input = DiagramInput::from_json_str(DOC).unwrap();
        let text = input.description();
        assert!(text.starts_with("array n: 4096\n\n"));
        assert!(text.contains("Num HW threads in use: 4\n"));
        assert!(text.ends_with("This is not an indication of L1 cache saturation."));
    }
}
