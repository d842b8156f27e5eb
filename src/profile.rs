//! Experiential machine profile
//!
//! Peak rates measured beforehand on the target machine (compute throughput
//! and per-level bandwidth) plus its topology. Saturation is always relative
//! to these numbers. A peak of `0.0` means "not measured" and produces no
//! saturation value for the metrics it covers.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::measure::metrics::{MemoryLevel, MetricKind};

// =================================================================================================
// Topology
// =================================================================================================

/// Sockets, cores, threads, cache sharing and NUMA layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub num_sockets: usize,
    pub cores_per_socket: usize,
    pub threads_per_core: usize,

    /// Hardware thread ids in scheduling order
    pub thread_order: Vec<usize>,

    pub l1_size_bytes: u64,
    pub l2_size_bytes: u64,
    pub l3_size_bytes: u64,

    /// Threads sharing each L1 / L2 / L3 instance
    pub l1_groups: Vec<Vec<usize>>,
    pub l2_groups: Vec<Vec<usize>>,
    pub l3_groups: Vec<Vec<usize>>,

    pub numa_domains: Vec<Vec<usize>>,

    /// Functional-unit ports per core
    pub ports_per_core: u8,
}

impl Topology {
    pub fn num_hw_threads(&self) -> usize {
        self.num_sockets * self.cores_per_socket * self.threads_per_core
    }

    pub fn num_numa_nodes(&self) -> usize {
        self.numa_domains.len()
    }
}

impl Default for Topology {
    /// Dual-core, hyper-threaded laptop part
    fn default() -> Self {
        Self {
            num_sockets: 1,
            cores_per_socket: 2,
            threads_per_core: 2,
            thread_order: vec![0, 2, 1, 3],
            l1_size_bytes: 32 * 1024,
            l2_size_bytes: 256 * 1024,
            l3_size_bytes: 3 * 1024 * 1024,
            l1_groups: vec![vec![0, 2], vec![1, 3]],
            l2_groups: vec![vec![0, 2], vec![1, 3]],
            l3_groups: vec![vec![0, 2, 1, 3]],
            numa_domains: vec![vec![0, 1, 2, 3]],
            ports_per_core: 8,
        }
    }
}

// =================================================================================================
// Peak rates
// =================================================================================================

/// Best rates observed on the machine
///
/// Compute in MFLOP/s, bandwidth in MiB/s. `0.0` = unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakRates {
    pub sp_mflops: f64,
    pub dp_mflops: f64,
    pub l1_bandwidth: f64,
    pub l2_bandwidth: f64,
    pub l3_bandwidth: f64,
    pub ram_bandwidth: f64,
}

impl Default for PeakRates {
    fn default() -> Self {
        Self {
            sp_mflops: 183598.03125,
            dp_mflops: 0.0,
            l1_bandwidth: 0.0,
            l2_bandwidth: 150194.921875,
            l3_bandwidth: 102951.289062,
            ram_bandwidth: 24208.177734,
        }
    }
}

impl PeakRates {
    pub fn bandwidth(&self, level: MemoryLevel) -> f64 {
        match level {
            MemoryLevel::L1 => self.l1_bandwidth,
            MemoryLevel::L2 => self.l2_bandwidth,
            MemoryLevel::L3 => self.l3_bandwidth,
            MemoryLevel::Ram => self.ram_bandwidth,
        }
    }
}

// =================================================================================================
// Profile
// =================================================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperientialProfile {
    pub topology: Topology,
    pub peaks: PeakRates,
}

impl ExperientialProfile {
    pub fn new(topology: Topology, peaks: PeakRates) -> Self {
        Self { topology, peaks }
    }

    /// Load a profile from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let profile: Self = serde_json::from_str(&text)?;
        profile.validate()?;
        profile.log_unset_peaks();
        Ok(profile)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Peak rate saturation of `metric` is measured against
    ///
    /// `None` when the metric has no peak (ports, runtime, raw events). The
    /// returned value may be `0.0` for an unset peak.
    pub fn peak_for(&self, metric: MetricKind) -> Option<f64> {
        match metric {
            MetricKind::SpFlopRate => Some(self.peaks.sp_mflops),
            MetricKind::DpFlopRate => Some(self.peaks.dp_mflops),
            MetricKind::Bandwidth { level, .. } => Some(self.peaks.bandwidth(level)),
            _ => None,
        }
    }

    /// Reject profiles no machine can have
    pub fn validate(&self) -> Result<()> {
        let t = &self.topology;
        if t.num_sockets == 0 || t.cores_per_socket == 0 || t.threads_per_core == 0 {
            return Err(Error::config("topology must have at least one socket, core and thread"));
        }
        let peaks = [
            self.peaks.sp_mflops,
            self.peaks.dp_mflops,
            self.peaks.l1_bandwidth,
            self.peaks.l2_bandwidth,
            self.peaks.l3_bandwidth,
            self.peaks.ram_bandwidth,
        ];
        if peaks.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(Error::config("peak rates must be finite and non-negative"));
        }
        Ok(())
    }

    fn log_unset_peaks(&self) {
        let named = [
            ("SP flop rate", self.peaks.sp_mflops),
            ("DP flop rate", self.peaks.dp_mflops),
            ("L1 bandwidth", self.peaks.l1_bandwidth),
            ("L2 bandwidth", self.peaks.l2_bandwidth),
            ("L3 bandwidth", self.peaks.l3_bandwidth),
            ("RAM bandwidth", self.peaks.ram_bandwidth),
        ];
        for (name, _) in named.iter().filter(|(_, p)| *p == 0.0) {
            log::warn!("experiential peak for {name} is unset; its saturation will be left blank");
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================
