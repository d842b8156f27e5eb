//! Capture backend seam
//!
//! The hardware counter subsystem is consumed through [`CaptureBackend`]. A
//! backend is opened once per counter group with a [`CaptureConfig`], collects
//! per-thread event counts and derived metrics for every registered region,
//! and hands them back as a [`CaptureReport`].
//!
//! Backends configured through the process environment can use
//! [`CaptureConfig::env_pairs`] to obtain the key list they expect.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =================================================================================================
// Configuration
// =================================================================================================

/// Counter access mode passed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Direct register access (requires privileges)
    Direct,
    /// Access through a privileged daemon
    #[default]
    AccessDaemon,
    /// Kernel perf_event interface
    PerfEvent,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Direct => "direct",
            AccessMode::AccessDaemon => "accessdaemon",
            AccessMode::PerfEvent => "perf_event",
        }
    }
}

/// Configuration for one capture pass (one counter group)
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Event group name (e.g. `"FLOPS_SP"` or `"L2|L3"`)
    pub event_group: String,

    /// Hardware threads the counters are programmed on
    pub threads: Vec<usize>,

    /// Where the backend writes its raw results
    pub output_path: PathBuf,

    /// Register access mode
    pub mode: AccessMode,

    /// Take over counters already in use by another process
    pub force: bool,
}

impl CaptureConfig {
    /// Configuration for `event_group` on `threads`, default path and mode
    pub fn new(event_group: impl Into<String>, threads: Vec<usize>) -> Self {
        Self {
            event_group: event_group.into(),
            threads,
            output_path: PathBuf::from("./satmap_capture.json"),
            mode: AccessMode::default(),
            force: true,
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Environment-style key list describing this configuration
    ///
    /// # Example
    ///
    /// ```rust
    /// use satmap::measure::CaptureConfig;
    ///
    /// let pairs = CaptureConfig::new("FLOPS_SP", vec![0, 1]).env_pairs();
    /// assert_eq!(pairs[0], ("SATMAP_EVENTS".to_string(), "FLOPS_SP".to_string()));
    /// assert_eq!(pairs[1], ("SATMAP_THREADS".to_string(), "0,1".to_string()));
    /// ```
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        let threads = self
            .threads
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",");

        vec![
            ("SATMAP_EVENTS".to_string(), self.event_group.clone()),
            ("SATMAP_THREADS".to_string(), threads),
            ("SATMAP_FILEPATH".to_string(), self.output_path.display().to_string()),
            ("SATMAP_MODE".to_string(), self.mode.as_str().to_string()),
            ("SATMAP_FORCE".to_string(), if self.force { "1" } else { "0" }.to_string()),
        ]
    }
}

// =================================================================================================
// Captured results
// =================================================================================================

/// Counts and metrics one hardware thread recorded for one region
///
/// `None` marks a value the backend could not compute (serialized as `null`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadReport {
    pub thread: usize,
    #[serde(default)]
    pub events: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub metrics: BTreeMap<String, Option<f64>>,
}

/// Everything recorded for one region during one pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionReport {
    pub tag: String,
    /// Group the backend ran while this region was measured
    #[serde(default)]
    pub group: usize,
    pub threads: Vec<ThreadReport>,
}

/// Results of one capture pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub regions: Vec<RegionReport>,
}

impl CaptureReport {
    pub fn region(&self, tag: &str) -> Option<&RegionReport> {
        self.regions.iter().find(|r| r.tag == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.iter().all(|r| r.threads.is_empty())
    }
}

/// Parse a capture result file
///
/// A missing, unreadable or corrupt file is a fatal [`Error::ResultFile`].
pub fn read_result_file(path: impl AsRef<Path>) -> Result<CaptureReport> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::result_file(path, e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| Error::result_file(path, e.to_string()))
}

/// Write a capture report in the format [`read_result_file`] parses
pub fn write_result_file(report: &CaptureReport, path: impl AsRef<Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(report)?;
    fs::write(path, text)?;
    Ok(())
}

// =================================================================================================
// Backend trait
// =================================================================================================

/// Hardware counter capture subsystem
///
/// `start_region` and `stop_region` are called concurrently from every worker
/// thread; the remaining methods are called from the coordinating thread only.
pub trait CaptureBackend: Send + Sync {
    /// Program the counters for one group
    fn open(&mut self, config: &CaptureConfig) -> Result<()>;

    /// Make `tag` known before its first start
    fn register_region(&self, tag: &str, thread: usize) -> Result<()>;

    /// Begin counting `tag` on `thread`
    fn start_region(&self, tag: &str, thread: usize) -> Result<()>;

    /// Stop counting `tag` on `thread`; returns the wall time of the invocation in seconds
    fn stop_region(&self, tag: &str, thread: usize) -> Result<f64>;

    /// Advance to the next counter group
    fn next_group(&mut self) -> Result<()>;

    /// Results recorded for the pass that just finished
    fn read_results(&mut self) -> Result<CaptureReport>;

    /// Release the counters
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_report() -> CaptureReport {
        let mut metrics = BTreeMap::new();
        metrics.insert("AVX SP [MFLOP/s]".to_string(), Some(100.0));
        metrics.insert("Port0 usage ratio".to_string(), None);

        CaptureReport {
            regions: vec![RegionReport {
                tag: "triad".to_string(),
                group: 1,
                threads: vec![ThreadReport {
                    thread: 0,
                    events: BTreeMap::new(),
                    metrics,
                }],
            }],
        }
    }

    #[test]
    fn test_env_pairs() {
        let config = CaptureConfig::new("MEM", vec![0, 2, 1, 3])
            .with_output_path("/tmp/out.json")
            .with_mode(AccessMode::PerfEvent);
        let pairs = config.env_pairs();

        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[1].1, "0,2,1,3");
        assert_eq!(pairs[2].1, "/tmp/out.json");
        assert_eq!(pairs[3].1, "perf_event");
        assert_eq!(pairs[4], ("SATMAP_FORCE".to_string(), "1".to_string()));
    }

    #[test]
    fn test_result_file_round_trip_keeps_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.json");

        write_result_file(&sample_report(), &path).unwrap();
        let back = read_result_file(&path).unwrap();

        assert_eq!(back, sample_report());
        let thread = &back.region("triad").unwrap().threads[0];
        assert_eq!(thread.metrics["Port0 usage ratio"], None);
    }

    #[test]
    fn test_missing_result_file_is_fatal() {
        let dir = tempdir().unwrap();
        let err = read_result_file(dir.path().join("nope.json")).unwrap_err();
        assert!(err.is_fatal_capture());
    }

    #[test]
    fn test_corrupt_result_file_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ regions: [").unwrap();

        let err = read_result_file(&path).unwrap_err();
        assert!(matches!(err, Error::ResultFile { .. }));
    }
}
