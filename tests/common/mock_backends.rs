//! Capture backends with scripted failures

use satmap::measure::{CaptureBackend, CaptureConfig, CaptureReport};
use satmap::{Error, Result};

use super::test_helpers::single_metric_report;

/// Step at which [`FailingBackend`] refuses to continue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Start,
    Stop,
    ReadResults,
}

/// Backend that works normally except at one step of one group
///
/// Groups before the failing one report `AVX SP [MFLOP/s] = 100` for the
/// stopped region on thread 0.
#[derive(Debug)]
pub struct FailingBackend {
    pub fails_at: FailurePoint,
    pub failing_group: usize,
    opened: usize,
}

impl FailingBackend {
    /// Fails in the first group
    pub fn new(fails_at: FailurePoint) -> Self {
        Self::in_group(fails_at, 0)
    }

    /// Fails in group `failing_group`, after every earlier group merged
    pub fn in_group(fails_at: FailurePoint, failing_group: usize) -> Self {
        Self {
            fails_at,
            failing_group,
            opened: 0,
        }
    }

    fn fails(&self, point: FailurePoint) -> bool {
        self.fails_at == point && self.opened == self.failing_group + 1
    }
}

impl CaptureBackend for FailingBackend {
    fn open(&mut self, _config: &CaptureConfig) -> Result<()> {
        self.opened += 1;
        Ok(())
    }

    fn register_region(&self, _tag: &str, _thread: usize) -> Result<()> {
        Ok(())
    }

    fn start_region(&self, tag: &str, _thread: usize) -> Result<()> {
        if self.fails(FailurePoint::Start) {
            return Err(Error::capture(format!("counters unavailable for '{tag}'")));
        }
        Ok(())
    }

    fn stop_region(&self, tag: &str, _thread: usize) -> Result<f64> {
        if self.fails(FailurePoint::Stop) {
            return Err(Error::capture(format!("cannot stop '{tag}'")));
        }
        Ok(0.001)
    }

    fn next_group(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_results(&mut self) -> Result<CaptureReport> {
        if self.fails(FailurePoint::ReadResults) {
            return Err(Error::result_file("missing.json", "no such file"));
        }
        Ok(single_metric_report("triad", "AVX SP [MFLOP/s]", &[100.0]))
    }
}
