//! In-process capture backend that replays scripted results
//!
//! [`ReplayBackend`] times `start_region`/`stop_region` with the real clock but
//! serves counter values from a script: one [`CaptureReport`] (or recorded
//! result file) per group. It backs the test suite and the demos, and lets a
//! recorded session be aggregated again without the counter hardware.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

use parking_lot::Mutex;

use super::capture::{read_result_file, CaptureBackend, CaptureConfig, CaptureReport};
use crate::error::{Error, Result};

/// Source of one group's results
#[derive(Debug, Clone)]
pub enum ReplaySource {
    Report(CaptureReport),
    File(PathBuf),
}

/// Scripted capture backend
#[derive(Debug, Default)]
pub struct ReplayBackend {
    script: Vec<ReplaySource>,
    current_group: usize,
    finished_group: Option<usize>,
    opened: Vec<CaptureConfig>,
    registered: Mutex<HashSet<String>>,
    running: Mutex<HashMap<(String, usize), Instant>>,
}

impl ReplayBackend {
    /// Backend serving `reports[g]` for group `g`
    pub fn new(reports: Vec<CaptureReport>) -> Self {
        Self::from_sources(reports.into_iter().map(ReplaySource::Report).collect())
    }

    /// Backend reading group `g` from `paths[g]` when its results are requested
    pub fn from_files(paths: Vec<PathBuf>) -> Self {
        Self::from_sources(paths.into_iter().map(ReplaySource::File).collect())
    }

    pub fn from_sources(script: Vec<ReplaySource>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Configurations passed to [`CaptureBackend::open`] so far
    pub fn opened_configs(&self) -> &[CaptureConfig] {
        &self.opened
    }

    /// Group currently programmed
    pub fn current_group(&self) -> usize {
        self.current_group
    }
}

impl CaptureBackend for ReplayBackend {
    fn open(&mut self, config: &CaptureConfig) -> Result<()> {
        log::debug!(
            "replay backend opened group {} ({})",
            self.current_group,
            config.event_group
        );
        self.opened.push(config.clone());
        Ok(())
    }

    fn register_region(&self, tag: &str, _thread: usize) -> Result<()> {
        self.registered.lock().insert(tag.to_string());
        Ok(())
    }

    fn start_region(&self, tag: &str, thread: usize) -> Result<()> {
        if !self.registered.lock().contains(tag) {
            return Err(Error::capture(format!("region '{tag}' started before registration")));
        }
        self.running
            .lock()
            .insert((tag.to_string(), thread), Instant::now());
        Ok(())
    }

    fn stop_region(&self, tag: &str, thread: usize) -> Result<f64> {
        let started = self
            .running
            .lock()
            .remove(&(tag.to_string(), thread))
            .ok_or_else(|| {
                Error::capture(format!("region '{tag}' stopped on thread {thread} without start"))
            })?;
        Ok(started.elapsed().as_secs_f64())
    }

    fn next_group(&mut self) -> Result<()> {
        self.finished_group = Some(self.current_group);
        self.current_group += 1;
        Ok(())
    }

    fn read_results(&mut self) -> Result<CaptureReport> {
        let group = self.finished_group.unwrap_or(self.current_group);

        let mut report = match self.script.get(group) {
            Some(ReplaySource::Report(report)) => report.clone(),
            Some(ReplaySource::File(path)) => read_result_file(path)?,
            None => {
                log::warn!("no scripted results for group {group}");
                CaptureReport::default()
            }
        };

        for region in &mut report.regions {
            region.group = group;
        }
        Ok(report)
    }

    fn close(&mut self) -> Result<()> {
        self.running.lock().clear();
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
