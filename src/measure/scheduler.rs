//! Counter-group scheduling
//!
//! The counter hardware can only observe a few events at a time, so the full
//! metric set is split into groups and the workload is executed once per
//! group. The measurement budget (total iterations) is divided evenly between
//! the groups with integer division; the remainder is not run.
//!
//! Every group pass runs the workload on every worker of a fixed rayon pool via
//! [`rayon::ThreadPool::broadcast`], which returns only once every worker has
//! stopped its region. That return is the group barrier: merging happens on the
//! coordinating thread afterwards, and groups never overlap.

use std::path::PathBuf;

use rayon::{ThreadPool, ThreadPoolBuilder};

use super::aggregator::RegionAggregator;
use super::capture::{AccessMode, CaptureBackend, CaptureConfig};
use crate::error::{Error, Result};
use crate::profile::ExperientialProfile;

/// Budgets below this produce a large proportional error after division
pub const RECOMMENDED_MIN_BUDGET: u64 = 1000;

// =================================================================================================
// Configuration
// =================================================================================================

/// Ordered counter groups and the workers that run them
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Counter groups, measured in this order
    pub groups: Vec<String>,

    /// Hardware thread each worker is associated with (one worker per entry)
    pub threads: Vec<usize>,

    /// Where the capture backend writes raw results
    pub output_path: PathBuf,

    /// Counter access mode
    pub mode: AccessMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            groups: default_groups(),
            threads: (0..workers).collect(),
            output_path: PathBuf::from("./satmap_capture.json"),
            mode: AccessMode::default(),
        }
    }
}

/// Groups required for a complete saturation diagram
pub fn default_groups() -> Vec<String> {
    ["MEM_DP", "FLOPS_SP", "FLOPS_DP", "L3", "L2", "PORT_USAGE1", "PORT_USAGE2"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl SchedulerConfig {
    /// Default groups, one worker per hardware thread of `profile`
    pub fn for_profile(profile: &ExperientialProfile) -> Self {
        Self {
            threads: profile.topology.thread_order.clone(),
            ..Self::default()
        }
    }

    pub fn with_groups<S: Into<String>>(mut self, groups: impl IntoIterator<Item = S>) -> Self {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_threads(mut self, threads: Vec<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Capture configuration for group `index`
    pub fn capture_config(&self, index: usize) -> Option<CaptureConfig> {
        self.groups.get(index).map(|group| {
            CaptureConfig::new(group.clone(), self.threads.clone())
                .with_output_path(self.output_path.clone())
                .with_mode(self.mode)
        })
    }

    fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(Error::config("no counter groups configured"));
        }
        if self.threads.is_empty() {
            return Err(Error::config("no worker threads configured"));
        }
        Ok(())
    }
}

// =================================================================================================
// Outcome
// =================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    Completed,
    /// Budget smaller than the number of groups; nothing ran
    BudgetTooSmall,
}

/// Summary of one scheduled measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub iterations_per_group: u64,
    pub groups_run: usize,
    pub status: ScheduleStatus,
}

impl ScheduleOutcome {
    fn budget_too_small() -> Self {
        Self {
            iterations_per_group: 0,
            groups_run: 0,
            status: ScheduleStatus::BudgetTooSmall,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ScheduleStatus::Completed
    }

    /// Iterations actually executed per worker across all groups
    pub fn total_iterations(&self) -> u64 {
        self.iterations_per_group * self.groups_run as u64
    }
}

/// What a worker knows while running the workload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerContext {
    /// Index of the worker in the pool
    pub worker: usize,
    /// Hardware thread the worker reports as
    pub thread: usize,
    /// Group currently measured
    pub group: usize,
    /// Iteration within the group pass
    pub iteration: u64,
}

// =================================================================================================
// Scheduler
// =================================================================================================

/// Runs a workload once per counter group and merges each pass
pub struct MetricGroupScheduler {
    config: SchedulerConfig,
    pool: ThreadPool,
}

impl MetricGroupScheduler {
    /// Build the worker pool, one worker per configured thread
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads.len())
            .thread_name(|i| format!("satmap-worker-{i}"))
            .build()
            .map_err(|e| Error::config(format!("cannot build worker pool: {e}")))?;

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Measure `tag` with `budget` total iterations split across all groups
    ///
    /// `workload` is called once per iteration on every worker, inside the
    /// region's start/stop scope. A failure on any worker in any group aborts
    /// the session: groups merged before it are discarded along with it.
    pub fn run<B, F>(
        &self,
        aggregator: &mut RegionAggregator<B>,
        tag: &str,
        budget: u64,
        workload: F,
    ) -> Result<ScheduleOutcome>
    where
        B: CaptureBackend,
        F: Fn(&WorkerContext) + Sync,
    {
        let groups = self.config.groups.len();

        if let Some(reason) = aggregator.failure() {
            return Err(Error::session(format!("cannot measure '{tag}' in an aborted session ({reason})")));
        }
        if budget < groups as u64 {
            log::error!(
                "measurement budget {budget} is smaller than the number of counter groups ({groups}); nothing measured"
            );
            return Ok(ScheduleOutcome::budget_too_small());
        }
        if budget < RECOMMENDED_MIN_BUDGET {
            log::warn!(
                "measurement budget {budget} is below {RECOMMENDED_MIN_BUDGET}; integer division across {groups} groups gives a large proportional error"
            );
        }

        let iterations = budget / groups as u64;
        if let Err(err) = self.run_groups(aggregator, tag, iterations, &workload) {
            aggregator.abort(err.to_string());
            return Err(err);
        }

        Ok(ScheduleOutcome {
            iterations_per_group: iterations,
            groups_run: groups,
            status: ScheduleStatus::Completed,
        })
    }

    fn run_groups<B, F>(
        &self,
        aggregator: &mut RegionAggregator<B>,
        tag: &str,
        iterations: u64,
        workload: &F,
    ) -> Result<()>
    where
        B: CaptureBackend,
        F: Fn(&WorkerContext) + Sync,
    {
        let groups = self.config.groups.len();
        let threads = &self.config.threads;

        for group in 0..groups {
            let Some(capture) = self.config.capture_config(group) else {
                break;
            };
            log::info!("group {}/{}: {} ({} iterations)", group + 1, groups, capture.event_group, iterations);
            aggregator.configure(&capture)?;

            let shared: &RegionAggregator<B> = aggregator;
            let results = self.pool.broadcast(|ctx| -> Result<f64> {
                let thread = threads.get(ctx.index()).copied().unwrap_or(ctx.index());
                shared.register_region(tag, thread)?;
                shared.start_region(tag, thread)?;
                for iteration in 0..iterations {
                    workload(&WorkerContext {
                        worker: ctx.index(),
                        thread,
                        group,
                        iteration,
                    });
                }
                shared.stop_region(tag, thread)
            });

            for result in results {
                result?;
            }

            aggregator.next_group()?;
            aggregator.merge_group_results(group)?;
        }

        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
