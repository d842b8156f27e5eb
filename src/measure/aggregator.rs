//! Region aggregation
//!
//! A [`RegionAggregator`] owns every sample of one measurement session. Its
//! lifecycle is explicit:
//!
//! ```text
//! open(backend) → (start/stop regions, merge_group_results)* → compute_aggregates → close
//! ```
//!
//! A fatal capture error [`abort`](RegionAggregator::abort)s the session: the
//! samples merged so far are discarded and every later aggregation is refused.
//!
//! Samples are keyed by (metric, group, hardware thread). Merging a group index
//! a second time replaces that group's samples, so a metric reported by one
//! group is never counted twice. NaN entries are stored but never aggregated.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use parking_lot::Mutex;

use super::capture::{CaptureBackend, CaptureConfig, CaptureReport};
use super::metrics::{AggregationKind, MetricKind};
use crate::error::{Error, Result};

// =================================================================================================
// Aggregate results
// =================================================================================================

/// Key of one aggregate scalar
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregateKey {
    pub tag: String,
    pub metric: MetricKind,
    pub kind: AggregationKind,
}

/// Aggregate scalars of a session, keyed by (tag, metric, aggregation kind)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSet {
    values: BTreeMap<AggregateKey, f64>,
}

impl AggregateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>, metric: MetricKind, kind: AggregationKind, value: f64) {
        self.values.insert(
            AggregateKey {
                tag: tag.into(),
                metric,
                kind,
            },
            value,
        );
    }

    /// Aggregate of `metric` in `tag` with an explicit aggregation kind
    pub fn get(&self, tag: &str, metric: MetricKind, kind: AggregationKind) -> Option<f64> {
        self.values
            .get(&AggregateKey {
                tag: tag.to_string(),
                metric,
                kind,
            })
            .copied()
    }

    /// Aggregate of `metric` in `tag` using the metric's own aggregation kind
    pub fn value(&self, tag: &str, metric: MetricKind) -> Option<f64> {
        self.get(tag, metric, metric.aggregation())
    }

    /// Region tags with at least one aggregate
    pub fn regions(&self) -> BTreeSet<&str> {
        self.values.keys().map(|k| k.tag.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AggregateKey, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    /// Aggregates of one region
    pub fn region<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = (&'a AggregateKey, f64)> + 'a {
        self.iter().filter(move |(k, _)| k.tag == tag)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Sum of every non-NaN value; `None` when nothing remains
pub fn sum_excluding_nan(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut total = 0.0;
    let mut count = 0usize;
    for v in values.into_iter().filter(|v| !v.is_nan()) {
        total += v;
        count += 1;
    }
    (count > 0).then_some(total)
}

/// Geometric mean of every non-NaN value; `None` when nothing remains
///
/// Zeros are kept and pull the mean to zero. Negative values have no
/// logarithm; they are skipped with a warning.
pub fn geometric_mean_excluding_nan(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut log_total = 0.0;
    let mut count = 0usize;
    for v in values.into_iter().filter(|v| !v.is_nan()) {
        if v < 0.0 {
            log::warn!("negative sample {v} excluded from geometric mean");
            continue;
        }
        log_total += v.ln();
        count += 1;
    }
    (count > 0).then(|| (log_total / count as f64).exp())
}

// =================================================================================================
// Samples
// =================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SampleKey {
    metric: MetricKind,
    group: usize,
    thread: usize,
}

/// Every sample recorded for one region tag
#[derive(Debug, Clone, Default)]
struct RegionSamples {
    samples: BTreeMap<SampleKey, f64>,
}

impl RegionSamples {
    fn drop_group(&mut self, group: usize) {
        self.samples.retain(|key, _| key.group != group);
    }

    fn values_of(&self, metric: MetricKind) -> impl Iterator<Item = f64> + '_ {
        self.samples
            .iter()
            .filter(move |(key, _)| key.metric == metric)
            .map(|(_, v)| *v)
    }

    fn metrics(&self) -> BTreeSet<MetricKind> {
        self.samples.keys().map(|k| k.metric).collect()
    }
}

// =================================================================================================
// Aggregator
// =================================================================================================

/// Session-scoped owner of regions, samples and runtimes
///
/// `start_region`/`stop_region` take `&self` and may be called from every
/// worker at once; merging and aggregation require exclusive access.
pub struct RegionAggregator<B: CaptureBackend> {
    backend: B,
    regions: BTreeMap<String, RegionSamples>,
    registered: Mutex<HashSet<String>>,
    runtimes: Mutex<BTreeMap<String, f64>>,
    merged_groups: BTreeSet<usize>,
    /// Reason the session was aborted
    failure: Option<String>,
}

impl<B: CaptureBackend> RegionAggregator<B> {
    /// Open a session on `backend`
    pub fn open(backend: B) -> Self {
        Self {
            backend,
            regions: BTreeMap::new(),
            registered: Mutex::new(HashSet::new()),
            runtimes: Mutex::new(BTreeMap::new()),
            merged_groups: BTreeSet::new(),
            failure: None,
        }
    }

    /// Program the backend for one counter group
    pub fn configure(&mut self, config: &CaptureConfig) -> Result<()> {
        self.backend.open(config)
    }

    /// Register `tag` on `thread`; required before its first start
    pub fn register_region(&self, tag: &str, thread: usize) -> Result<()> {
        self.backend.register_region(tag, thread)?;
        self.registered.lock().insert(tag.to_string());
        Ok(())
    }

    pub fn start_region(&self, tag: &str, thread: usize) -> Result<()> {
        if !self.registered.lock().contains(tag) {
            return Err(Error::session(format!("region '{tag}' is not registered")));
        }
        self.backend.start_region(tag, thread)
    }

    /// Stop `tag` on `thread`; the region's runtime becomes the max over all stops
    pub fn stop_region(&self, tag: &str, thread: usize) -> Result<f64> {
        let secs = self.backend.stop_region(tag, thread)?;
        self.runtimes
            .lock()
            .entry(tag.to_string())
            .and_modify(|max| *max = max.max(secs))
            .or_insert(secs);
        Ok(secs)
    }

    /// Advance the backend to the next counter group
    pub fn next_group(&mut self) -> Result<()> {
        self.backend.next_group()
    }

    /// Pull the finished pass from the backend and store it under `group`
    pub fn merge_group_results(&mut self, group: usize) -> Result<usize> {
        self.ensure_live()?;
        let report = self.backend.read_results()?;
        Ok(self.ingest(group, &report))
    }

    /// Store `report` under `group`, replacing anything merged for that group before
    ///
    /// Returns the number of samples stored.
    pub fn ingest(&mut self, group: usize, report: &CaptureReport) -> usize {
        if self.failure.is_some() {
            log::warn!("session aborted; group {group} not merged");
            return 0;
        }
        if !self.merged_groups.insert(group) {
            log::debug!("group {group} merged again; replacing its samples");
            for region in self.regions.values_mut() {
                region.drop_group(group);
            }
        }

        let mut stored = 0;
        for region in &report.regions {
            let samples = self.regions.entry(region.tag.clone()).or_default();

            for thread in &region.threads {
                for (name, value) in thread.events.iter().chain(thread.metrics.iter()) {
                    let Some(metric) = MetricKind::from_external(name) else {
                        log::debug!("dropping unknown metric '{name}' in region '{}'", region.tag);
                        continue;
                    };
                    let key = SampleKey {
                        metric,
                        group,
                        thread: thread.thread,
                    };
                    samples.samples.insert(key, value.unwrap_or(f64::NAN));
                    stored += 1;
                }
            }
        }

        log::info!("merged group {group}: {stored} samples");
        stored
    }

    /// Aggregate every region's samples
    ///
    /// Pure with respect to the session state: two calls without new samples
    /// return identical sets. An aborted session has no aggregates.
    pub fn compute_aggregates(&self) -> Result<AggregateSet> {
        self.ensure_live()?;
        let mut set = AggregateSet::new();

        for (tag, region) in &self.regions {
            for metric in region.metrics() {
                let kind = metric.aggregation();
                let value = match kind {
                    AggregationKind::Sum => sum_excluding_nan(region.values_of(metric)),
                    AggregationKind::GeometricMean => {
                        geometric_mean_excluding_nan(region.values_of(metric))
                    }
                };
                if let Some(value) = value {
                    set.insert(tag.clone(), metric, kind, value);
                }
            }
        }

        Ok(set)
    }

    /// Abort the session after a fatal capture error
    ///
    /// Every merged sample and runtime is dropped; nothing measured before the
    /// failure can be aggregated afterwards.
    pub fn abort(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        log::error!("measurement session aborted: {reason}");
        self.regions.clear();
        self.merged_groups.clear();
        self.runtimes.lock().clear();
        self.failure = Some(reason);
    }

    /// Reason the session was aborted, if it was
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    fn ensure_live(&self) -> Result<()> {
        match &self.failure {
            Some(reason) => Err(Error::session(format!("session was aborted ({reason})"))),
            None => Ok(()),
        }
    }

    /// Maximum wall time observed for `tag`
    pub fn runtime(&self, tag: &str) -> Option<f64> {
        self.runtimes.lock().get(tag).copied()
    }

    /// Maximum wall time of every region stopped at least once
    pub fn runtimes(&self) -> BTreeMap<String, f64> {
        self.runtimes.lock().clone()
    }

    /// Group indices merged so far
    pub fn merged_groups(&self) -> &BTreeSet<usize> {
        &self.merged_groups
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// End the session, releasing the backend
    pub fn close(mut self) -> Result<B> {
        self.backend.close()?;
        Ok(self.backend)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
