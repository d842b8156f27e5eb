//! Saturation scaling
//!
//! A raw aggregate is turned into a saturation level in two steps:
//!
//! 1. `t = raw / peak`, clamped to `[0, 1]` (absent when the peak is unset)
//! 2. `scaled = (log2(t) + 7) / 7`, clamped to `[0, 1]`
//!
//! The log scale spreads the low end: a kernel at 1/128 of peak or less maps to
//! `0`, each doubling of throughput adds `1/7`.

use std::collections::BTreeMap;

use crate::measure::aggregator::AggregateSet;
use crate::measure::metrics::MetricKind;
use crate::profile::ExperientialProfile;

/// Doublings of throughput covered by the scale
pub const LOG_SCALE_OCTAVES: f64 = 7.0;

/// Unscaled fraction of peak, `raw / peak`
///
/// `None` when the peak is zero/unset or either value is not a number.
pub fn saturation_ratio(raw: f64, peak: f64) -> Option<f64> {
    if raw.is_nan() || !peak.is_finite() || peak <= 0.0 {
        return None;
    }
    Some(raw / peak)
}

/// Map a fraction of peak onto the log-scaled saturation level in `[0, 1]`
pub fn scale_ratio(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    ((t.log2() + LOG_SCALE_OCTAVES) / LOG_SCALE_OCTAVES).clamp(0.0, 1.0)
}

/// `raw` relative to `peak`, log-scaled into `[0, 1]`
///
/// # Example
///
/// ```rust
/// use satmap::saturation::saturate;
///
/// let level = saturate(200.0, 1000.0).unwrap();
/// assert!((level - 0.6712).abs() < 1e-4);
/// assert_eq!(saturate(1.0, 0.0), None);
/// ```
pub fn saturate(raw: f64, peak: f64) -> Option<f64> {
    saturation_ratio(raw, peak).map(scale_ratio)
}

// =================================================================================================
// Calculator over a session
// =================================================================================================

/// Saturation of aggregates against one machine profile
#[derive(Debug, Clone, Copy)]
pub struct SaturationCalculator<'a> {
    profile: &'a ExperientialProfile,
}

impl<'a> SaturationCalculator<'a> {
    pub fn new(profile: &'a ExperientialProfile) -> Self {
        Self { profile }
    }

    /// Unscaled ratio of `metric` in `tag`
    pub fn ratio(&self, aggregates: &AggregateSet, tag: &str, metric: MetricKind) -> Option<f64> {
        let peak = self.profile.peak_for(metric)?;
        let raw = aggregates.value(tag, metric)?;
        let ratio = saturation_ratio(raw, peak);
        if ratio.is_none() {
            log::debug!("no saturation for {metric} in '{tag}': peak is unset");
        }
        ratio
    }

    /// Log-scaled saturation level of `metric` in `tag`
    pub fn level(&self, aggregates: &AggregateSet, tag: &str, metric: MetricKind) -> Option<f64> {
        self.ratio(aggregates, tag, metric).map(scale_ratio)
    }

    /// Unscaled ratios of every metric with a peak that `tag` measured
    pub fn ratios(&self, aggregates: &AggregateSet, tag: &str) -> BTreeMap<MetricKind, f64> {
        aggregates
            .region(tag)
            .filter_map(|(key, _)| {
                self.ratio(aggregates, tag, key.metric)
                    .map(|r| (key.metric, r))
            })
            .collect()
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::metrics::{AggregationKind, MemoryLevel, Traffic};
    use approx::assert_relative_eq;

    #[test]
    fn test_scale_endpoints() {
        assert_eq!(scale_ratio(1.0), 1.0);
        assert_eq!(scale_ratio(0.0), 0.0);
        assert_eq!(scale_ratio(1.0 / 128.0), 0.0);
        assert_relative_eq!(scale_ratio(0.5), 6.0 / 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scale_clamps_out_of_range() {
        assert_eq!(scale_ratio(3.5), 1.0);
        assert_eq!(scale_ratio(-0.2), 0.0);
        assert_eq!(scale_ratio(1e-9), 0.0);
    }

    #[test]
    fn test_fifth_of_peak() {
        assert_relative_eq!(saturate(200.0, 1000.0).unwrap(), 0.671_2, epsilon = 1e-4);
    }

    #[test]
    fn test_unset_peak_is_absent() {
        assert_eq!(saturate(10.0, 0.0), None);
        assert_eq!(saturate(10.0, -1.0), None);
        assert_eq!(saturate(f64::NAN, 10.0), None);
        assert_eq!(saturation_ratio(10.0, f64::NAN), None);
    }

    #[test]
    fn test_calculator_uses_profile_peaks() {
        let profile = ExperientialProfile::default();
        let calc = SaturationCalculator::new(&profile);

        let ram = MetricKind::bandwidth(MemoryLevel::Ram, Traffic::Total);
        let mut set = AggregateSet::new();
        set.insert("r", ram, AggregationKind::Sum, profile.peaks.ram_bandwidth / 2.0);
        set.insert("r", MetricKind::DpFlopRate, AggregationKind::Sum, 100.0);
        set.insert("r", MetricKind::PortUsage(0), AggregationKind::GeometricMean, 0.3);

        assert_relative_eq!(calc.ratio(&set, "r", ram).unwrap(), 0.5, epsilon = 1e-12);
        // DP peak unset on the reference machine
        assert_eq!(calc.level(&set, "r", MetricKind::DpFlopRate), None);

        let ratios = calc.ratios(&set, "r");
        assert_eq!(ratios.len(), 1);
        assert!(ratios.contains_key(&ram));
    }
}
