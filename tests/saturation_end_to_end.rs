//! Integration tests: aggregation + saturation + color mapping
//!
//! From raw per-thread values to the color a diagram box is filled with.

use satmap::color::{bin_index, lerp_color, ColorScale, Palette, Rgb, BIN_COUNT};
use satmap::measure::{MetricKind, RegionAggregator, ReplayBackend};
use satmap::profile::PeakRates;
use satmap::saturation::{saturate, scale_ratio, SaturationCalculator};
use satmap::ExperientialProfile;

mod common;
use common::{relative_error, single_metric_report};

fn profile_with_sp_peak(peak: f64) -> ExperientialProfile {
    ExperientialProfile {
        peaks: PeakRates {
            sp_mflops: peak,
            ..PeakRates::default()
        },
        ..ExperientialProfile::default()
    }
}

// =================================================================================================
// End-to-end scenario
// =================================================================================================

#[test]
fn test_fifth_of_peak_lands_in_bin_six() {
    let mut agg = RegionAggregator::open(ReplayBackend::default());
    agg.ingest(0, &single_metric_report("peak_sp", "AVX SP [MFLOP/s]", &[100.0, 100.0]));
    let aggregates = agg.compute_aggregates().unwrap();

    let profile = profile_with_sp_peak(1000.0);
    let calculator = SaturationCalculator::new(&profile);

    let ratio = calculator.ratio(&aggregates, "peak_sp", MetricKind::SpFlopRate).unwrap();
    assert!(relative_error(ratio, 0.2) < 1e-12);

    let level = calculator.level(&aggregates, "peak_sp", MetricKind::SpFlopRate).unwrap();
    assert!((level - 0.6712).abs() < 1e-4);
    assert_eq!(bin_index(level), Some(6));

    let color = ColorScale::Discrete(Palette::YlGnBu).color(level);
    assert_eq!(color, Palette::YlGnBu.colors()[6]);
}

#[test]
fn test_unset_peak_gives_no_level() {
    let mut agg = RegionAggregator::open(ReplayBackend::default());
    agg.ingest(0, &single_metric_report("dp", "AVX DP [MFLOP/s]", &[100.0]));
    let aggregates = agg.compute_aggregates().unwrap();

    // reference profile has no DP peak
    let profile = ExperientialProfile::default();
    let calculator = SaturationCalculator::new(&profile);
    assert_eq!(calculator.level(&aggregates, "dp", MetricKind::DpFlopRate), None);
    assert!(calculator.ratios(&aggregates, "dp").is_empty());
}

// =================================================================================================
// Clamping
// =================================================================================================

#[test]
fn test_at_or_above_peak_is_top_bin() {
    let top = Palette::RdPu.colors()[BIN_COUNT - 1];
    for raw in [1000.0, 1000.5, 5e6] {
        let level = saturate(raw, 1000.0).unwrap();
        assert_eq!(level, 1.0);
        assert_eq!(ColorScale::Discrete(Palette::RdPu).color(level), top);
    }
}

#[test]
fn test_zero_or_negative_is_bottom_bin() {
    let bottom = Palette::RdPu.colors()[0];
    for raw in [0.0, -1.0, -1e9] {
        let level = saturate(raw, 1000.0).unwrap();
        assert_eq!(level, 0.0);
        assert_eq!(ColorScale::Discrete(Palette::RdPu).color(level), bottom);
    }
}

#[test]
fn test_each_doubling_adds_one_seventh() {
    let mut previous = scale_ratio(1.0 / 128.0);
    assert_eq!(previous, 0.0);
    for k in (0..7).rev() {
        let level = scale_ratio(1.0 / f64::from(1u32 << k));
        assert!((level - previous - 1.0 / 7.0).abs() < 1e-12);
        previous = level;
    }
}

// =================================================================================================
// Continuous scale
// =================================================================================================

#[test]
fn test_continuous_scale_endpoints() {
    let min = Rgb::from_hex(0xffffd9);
    let max = Rgb::from_hex(0x081d58);

    assert_eq!(lerp_color(min, max, 0.0), min);
    let end = lerp_color(min, max, 1.0);
    assert!((end.r - max.r).abs() < 1e-12);
    assert!((end.g - max.g).abs() < 1e-12);
    assert!((end.b - max.b).abs() < 1e-12);

    let scale = ColorScale::Continuous { min, max };
    assert_eq!(scale.color(-3.0), min);
}
