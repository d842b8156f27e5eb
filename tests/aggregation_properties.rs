//! Integration tests: capture reports + region aggregator
//!
//! Properties of the merge and aggregation layer that hold regardless of which
//! backend produced the samples.

use satmap::measure::{
    AggregationKind, CaptureReport, MemoryLevel, MetricKind, RegionAggregator, ReplayBackend, Traffic,
};

mod common;
use common::{region_report, single_metric_report};

const SP: &str = "AVX SP [MFLOP/s]";
const DP: &str = "AVX DP [MFLOP/s]";
const RAM: &str = "Memory bandwidth [MBytes/s]";

fn session() -> RegionAggregator<ReplayBackend> {
    RegionAggregator::open(ReplayBackend::default())
}

// =================================================================================================
// Union across groups
// =================================================================================================

#[test]
fn test_two_groups_give_union_without_double_counting() {
    let mut agg = session();
    agg.ingest(0, &single_metric_report("kernel", SP, &[10.0, 20.0]));
    agg.ingest(1, &single_metric_report("kernel", RAM, &[5.0, 5.0]));

    let set = agg.compute_aggregates().unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.value("kernel", MetricKind::SpFlopRate), Some(30.0));
    assert_eq!(
        set.value("kernel", MetricKind::bandwidth(MemoryLevel::Ram, Traffic::Total)),
        Some(10.0)
    );
}

#[test]
fn test_remerging_a_group_replaces_it() {
    let mut agg = session();
    let report = single_metric_report("kernel", SP, &[10.0, 20.0]);
    agg.ingest(0, &report);
    agg.ingest(0, &report);

    assert_eq!(agg.compute_aggregates().unwrap().value("kernel", MetricKind::SpFlopRate), Some(30.0));
    assert_eq!(agg.merged_groups().len(), 1);
}

#[test]
fn test_same_metric_in_two_groups_is_summed() {
    let mut agg = session();
    agg.ingest(0, &single_metric_report("kernel", SP, &[1.0]));
    agg.ingest(1, &single_metric_report("kernel", SP, &[2.0]));

    assert_eq!(agg.compute_aggregates().unwrap().value("kernel", MetricKind::SpFlopRate), Some(3.0));
}

#[test]
fn test_peak_sp_scenario() {
    let mut agg = session();
    agg.ingest(0, &single_metric_report("peak_sp", SP, &[100.0, 100.0]));
    agg.ingest(1, &single_metric_report("peak_sp", DP, &[50.0, 50.0]));

    let set = agg.compute_aggregates().unwrap();
    assert_eq!(set.get("peak_sp", MetricKind::SpFlopRate, AggregationKind::Sum), Some(200.0));
    assert_eq!(set.get("peak_sp", MetricKind::DpFlopRate, AggregationKind::Sum), Some(100.0));
}

// =================================================================================================
// NaN exclusion
// =================================================================================================

#[test]
fn test_nan_thread_excluded_from_sum() {
    let mut agg = session();
    agg.ingest(0, &single_metric_report("kernel", SP, &[1.0, f64::NAN, 3.0]));

    assert_eq!(agg.compute_aggregates().unwrap().value("kernel", MetricKind::SpFlopRate), Some(4.0));
}

#[test]
fn test_null_thread_excluded_from_geometric_mean() {
    let mut agg = session();
    let report = CaptureReport {
        regions: vec![region_report("kernel", "Port2 usage ratio", &[Some(0.25), None, Some(1.0)])],
    };
    agg.ingest(0, &report);

    let value = agg.compute_aggregates().unwrap().value("kernel", MetricKind::PortUsage(2)).unwrap();
    assert!((value - 0.5).abs() < 1e-12);
}

#[test]
fn test_all_nan_metric_has_no_aggregate() {
    let mut agg = session();
    agg.ingest(0, &single_metric_report("kernel", SP, &[f64::NAN, f64::NAN]));

    assert!(agg.compute_aggregates().unwrap().is_empty());
}

// =================================================================================================
// Idempotence
// =================================================================================================

#[test]
fn test_compute_aggregates_is_bit_identical() {
    let mut agg = session();
    agg.ingest(0, &single_metric_report("a", SP, &[0.1, 0.2, 0.3]));
    agg.ingest(1, &single_metric_report("a", "Port0 usage ratio", &[0.3, 0.7, 0.11]));
    agg.ingest(2, &single_metric_report("b", RAM, &[1e-9, 3.3]));

    let first = agg.compute_aggregates().unwrap();
    let second = agg.compute_aggregates().unwrap();

    let bits = |set: &satmap::measure::AggregateSet| -> Vec<(String, u64)> {
        set.iter()
            .map(|(key, value)| (format!("{}/{}", key.tag, key.metric), value.to_bits()))
            .collect()
    };
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn test_unknown_names_dropped_at_ingestion() {
    let mut agg = session();
    let stored = agg.ingest(0, &single_metric_report("kernel", "Branch misprediction rate", &[1.0]));

    assert_eq!(stored, 0);
    assert!(agg.compute_aggregates().unwrap().is_empty());
}
