//! Integration tests: scheduler + capture backend + session results + export
//!
//! A full measurement session driven through the worker pool, with scripted
//! counter results standing in for the hardware.

use std::sync::atomic::{AtomicU64, Ordering};

use satmap::measure::{
    write_result_file, CaptureReport, MetricGroupScheduler, MetricKind, RegionAggregator, ReplayBackend,
    ScheduleStatus, SchedulerConfig,
};
use satmap::output::{CsvExporter, DiagramInput, Exporter, JsonExporter};
use satmap::{Error, ExperientialProfile, SessionResults};
use tempfile::tempdir;

mod common;
use common::{single_metric_report, FailingBackend, FailurePoint};

fn scheduler(groups: &[&str], threads: usize) -> MetricGroupScheduler {
    let config = SchedulerConfig::default()
        .with_groups(groups.iter().copied())
        .with_threads((0..threads).collect());
    MetricGroupScheduler::new(config).unwrap()
}

fn scripted() -> Vec<CaptureReport> {
    vec![
        single_metric_report("triad", "AVX SP [MFLOP/s]", &[45899.5, 45899.5]),
        single_metric_report("triad", "Memory bandwidth [MBytes/s]", &[6052.0, 6052.0]),
    ]
}

// =================================================================================================
// Full session
// =================================================================================================

#[test]
fn test_session_to_results() {
    let sched = scheduler(&["FLOPS_SP", "MEM_DP"], 2);
    let mut session = RegionAggregator::open(ReplayBackend::new(scripted()));
    let calls = AtomicU64::new(0);

    let outcome = sched
        .run(&mut session, "triad", 2000, |ctx| {
            assert!(ctx.group < 2);
            calls.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

    assert!(outcome.is_completed());
    assert_eq!(outcome.iterations_per_group, 1000);
    assert_eq!(calls.load(Ordering::Relaxed), 2 * 2 * 1000);

    let profile = ExperientialProfile::default();
    let results = SessionResults::from_aggregator(&session, &profile, Default::default()).unwrap();

    let sp = results.ratio("triad", MetricKind::SpFlopRate).unwrap();
    assert!((sp - 0.5).abs() < 1e-6);
    assert!(results.runtimes["triad"] >= 0.0);

    let backend = session.close().unwrap();
    assert_eq!(backend.opened_configs().len(), 2);
    assert_eq!(backend.opened_configs()[1].event_group, "MEM_DP");
}

#[test]
fn test_budget_smaller_than_groups_measures_nothing() {
    let sched = scheduler(&["A", "B", "C"], 1);
    let mut session = RegionAggregator::open(ReplayBackend::new(scripted()));

    let outcome = sched.run(&mut session, "triad", 2, |_| {}).unwrap();

    assert_eq!(outcome.status, ScheduleStatus::BudgetTooSmall);
    assert_eq!(outcome.total_iterations(), 0);
    assert!(session.compute_aggregates().unwrap().is_empty());
    assert!(session.merged_groups().is_empty());
}

#[test]
fn test_replay_from_recorded_files() {
    let dir = tempdir().unwrap();
    let paths: Vec<_> = scripted()
        .iter()
        .enumerate()
        .map(|(g, report)| {
            let path = dir.path().join(format!("group{g}.json"));
            write_result_file(report, &path).unwrap();
            path
        })
        .collect();

    let sched = scheduler(&["FLOPS_SP", "MEM_DP"], 1);
    let mut session = RegionAggregator::open(ReplayBackend::from_files(paths));
    sched.run(&mut session, "triad", 1000, |_| {}).unwrap();

    assert_eq!(session.compute_aggregates().unwrap().len(), 2);
}

// =================================================================================================
// Failures
// =================================================================================================

#[test]
fn test_capture_failure_aborts_session() {
    let sched = scheduler(&["FLOPS_SP"], 2);
    let mut session = RegionAggregator::open(FailingBackend::new(FailurePoint::Start));

    let err = sched.run(&mut session, "triad", 1000, |_| {}).unwrap_err();
    assert!(err.is_fatal_capture());
}

#[test]
fn test_stop_failure_aborts_first_group() {
    let sched = scheduler(&["FLOPS_SP", "MEM_DP"], 2);
    let mut session = RegionAggregator::open(FailingBackend::new(FailurePoint::Stop));

    let err = sched.run(&mut session, "triad", 1000, |_| {}).unwrap_err();
    assert!(err.is_fatal_capture());
    assert!(session.merged_groups().is_empty());
    assert!(session.compute_aggregates().is_err());
}

#[test]
fn test_failure_after_merged_group_leaves_no_partial_aggregate() {
    for point in [FailurePoint::Start, FailurePoint::Stop, FailurePoint::ReadResults] {
        let sched = scheduler(&["FLOPS_SP", "MEM_DP", "L2"], 1);
        let mut session = RegionAggregator::open(FailingBackend::in_group(point, 1));

        let err = sched.run(&mut session, "triad", 3000, |_| {}).unwrap_err();
        assert!(err.is_fatal_capture(), "{point:?}: {err}");

        // group 0 merged before the failure; nothing of it survives
        assert!(session.failure().is_some(), "{point:?}");
        assert!(session.merged_groups().is_empty(), "{point:?}");
        assert!(session.runtimes().is_empty(), "{point:?}");
        assert!(matches!(session.compute_aggregates(), Err(Error::Session(_))), "{point:?}");

        let results = SessionResults::from_aggregator(&session, &ExperientialProfile::default(), Default::default());
        assert!(results.is_err(), "{point:?}: results exported from an aborted session");
    }
}

#[test]
fn test_completed_groups_merge_when_nothing_fails() {
    // same backend, failure scheduled past the last group
    let sched = scheduler(&["FLOPS_SP", "MEM_DP"], 1);
    let mut session = RegionAggregator::open(FailingBackend::in_group(FailurePoint::ReadResults, 5));

    sched.run(&mut session, "triad", 2000, |_| {}).unwrap();

    let results = SessionResults::from_aggregator(&session, &ExperientialProfile::default(), Default::default()).unwrap();
    assert_eq!(session.merged_groups().len(), 2);
    assert!(!results.records().is_empty());
}

#[test]
fn test_missing_result_file_is_fatal() {
    let sched = scheduler(&["FLOPS_SP"], 1);
    let mut session = RegionAggregator::open(FailingBackend::new(FailurePoint::ReadResults));

    let err = sched.run(&mut session, "triad", 1000, |_| {}).unwrap_err();
    assert!(matches!(err, Error::ResultFile { .. }));
}

#[test]
fn test_start_before_register_is_rejected() {
    let session = RegionAggregator::open(ReplayBackend::default());
    let err = session.start_region("never_registered", 0).unwrap_err();
    assert!(matches!(err, Error::Session(_)));
}

// =================================================================================================
// Export
// =================================================================================================

#[test]
fn test_exported_json_renders() {
    let sched = scheduler(&["FLOPS_SP", "MEM_DP"], 2);
    let mut session = RegionAggregator::open(ReplayBackend::new(scripted()));
    sched.run(&mut session, "triad", 2000, |_| {}).unwrap();

    let profile = ExperientialProfile::default();
    let results = SessionResults::from_aggregator(&session, &profile, Default::default()).unwrap();

    let dir = tempdir().unwrap();
    let json = dir.path().join("triad.json");
    let csv = dir.path().join("triad.csv");
    JsonExporter::default().export(&results, &json).unwrap();
    CsvExporter::default().export(&results, &csv).unwrap();

    let input = DiagramInput::from_json_file(&json).unwrap();
    let triad = input.region("triad").unwrap();
    assert_eq!(triad.saturation["AVX DP [MFLOP/s]"], None);
    assert!(triad.saturation["Memory bandwidth [MBytes/s]"].is_some());

    let svg = dir.path().join("triad.svg");
    let diagram = satmap::output::render_diagram(&input, "triad", &profile, &svg, None).unwrap();
    assert!(svg.exists());
    // SP and RAM measured; everything else drawn as a placeholder
    assert!(diagram.neutral_nodes().count() > 0);

    let text = std::fs::read_to_string(&csv).unwrap();
    assert!(text.lines().any(|l| l.starts_with("triad,AVX SP [MFLOP/s],saturation,")));
}
