//! Helper functions for integration tests

use std::collections::BTreeMap;

use satmap::measure::{CaptureReport, RegionReport, ThreadReport};
use satmap::output::diagram::input::{ProcessorInfo, RegionResults, SessionInfo};
use satmap::output::DiagramInput;

/// Relative error between a computed and an expected value
pub fn relative_error(computed: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-14 {
        computed.abs()
    } else {
        ((computed - expected) / expected).abs()
    }
}

/// One region with `name` reported by consecutive threads
pub fn region_report(tag: &str, name: &str, per_thread: &[Option<f64>]) -> RegionReport {
    RegionReport {
        tag: tag.to_string(),
        group: 0,
        threads: per_thread
            .iter()
            .enumerate()
            .map(|(thread, value)| ThreadReport {
                thread,
                events: BTreeMap::new(),
                metrics: BTreeMap::from([(name.to_string(), *value)]),
            })
            .collect(),
    }
}

/// A capture pass holding one metric of one region
pub fn single_metric_report(tag: &str, name: &str, per_thread: &[f64]) -> CaptureReport {
    let values: Vec<Option<f64>> = per_thread.iter().copied().map(Some).collect();
    CaptureReport {
        regions: vec![region_report(tag, name, &values)],
    }
}

/// Diagram input for region "triad" with every drawn metric measured
/// except DP flops, which is `null`
pub fn sample_diagram_input() -> DiagramInput {
    let saturation: BTreeMap<String, Option<f64>> = [
        ("Memory bandwidth [MBytes/s]", Some(0.5)),
        ("Memory read bandwidth [MBytes/s]", Some(0.4)),
        ("Memory write bandwidth [MBytes/s]", Some(0.1)),
        ("L3 bandwidth [MBytes/s]", Some(0.3)),
        ("L3 load bandwidth [MBytes/s]", Some(0.2)),
        ("L3 evict bandwidth [MBytes/s]", Some(0.1)),
        ("L2 bandwidth [MBytes/s]", Some(0.25)),
        ("L2 load bandwidth [MBytes/s]", Some(0.2)),
        ("L2 evict bandwidth [MBytes/s]", Some(0.05)),
        ("AVX SP [MFLOP/s]", Some(0.2)),
        ("AVX DP [MFLOP/s]", None),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let geometric_mean = (0..8)
        .map(|p| (format!("Port{p} usage ratio"), Some(0.1 * f64::from(p + 1))))
        .collect();

    DiagramInput {
        info: SessionInfo {
            processor: ProcessorInfo {
                name: "Intel(R) Core(TM) i5-6300U CPU @ 2.40GHz".to_string(),
                num_sockets: 1,
                num_numa_nodes: 1,
                num_hw_threads: 4,
                num_threads_in_use: 4,
                affinity: "0,2,1,3".to_string(),
            },
            parameters: "array n: 4096".to_string(),
        },
        results: BTreeMap::from([(
            "triad".to_string(),
            RegionResults {
                saturation,
                geometric_mean,
                sum: BTreeMap::new(),
                runtime: Some(0.25),
            },
        )]),
    }
}
