//! Common utilities for integration tests

pub mod mock_backends;
pub mod test_helpers;

// Re-export commonly used items
pub use mock_backends::{FailingBackend, FailurePoint};
pub use test_helpers::{
    region_report,
    relative_error,
    sample_diagram_input,
    single_metric_report,
};
