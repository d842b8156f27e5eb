//! Export of session results
//!
//! # Architecture
//!
//! Every format implements [`Exporter`] in its own sub-module; adding a format
//! means adding a file.
//!
//! | Format | Module   | Content |
//! |--------|----------|---------|
//! | CSV    | [`csv`]  | one row per scalar: region, metric, aggregation, value |
//! | JSON   | [`json`] | the diagram input document |
//!
//! # Usage example
//!
//! ```rust,ignore
//! use satmap::output::export::{CsvExporter, Exporter, JsonExporter};
//!
//! CsvExporter::default().export(&results, Path::new("triad.csv"))?;
//! JsonExporter::default().export(&results, Path::new("triad.json"))?;
//! ```

pub mod csv;
pub mod json;

pub use csv::{CsvConfig, CsvExporter, CsvMetadata};
pub use json::JsonExporter;

use std::path::Path;

use crate::results::SessionResults;

/// Abstraction over export formats
///
/// # Associated type `Error`
///
/// Each format reports its own error type, so callers can react to it without
/// downcasting a boxed error.
pub trait Exporter {
    type Error: std::error::Error;

    /// Write `results` to `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the results hold
    /// values the format cannot represent.
    fn export(&self, results: &SessionResults, path: &Path) -> Result<(), Self::Error>;
}
