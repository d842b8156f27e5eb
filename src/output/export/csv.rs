//! CSV export of session results
//!
//! One row per exported scalar, readable by spreadsheets and pandas alike.
//!
//! # Quick Examples
//!
//! ## Minimal Export
//!
//! ```rust,ignore
//! use satmap::output::export::{CsvExporter, Exporter};
//!
//! CsvExporter::default().export(&results, Path::new("session.csv"))?;
//! ```
//!
//! **Output** (`session.csv`):
//! ```csv
//! region,metric,aggregation,value
//! triad,Region wall time [s],max,0.512000
//! triad,Memory bandwidth [MBytes/s],sum,12104.088867
//! triad,Port0 usage ratio,geometric_mean,0.250000
//! triad,Memory bandwidth [MBytes/s],saturation,0.500000
//! ```
//!
//! ## With Metadata
//!
//! ```rust,ignore
//! let config = CsvConfig::default().with_metadata(CsvMetadata::from_info(&results.info));
//! CsvExporter::new(config).export(&results, Path::new("session.csv"))?;
//! ```
//!
//! **Output**:
//! ```csv
//! # Saturation Session Data
//! # Generated: 2026-10-18T09:30:00+00:00
//! # Processor: Intel(R) Core(TM) i5-6300U CPU @ 2.40GHz
//! # HW threads in use: 4
//! # Affinity: 0,2,1,3
//! #
//! region,metric,aggregation,value
//! ...
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::Exporter;
use crate::error::{Error, Result};
use crate::output::diagram::input::SessionInfo;
use crate::output::diagram::render::prepare_output;
use crate::results::{ResultRecord, SessionResults};

// =============================================================================
// Configuration Structures
// =============================================================================

/// Configuration for CSV export
///
/// # Example
///
/// ```rust,ignore
/// let config = CsvConfig {
///     delimiter: ';',
///     precision: 10,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Column delimiter (default: ',')
    pub delimiter: char,

    /// Decimal separator (default: '.')
    pub decimal_separator: char,

    /// Number of decimal places (default: 6)
    pub precision: usize,

    /// Include metadata header comments (default: false)
    pub include_metadata: bool,

    pub metadata: Option<CsvMetadata>,

    /// Header row (default: "region,metric,aggregation,value" with the configured delimiter)
    pub columns: [String; 4],
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            decimal_separator: '.',
            precision: 6,
            include_metadata: false,
            metadata: None,
            columns: ["region", "metric", "aggregation", "value"].map(String::from),
        }
    }
}

impl CsvConfig {
    /// Semicolon-separated, comma as decimal point
    pub fn european() -> Self {
        Self {
            delimiter: ';',
            decimal_separator: ',',
            ..Default::default()
        }
    }

    pub fn high_precision() -> Self {
        Self {
            precision: 12,
            ..Default::default()
        }
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_metadata(mut self, metadata: CsvMetadata) -> Self {
        self.include_metadata = true;
        self.metadata = Some(metadata);
        self
    }
}

/// Metadata for CSV header comments; only fields that are set are written
#[derive(Debug, Clone, Default)]
pub struct CsvMetadata {
    pub processor: Option<String>,
    pub threads_in_use: Option<usize>,
    pub affinity: Option<String>,
    /// Free-form run description
    pub parameters: Option<String>,
    pub custom: Vec<(String, String)>,
}

impl CsvMetadata {
    pub fn from_info(info: &SessionInfo) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            processor: non_empty(&info.processor.name),
            threads_in_use: Some(info.processor.num_threads_in_use),
            affinity: non_empty(&info.processor.affinity),
            parameters: non_empty(&info.parameters),
            custom: Vec::new(),
        }
    }

    pub fn add_custom(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom.push((key.into(), value.into()));
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn write_metadata_header(out: &mut impl Write, metadata: &CsvMetadata) -> Result<()> {
    writeln!(out, "# Saturation Session Data")?;
    writeln!(out, "# Generated: {}", chrono::Utc::now().to_rfc3339())?;

    if let Some(processor) = &metadata.processor {
        writeln!(out, "# Processor: {processor}")?;
    }
    if let Some(threads) = metadata.threads_in_use {
        writeln!(out, "# HW threads in use: {threads}")?;
    }
    if let Some(affinity) = &metadata.affinity {
        writeln!(out, "# Affinity: {affinity}")?;
    }
    if let Some(parameters) = &metadata.parameters {
        for line in parameters.lines() {
            writeln!(out, "# {line}")?;
        }
    }
    for (key, value) in &metadata.custom {
        writeln!(out, "# {key}: {value}")?;
    }

    writeln!(out, "#")?;
    Ok(())
}

fn format_number(value: f64, config: &CsvConfig) -> String {
    let formatted = format!("{:.prec$}", value, prec = config.precision);
    if config.decimal_separator != '.' {
        formatted.replace('.', &config.decimal_separator.to_string())
    } else {
        formatted
    }
}

/// Quote a text field that contains the delimiter or a quote
fn escape_field(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn validate(records: &[ResultRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(Error::export("Empty data: session produced no results"));
    }
    if let Some(bad) = records.iter().find(|r| !r.value.is_finite()) {
        return Err(Error::export(format!(
            "Invalid data: non-finite value for '{}' in region '{}'",
            bad.metric, bad.region
        )));
    }
    Ok(())
}

// =============================================================================
// Exporter
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    pub config: CsvConfig,
}

impl CsvExporter {
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }

    /// Write `records` to any sink
    pub fn write_records(&self, records: &[ResultRecord], out: &mut impl Write) -> Result<()> {
        // ============================= Validation =============================
        validate(records)?;

        let config = &self.config;
        let d = config.delimiter;

        // ============================= Metadata ===============================
        if config.include_metadata {
            if let Some(metadata) = &config.metadata {
                write_metadata_header(out, metadata)?;
            }
        }

        // ============================= Header / Data ==========================
        let header: Vec<String> = config.columns.iter().map(|c| escape_field(c, d)).collect();
        writeln!(out, "{}", header.join(&d.to_string()))?;

        for record in records {
            writeln!(
                out,
                "{}{d}{}{d}{}{d}{}",
                escape_field(&record.region, d),
                escape_field(&record.metric, d),
                record.kind.as_str(),
                format_number(record.value, config),
            )?;
        }

        Ok(())
    }
}

impl Exporter for CsvExporter {
    type Error = Error;

    fn export(&self, results: &SessionResults, path: &Path) -> Result<()> {
        let records = results.records();
        validate(&records)?;

        prepare_output(path)?;
        let mut out = BufWriter::new(File::create(path)?);
        self.write_records(&records, &mut out)?;
        out.flush()?;

        log::info!("exported {} records to {}", records.len(), path.display());
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::RecordKind;
    use crate::measure::metrics::AggregationKind;
    use std::fs;
    use tempfile::NamedTempFile;

    fn record(metric: &str, kind: RecordKind, value: f64) -> ResultRecord {
        ResultRecord {
            region: "triad".to_string(),
            metric: metric.to_string(),
            kind,
            value,
        }
    }

    fn render(exporter: &CsvExporter, records: &[ResultRecord]) -> Result<String> {
        let mut buffer = Vec::new();
        exporter.write_records(records, &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    // ====== Formatting ======

    #[test]
    fn test_rows() {
        let records = [
            record("AVX SP [MFLOP/s]", RecordKind::Aggregate(AggregationKind::Sum), 1.5),
            record("AVX SP [MFLOP/s]", RecordKind::Saturation, 0.25),
        ];
        let text = render(&CsvExporter::default(), &records).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "region,metric,aggregation,value");
        assert_eq!(lines[1], "triad,AVX SP [MFLOP/s],sum,1.500000");
        assert_eq!(lines[2], "triad,AVX SP [MFLOP/s],saturation,0.250000");
    }

    #[test]
    fn test_european_format() {
        let records = [record("Port0 usage ratio", RecordKind::Aggregate(AggregationKind::GeometricMean), 0.5)];
        let exporter = CsvExporter::new(CsvConfig::european().precision(2));
        let text = render(&exporter, &records).unwrap();
        assert!(text.contains("triad;Port0 usage ratio;geometric_mean;0,50"));
    }

    #[test]
    fn test_field_with_delimiter_is_quoted() {
        assert_eq!(escape_field("a,b", ','), "\"a,b\"");
        assert_eq!(escape_field("plain", ','), "plain");
    }

    #[test]
    fn test_metadata_header() {
        let mut metadata = CsvMetadata {
            processor: Some("Test CPU".to_string()),
            threads_in_use: Some(4),
            ..Default::default()
        };
        metadata.add_custom("array n", "4096");

        let exporter = CsvExporter::new(CsvConfig::default().with_metadata(metadata));
        let text = render(&exporter, &[record("x", RecordKind::Runtime, 1.0)]).unwrap();

        assert!(text.starts_with("# Saturation Session Data\n# Generated: "));
        assert!(text.contains("# Processor: Test CPU\n"));
        assert!(text.contains("# array n: 4096\n"));
        assert!(text.contains("#\nregion,metric,aggregation,value\n"));
    }

    // ====== Validation ======

    #[test]
    fn test_rejects_non_finite() {
        let records = [record("x", RecordKind::Runtime, f64::INFINITY)];
        let err = render(&CsvExporter::default(), &records).unwrap_err();
        assert!(matches!(err, Error::Export(_)));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(render(&CsvExporter::default(), &[]).is_err());
    }

    #[test]
    fn test_export_to_file() {
        use crate::measure::aggregator::AggregateSet;
        use crate::measure::metrics::MetricKind;
        use crate::profile::ExperientialProfile;
        use std::collections::BTreeMap;

        let mut aggregates = AggregateSet::new();
        aggregates.insert("triad", MetricKind::SpFlopRate, AggregationKind::Sum, 91799.015625);
        let results = SessionResults::new(
            aggregates,
            BTreeMap::new(),
            &ExperientialProfile::default(),
            SessionInfo::default(),
        );

        let path = NamedTempFile::new().unwrap().path().with_extension("csv");
        CsvExporter::default().export(&results, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("triad,AVX SP [MFLOP/s],saturation,0.500000"));
    }

    #[test]
    fn test_export_creates_missing_directories() {
        use crate::measure::aggregator::AggregateSet;
        use crate::measure::metrics::MetricKind;
        use crate::profile::ExperientialProfile;
        use std::collections::BTreeMap;

        let mut aggregates = AggregateSet::new();
        aggregates.insert("triad", MetricKind::SpFlopRate, AggregationKind::Sum, 1000.0);
        let results = SessionResults::new(
            aggregates,
            BTreeMap::new(),
            &ExperientialProfile::default(),
            SessionInfo::default(),
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs/2024/session.csv");
        CsvExporter::default().export(&results, &path).unwrap();

        assert!(fs::read_to_string(&path).unwrap().contains("triad,AVX SP [MFLOP/s],sum,"));
    }
}
