//! JSON export of session results
//!
//! Writes the diagram input document (see [`crate::output::diagram::input`]),
//! so a session exported here can be rendered later without re-measuring.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::Exporter;
use crate::error::{Error, Result};
use crate::output::diagram::input::DiagramInput;
use crate::output::diagram::render::prepare_output;
use crate::results::SessionResults;

#[derive(Debug, Clone)]
pub struct JsonExporter {
    /// Indented output (default: true)
    pub pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonExporter {
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

/// Reject documents holding values JSON cannot carry (NaN, infinities)
fn validate(input: &DiagramInput) -> Result<()> {
    for (region, results) in &input.results {
        let sections = [&results.saturation, &results.geometric_mean, &results.sum];
        let bad = sections
            .iter()
            .flat_map(|s| s.iter())
            .find(|(_, v)| v.is_some_and(|v| !v.is_finite()));
        if let Some((metric, _)) = bad {
            return Err(Error::export(format!(
                "Invalid data: non-finite value for '{metric}' in region '{region}'"
            )));
        }
        if results.runtime.is_some_and(|r| !r.is_finite()) {
            return Err(Error::export(format!("Invalid data: non-finite runtime in region '{region}'")));
        }
    }
    Ok(())
}

impl Exporter for JsonExporter {
    type Error = Error;

    fn export(&self, results: &SessionResults, path: &Path) -> Result<()> {
        let input = results.to_diagram_input();
        validate(&input)?;

        prepare_output(path)?;
        let mut out = BufWriter::new(File::create(path)?);
        if self.pretty {
            serde_json::to_writer_pretty(&mut out, &input)?;
        } else {
            serde_json::to_writer(&mut out, &input)?;
        }
        out.flush()?;

        log::info!("exported {} regions to {}", input.results.len(), path.display());
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
