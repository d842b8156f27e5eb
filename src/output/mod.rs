//! Output of session results
//!
//! - **Diagram**: SVG/PNG saturation diagrams drawn with plotters
//! - **Export**: CSV/JSON data export for external analysis
//!
//! # Architecture
//!
//! ```text
//! output/
//! ├── mod.rs
//! ├── diagram/     ← Saturation diagrams and color swatches
//! └── export/      ← Data export
//!     ├── mod.rs
//!     ├── csv.rs
//!     └── json.rs
//! ```
//!
//! # Quick Start
//!
//! ## Diagram
//!
//! ```rust,ignore
//! use satmap::output::render_diagram;
//!
//! let input = results.to_diagram_input();
//! render_diagram(&input, "triad", &profile, "triad.svg", None)?;
//! ```
//!
//! ## CSV Export
//!
//! ```rust,ignore
//! use satmap::output::{CsvExporter, Exporter};
//!
//! CsvExporter::default().export(&results, Path::new("triad.csv"))?;
//! ```

pub mod diagram;
pub mod export;

pub use diagram::{render_continuous_swatch, render_diagram, render_palette_sheet, DiagramConfig, DiagramInput};

pub use export::{CsvConfig, CsvExporter, CsvMetadata, Exporter, JsonExporter};
