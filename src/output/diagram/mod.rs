//! Memory-hierarchy saturation diagrams
//!
//! One diagram shows one region: RAM at the top, then the L3, L2 and L1 caches
//! with load/store arrows between them, then the core with its floating-point
//! throughput and functional-unit ports. Every element bound to a metric is
//! colored by the region's saturation of that metric; elements whose metric
//! was not measured get a neutral placeholder fill.
//!
//! # Structure
//!
//! ```text
//! diagram/
//! ├── config.rs   ← DiagramConfig (sizes, fonts, color scale)
//! ├── input.rs    ← JSON input document and typed metric bindings
//! ├── text.rs     ← text measurement and wrapping
//! ├── layout.rs   ← layout tree → positioned nodes
//! ├── render.rs   ← positioned nodes → SVG / bitmap
//! └── swatch.rs   ← gradient strips and palette sheets
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use satmap::output::diagram::{render_diagram, DiagramConfig, DiagramInput};
//!
//! let input = DiagramInput::from_json_file("results.json")?;
//! let config = DiagramConfig::with_palette_name("RdPu");
//! render_diagram(&input, "triad", &profile, "triad.svg", Some(&config))?;
//! ```

pub mod config;
pub mod input;
pub mod layout;
pub mod render;
pub mod swatch;
pub mod text;

pub use config::DiagramConfig;
pub use input::{DiagramInput, MetricBinding, RegionResults, RegionValues, Section, SessionInfo};
pub use layout::{Diagram, DiagramNode, Fill, NodeKind};
pub use render::{build_diagram, draw_diagram, render_diagram, Surface};
pub use swatch::{render_continuous_swatch, render_palette_sheet, PALETTE_SHEET_FILE};
pub use text::{BackendMeasure, HeuristicMeasure, TextMeasure};
