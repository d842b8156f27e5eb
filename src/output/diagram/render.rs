//! Diagram rendering
//!
//! [`build_diagram`] lays a region out without touching the filesystem;
//! [`render_diagram`] builds and writes it. The drawing surface is picked
//! from the file extension: `.svg` gives a vector image with every label,
//! anything else a bitmap.
//!
//! Bitmap surfaces are built without a font rasterizer, so bitmap output
//! carries shapes and colors only; labels are skipped with a warning.

use std::fs;
use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle, FontTransform, TextStyle};

use super::config::DiagramConfig;
use super::input::{DiagramInput, RegionValues};
use super::layout::{arrow_outline, overview_template, Diagram, DiagramNode, Fill, LayoutEngine, NodeKind, PlacedText};
use super::text::{BackendMeasure, TextAlign, TextMeasure};
use crate::error::{Error, Result};
use crate::profile::ExperientialProfile;

// =================================================================================================
// Surfaces
// =================================================================================================

/// Output surface chosen from a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Svg,
    Bitmap,
}

impl Surface {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => Surface::Svg,
            _ => Surface::Bitmap,
        }
    }

    pub fn draws_text(&self) -> bool {
        matches!(self, Surface::Svg)
    }
}

/// Create the parent directories of `path`
pub(crate) fn prepare_output(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub(crate) fn pixel(v: f64) -> i32 {
    v.round() as i32
}

// =================================================================================================
// Public API
// =================================================================================================

/// Lay out the overview diagram of `region`
///
/// A region missing from `input` still yields a complete diagram, with every
/// metric box drawn as a placeholder.
pub fn build_diagram(
    input: &DiagramInput,
    region: &str,
    ports: u8,
    config: &DiagramConfig,
    measure: &dyn TextMeasure,
) -> Diagram {
    let values = match input.region(region) {
        Some(results) => RegionValues::from_results(results),
        None => {
            log::warn!("region '{region}' has no results; drawing an empty diagram");
            RegionValues::default()
        }
    };

    let tree = overview_template(region, input.description(), ports, config);
    LayoutEngine::new(config, measure).layout(&tree, &values)
}

/// Build the overview diagram of `region` and write it to `output_path`
///
/// The port row has one box per functional port of `profile`.
///
/// # Example
///
/// ```rust,ignore
/// use satmap::output::diagram::{render_diagram, DiagramInput};
/// use satmap::ExperientialProfile;
///
/// let input = DiagramInput::from_json_file("results.json")?;
/// render_diagram(&input, "triad", &ExperientialProfile::default(), "triad.svg", None)?;
/// ```
pub fn render_diagram(
    input: &DiagramInput,
    region: &str,
    profile: &ExperientialProfile,
    output_path: impl AsRef<Path>,
    config: Option<&DiagramConfig>,
) -> Result<Diagram> {
    let default_config = DiagramConfig::default();
    let config = config.unwrap_or(&default_config);

    let ports = profile.topology.ports_per_core;
    if ports == 0 {
        log::warn!("profile has no functional ports; port row left empty");
    }

    let diagram = build_diagram(input, region, ports, config, &BackendMeasure);
    draw_diagram(&diagram, output_path, config)?;
    Ok(diagram)
}

/// Write an already laid out diagram
pub fn draw_diagram(diagram: &Diagram, output_path: impl AsRef<Path>, config: &DiagramConfig) -> Result<()> {
    let path = output_path.as_ref();
    prepare_output(path)?;

    let size = (diagram.width, diagram.height);
    let surface = Surface::for_path(path);
    if !surface.draws_text() {
        log::warn!("bitmap output has no font support; labels omitted from {}", path.display());
    }

    match surface {
        Surface::Svg => draw_impl(SVGBackend::new(path, size), diagram, config, surface.draws_text()),
        Surface::Bitmap => draw_impl(BitMapBackend::new(path, size), diagram, config, surface.draws_text()),
    }
}

// =================================================================================================
// Drawing
// =================================================================================================

fn draw_impl<DB: DrawingBackend>(backend: DB, diagram: &Diagram, config: &DiagramConfig, with_text: bool) -> Result<()> {
    let root = backend.into_drawing_area();
    root.fill(&config.background.to_plotters()).map_err(Error::render)?;

    for node in &diagram.nodes {
        draw_node(&root, node, config)?;
        if with_text {
            if let Some(label) = &node.label {
                draw_label(&root, label)?;
            }
        }
    }

    root.present().map_err(Error::render)?;
    Ok(())
}

fn fill_color(fill: Fill, config: &DiagramConfig) -> Option<RGBColor> {
    match fill {
        Fill::Solid(color) => Some(color.to_plotters()),
        Fill::Neutral => Some(config.neutral.to_plotters()),
        Fill::None => None,
    }
}

fn draw_node<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    node: &DiagramNode,
    config: &DiagramConfig,
) -> Result<()> {
    let stroke = pixel(node.stroke_width).max(0) as u32;
    let b = node.bounds;

    match node.kind {
        NodeKind::Rect => {
            let corners = [(pixel(b.x), pixel(b.y)), (pixel(b.right()), pixel(b.bottom()))];
            if let Some(color) = fill_color(node.fill, config) {
                root.draw(&Rectangle::new(corners, color.filled()))
                    .map_err(Error::render)?;
            }
            if stroke > 0 {
                root.draw(&Rectangle::new(corners, BLACK.stroke_width(stroke)))
                    .map_err(Error::render)?;
            }
        }
        NodeKind::Arrow(direction) => {
            let outline: Vec<(i32, i32)> = arrow_outline(
                b,
                direction,
                config.arrowhead_width_ratio,
                config.arrowhead_length_ratio,
            )
            .into_iter()
            .map(|(x, y)| (pixel(x), pixel(y)))
            .collect();

            if let Some(color) = fill_color(node.fill, config) {
                root.draw(&Polygon::new(outline.clone(), color.filled()))
                    .map_err(Error::render)?;
            }
            if stroke > 0 {
                let mut closed = outline.clone();
                closed.extend(outline.first().copied());
                root.draw(&PathElement::new(closed, BLACK.stroke_width(stroke)))
                    .map_err(Error::render)?;
            }
        }
        NodeKind::Text => {}
    }
    Ok(())
}

fn draw_label<DB: DrawingBackend>(root: &DrawingArea<DB, plotters::coord::Shift>, label: &PlacedText) -> Result<()> {
    let h_pos = match label.align {
        TextAlign::Left => HPos::Left,
        TextAlign::Center => HPos::Center,
        TextAlign::Right => HPos::Right,
    };
    let font = FontDesc::new(FontFamily::SansSerif, label.block.font_size, FontStyle::Normal);
    let mut style = TextStyle::from(font).color(&BLACK).pos(Pos::new(h_pos, VPos::Top));
    if label.rotated {
        style = style.transform(FontTransform::Rotate270);
    }

    let b = label.bounds;
    for (i, line) in label.block.lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let offset = i as f64 * label.block.line_advance;
        let anchor = if label.rotated {
            // reads bottom to top; alignment runs along the vertical axis
            let y = match label.align {
                TextAlign::Right => b.y,
                TextAlign::Center => b.y + b.height / 2.0,
                TextAlign::Left => b.bottom(),
            };
            (b.x + offset, y)
        } else {
            let x = match label.align {
                TextAlign::Left => b.x,
                TextAlign::Center => b.x + b.width / 2.0,
                TextAlign::Right => b.right(),
            };
            (x, b.y + offset)
        };

        root.draw_text(line, &style, (pixel(anchor.0), pixel(anchor.1)))
            .map_err(Error::render)?;
    }
    Ok(())
}

// =================================================================================================
// Tests
// =================================================================================================
