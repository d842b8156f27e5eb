//! Color swatches
//!
//! Standalone strips for checking a color scale by eye: a gradient between two
//! endpoint colors, and a sheet with every discrete palette.

use std::path::Path;

use plotters::prelude::*;

use super::layout::Bounds;
use super::render::{pixel, prepare_output, Surface};
use crate::color::{bin_lower_bound, lerp_color, Palette, Rgb, BIN_COUNT};
use crate::error::{Error, Result};

/// File name used by [`render_palette_sheet`] callers that write into a directory
pub const PALETTE_SHEET_FILE: &str = "all_discrete_scales.svg";

/// `count` equal cells side by side filling `bounds`
pub fn swatch_cells(bounds: Bounds, count: usize) -> Vec<Bounds> {
    if count == 0 {
        return Vec::new();
    }
    let step = bounds.width / count as f64;
    (0..count)
        .map(|i| Bounds::new(bounds.x + i as f64 * step, bounds.y, step, bounds.height))
        .collect()
}

/// Cell colors of a gradient strip; cell `i` is `lerp((i + 1) / steps)`
pub fn continuous_swatch_colors(min: Rgb, max: Rgb, steps: usize) -> Vec<Rgb> {
    (0..steps)
        .map(|i| lerp_color(min, max, (i + 1) as f64 / steps as f64))
        .collect()
}

/// Palettes of the sheet, top to bottom
pub fn palette_sheet_order() -> Vec<Palette> {
    let mut palettes = Palette::ALL.to_vec();
    palettes.sort_by_key(|p| p.name());
    palettes
}

/// Strip bounds of the palette sheet and the full sheet height
pub fn palette_sheet_layout(width: u32, height: u32) -> (Vec<(Palette, Bounds)>, u32) {
    let margin = height / 4;
    let palettes = palette_sheet_order();
    let total = (height + margin) * palettes.len() as u32 - margin;

    let strips = palettes
        .into_iter()
        .enumerate()
        .map(|(i, palette)| {
            let y = i as u32 * (height + margin);
            (palette, Bounds::new(0.0, f64::from(y), f64::from(width), f64::from(height)))
        })
        .collect();
    (strips, total)
}

fn draw_cells<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    cells: &[Bounds],
    colors: &[Rgb],
) -> Result<()> {
    for (cell, color) in cells.iter().zip(colors) {
        let corners = [(pixel(cell.x), pixel(cell.y)), (pixel(cell.right()), pixel(cell.bottom()))];
        root.draw(&Rectangle::new(corners, color.to_plotters().filled()))
            .map_err(Error::render)?;
    }
    Ok(())
}

fn draw_swatch_impl<DB: DrawingBackend>(backend: DB, strips: &[(Bounds, Vec<Rgb>)]) -> Result<()> {
    let root = backend.into_drawing_area();
    root.fill(&WHITE).map_err(Error::render)?;
    for (bounds, colors) in strips {
        draw_cells(&root, &swatch_cells(*bounds, colors.len()), colors)?;
    }
    root.present().map_err(Error::render)?;
    Ok(())
}

fn write_strips(path: &Path, size: (u32, u32), strips: &[(Bounds, Vec<Rgb>)]) -> Result<()> {
    prepare_output(path)?;
    match Surface::for_path(path) {
        Surface::Svg => draw_swatch_impl(SVGBackend::new(path, size), strips),
        Surface::Bitmap => draw_swatch_impl(BitMapBackend::new(path, size), strips),
    }
}

/// Render a gradient strip of `steps` cells from `min` to `max`
pub fn render_continuous_swatch(
    min: Rgb,
    max: Rgb,
    width: u32,
    height: u32,
    steps: usize,
    path: impl AsRef<Path>,
) -> Result<()> {
    if steps == 0 {
        return Err(Error::config("swatch needs at least one step"));
    }
    let strip = (
        Bounds::new(0.0, 0.0, f64::from(width), f64::from(height)),
        continuous_swatch_colors(min, max, steps),
    );
    write_strips(path.as_ref(), (width, height), &[strip])
}

/// Render every discrete palette as a `width` x `height` strip, one under another
pub fn render_palette_sheet(width: u32, height: u32, path: impl AsRef<Path>) -> Result<()> {
    let (layout, total) = palette_sheet_layout(width, height);
    let strips: Vec<(Bounds, Vec<Rgb>)> = layout
        .into_iter()
        .map(|(palette, bounds)| {
            let colors = (0..BIN_COUNT)
                .filter_map(|i| palette.color(bin_lower_bound(i)))
                .collect();
            (bounds, colors)
        })
        .collect();

    log::debug!("palette sheet: {} strips, {width}x{total}", strips.len());
    write_strips(path.as_ref(), (width, total), &strips)
}

// =================================================================================================
// Tests
// =================================================================================================
