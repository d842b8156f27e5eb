//! Text measurement and wrapping
//!
//! Labels are placed in two steps: measure the wrapped extent of the text for
//! a given width, then let the layout decide where the block goes. Measuring
//! goes through [`TextMeasure`] so layout can be computed without a drawing
//! surface.

use plotters::style::{FontDesc, FontFamily, FontStyle};

/// Average advance of a sans-serif glyph relative to the font size
const AVERAGE_GLYPH_WIDTH: f64 = 0.6;

/// Single-line text extent provider
pub trait TextMeasure {
    /// Width and height of `text` on one line at `font_size`
    fn line_extent(&self, text: &str, font_size: f64) -> (f64, f64);
}

/// Font-independent estimate: fixed average glyph width, height equal to the font size
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMeasure;

impl TextMeasure for HeuristicMeasure {
    fn line_extent(&self, text: &str, font_size: f64) -> (f64, f64) {
        let width = text.chars().count() as f64 * font_size * AVERAGE_GLYPH_WIDTH;
        (width, font_size)
    }
}

/// Measurement through the drawing backend's font layer
///
/// Falls back to [`HeuristicMeasure`] when the backend cannot measure
/// (no font loaded) or reports an empty box for non-empty text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendMeasure;

impl TextMeasure for BackendMeasure {
    fn line_extent(&self, text: &str, font_size: f64) -> (f64, f64) {
        let font = FontDesc::new(FontFamily::SansSerif, font_size, FontStyle::Normal);
        match font.box_size(text) {
            Ok((w, h)) if w > 0 && h > 0 => (f64::from(w), f64::from(h)),
            Ok(_) if text.is_empty() => (0.0, font_size),
            _ => HeuristicMeasure.line_extent(text, font_size),
        }
    }
}

/// Horizontal alignment of lines inside their box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Wrapped text with its measured extent
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub font_size: f64,
    /// Distance between the tops of consecutive lines
    pub line_advance: f64,
    /// Widest line
    pub width: f64,
    pub height: f64,
}

impl TextBlock {
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }
}

/// Greedy word wrap of `text` to `max_width`
///
/// Explicit newlines are kept; a single word wider than `max_width` gets a line
/// of its own.
pub fn wrap_text(measure: &dyn TextMeasure, text: &str, font_size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure.line_extent(&candidate, font_size).0 <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
    }

    lines
}

/// Wrap and measure `text`
///
/// `spacing` is the gap between lines as a fraction of the font size.
pub fn layout_text(
    measure: &dyn TextMeasure,
    text: &str,
    font_size: f64,
    max_width: f64,
    spacing: f64,
) -> TextBlock {
    let lines = wrap_text(measure, text, font_size, max_width);

    let mut width: f64 = 0.0;
    let mut line_height: f64 = 0.0;
    for line in &lines {
        let (w, h) = measure.line_extent(line, font_size);
        width = width.max(w);
        line_height = line_height.max(h);
    }

    let gap = spacing * font_size;
    let n = lines.len() as f64;
    TextBlock {
        height: n * line_height + (n - 1.0).max(0.0) * gap,
        line_advance: line_height + gap,
        lines,
        font_size,
        width,
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_heuristic_extent() {
        let (w, h) = HeuristicMeasure.line_extent("RAM", 40.0);
        assert_relative_eq!(w, 72.0, epsilon = 1e-9);
        assert_eq!(h, 40.0);
    }

    #[test]
    fn test_wrap_respects_width() {
        // 6 px per glyph at size 10
        let lines = wrap_text(&HeuristicMeasure, "aaa bbb ccc", 10.0, 45.0);
        assert_eq!(lines, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn test_wrap_keeps_newlines_and_long_words() {
        let lines = wrap_text(&HeuristicMeasure, "title\n\nsupercalifragilistic", 10.0, 30.0);
        assert_eq!(lines, vec!["title", "", "supercalifragilistic"]);
    }

    #[test]
    fn test_block_height_includes_spacing() {
        let block = layout_text(&HeuristicMeasure, "one\ntwo", 10.0, 1000.0, 0.3);
        assert_eq!(block.lines.len(), 2);
        assert_relative_eq!(block.height, 23.0, epsilon = 1e-9);
        assert_relative_eq!(block.line_advance, 13.0, epsilon = 1e-9);
    }

    #[test]
    fn test_backend_measure_is_positive() {
        let (w, h) = BackendMeasure.line_extent("In-core performance", 40.0);
        assert!(w > 0.0);
        assert!(h > 0.0);
    }
}
