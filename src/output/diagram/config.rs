//! Diagram configuration
//!
//! Sizes are in drawing units (pixels for bitmap output, user units for SVG).
//! The defaults reproduce the standard overview diagram: a 1200 x 2400 page
//! with the memory hierarchy stacked from RAM at the top to the core at the
//! bottom.

use crate::color::{ColorScale, Palette, Rgb};

/// Configuration for customizing saturation diagrams
///
/// # Example
///
/// ```rust,ignore
/// use satmap::output::diagram::DiagramConfig;
/// use satmap::color::Palette;
///
/// let config = DiagramConfig::with_palette(Palette::RdPu).with_size(1000, 2000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramConfig {
    /// Image width (default: 1200)
    pub width: u32,

    /// Image height (default: 2400)
    pub height: u32,

    /// Outer margins (default: 50 each)
    pub margin_x: f64,
    pub margin_y: f64,

    /// Gaps between stacked elements (default: 12 / 25 / 50)
    pub small_internal_margin: f64,
    pub internal_margin: f64,
    pub large_internal_margin: f64,

    /// Legend swatch height (default: 50)
    pub swatch_height: f64,

    pub ram_height: f64,
    pub transfer_arrow_height: f64,
    /// Height of each cache box (default: 100)
    pub cache_height: f64,
    /// Core container height (default: 500)
    pub core_height: f64,

    /// Font sizes (default: 40 / 12 / 40 / 25)
    pub title_font: f64,
    pub description_font: f64,
    pub big_label_font: f64,
    pub small_label_font: f64,

    /// Extra spacing between wrapped lines, as a fraction of font size (default: 0.3)
    pub line_spacing: f64,

    /// Box outline width (default: 2)
    pub stroke_width: f64,
    /// Outline width of arrows and ports (default: 1)
    pub thin_stroke_width: f64,

    /// Gap between a LEFT label and its box, fraction of label extent (default: 1/6)
    pub padding_ratio_left: f64,
    /// Gap between a BOTTOM label and its box, fraction of label extent (default: 1/3)
    pub padding_ratio_bottom: f64,

    /// Arrowhead width relative to shaft width, >= 1 (default: 1.5)
    pub arrowhead_width_ratio: f64,
    /// Share of the arrow length taken by the head, <= 1 (default: 0.35)
    pub arrowhead_length_ratio: f64,

    /// Width reserved for each rotated legend tick label (default: 100)
    pub legend_item_width: f64,
    /// Horizontal shift of legend tick labels (default: -10)
    pub legend_offset: f64,

    /// Saturation to color mapping (default: discrete YlGnBu)
    pub color_scale: ColorScale,

    /// Fill for boxes whose metric was not measured (default: white)
    pub neutral: Rgb,

    /// Page and container background (default: white)
    pub background: Rgb,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 2400,
            margin_x: 50.0,
            margin_y: 50.0,
            small_internal_margin: 12.0,
            internal_margin: 25.0,
            large_internal_margin: 50.0,
            swatch_height: 50.0,
            ram_height: 200.0,
            transfer_arrow_height: 150.0,
            cache_height: 100.0,
            core_height: 500.0,
            title_font: 40.0,
            description_font: 12.0,
            big_label_font: 40.0,
            small_label_font: 25.0,
            line_spacing: 0.3,
            stroke_width: 2.0,
            thin_stroke_width: 1.0,
            padding_ratio_left: 1.0 / 6.0,
            padding_ratio_bottom: 1.0 / 3.0,
            arrowhead_width_ratio: 1.5,
            arrowhead_length_ratio: 0.35,
            legend_item_width: 100.0,
            legend_offset: -10.0,
            color_scale: ColorScale::default(),
            neutral: Rgb::WHITE,
            background: Rgb::WHITE,
        }
    }
}

impl DiagramConfig {
    /// Default layout with a discrete palette
    pub fn with_palette(palette: Palette) -> Self {
        Self {
            color_scale: ColorScale::Discrete(palette),
            ..Self::default()
        }
    }

    /// Default layout with a continuous scale between two colors
    pub fn continuous(min: Rgb, max: Rgb) -> Self {
        Self {
            color_scale: ColorScale::Continuous { min, max },
            ..Self::default()
        }
    }

    /// Default layout with a palette given by name; unknown names fall back to YlGnBu
    pub fn with_palette_name(name: &str) -> Self {
        Self::with_palette(Palette::parse_or(name, Palette::YlGnBu))
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_neutral(mut self, neutral: Rgb) -> Self {
        self.neutral = neutral;
        self
    }

    /// Width available to stacked content
    pub fn content_width(&self) -> f64 {
        f64::from(self.width) - 2.0 * self.margin_x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiagramConfig::default();
        assert_eq!(config.content_width(), 1100.0);
        assert_eq!(config.color_scale, ColorScale::Discrete(Palette::YlGnBu));
    }

    #[test]
    fn test_unknown_palette_name_falls_back() {
        let config = DiagramConfig::with_palette_name("Jet");
        assert_eq!(config.color_scale, ColorScale::Discrete(Palette::YlGnBu));
        let config = DiagramConfig::with_palette_name("Greys");
        assert_eq!(config.color_scale, ColorScale::Discrete(Palette::Greys));
    }
}
