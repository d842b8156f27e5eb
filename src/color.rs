//! Color mapping
//!
//! Saturation levels in `[0, 1]` become colors either by linear interpolation
//! between two endpoint colors or by binning into one of the nine-class
//! ColorBrewer sequential palettes.
//!
//! Discrete bins are half-open, `[i/9, (i+1)/9)`, except the last which is
//! closed, `[8/9, 1]`. A level outside `[0, 1]` is reported through `log` and
//! mapped to [`SENTINEL`] so drawing can continue.

use std::fmt;
use std::str::FromStr;

use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of classes in every discrete palette
pub const BIN_COUNT: usize = 9;

// =================================================================================================
// RGB color
// =================================================================================================

/// RGB color with channels in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Returned for levels no discrete bin contains
pub const SENTINEL: Rgb = Rgb::BLACK;

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// From a `0xRRGGBB` literal
    pub const fn from_hex(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xff) as f64 / 255.0,
            ((hex >> 8) & 0xff) as f64 / 255.0,
            (hex & 0xff) as f64 / 255.0,
        )
    }

    /// 8-bit channels, rounded
    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (channel(self.r), channel(self.g), channel(self.b))
    }

    pub fn to_plotters(&self) -> RGBColor {
        let (r, g, b) = self.to_rgb8();
        RGBColor(r, g, b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b) = self.to_rgb8();
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// Linear interpolation; exact at both `t = 0` and `t = 1`
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    (1.0 - t) * a + t * b
}

/// Per-channel interpolation between two colors
pub fn lerp_color(min: Rgb, max: Rgb, t: f64) -> Rgb {
    Rgb::new(lerp(min.r, max.r, t), lerp(min.g, max.g, t), lerp(min.b, max.b, t))
}

// =================================================================================================
// Palettes
// =================================================================================================

/// ColorBrewer nine-class sequential palettes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Palette {
    RdPu,
    YlGnBu,
    PuBu,
    YlGn,
    Greys,
}

const RD_PU: [u32; BIN_COUNT] = [
    0xfff7f3, 0xfde0dd, 0xfcc5c0, 0xfa9fb5, 0xf768a1, 0xdd3497, 0xae017e, 0x7a0177, 0x49006a,
];
const YL_GN_BU: [u32; BIN_COUNT] = [
    0xffffd9, 0xedf8b1, 0xc7e9b4, 0x7fcdbb, 0x41b6c4, 0x1d91c0, 0x225ea8, 0x253494, 0x081d58,
];
const PU_BU: [u32; BIN_COUNT] = [
    0xfff7fb, 0xece7f2, 0xd0d1e6, 0xa6bddb, 0x74a9cf, 0x3690c0, 0x0570b0, 0x045a8d, 0x023858,
];
const YL_GN: [u32; BIN_COUNT] = [
    0xffffe5, 0xf7fcb9, 0xd9f0a3, 0xaddd8e, 0x78c679, 0x41ab5d, 0x238443, 0x006837, 0x004529,
];
const GREYS: [u32; BIN_COUNT] = [
    0xffffff, 0xf0f0f0, 0xd9d9d9, 0xbdbdbd, 0x969696, 0x737373, 0x525252, 0x252525, 0x000000,
];

impl Palette {
    pub const ALL: [Palette; 5] = [
        Palette::RdPu,
        Palette::YlGnBu,
        Palette::PuBu,
        Palette::YlGn,
        Palette::Greys,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Palette::RdPu => "RdPu",
            Palette::YlGnBu => "YlGnBu",
            Palette::PuBu => "PuBu",
            Palette::YlGn => "YlGn",
            Palette::Greys => "Greys",
        }
    }

    /// The nine classes, lightest first
    pub fn colors(&self) -> [Rgb; BIN_COUNT] {
        let hex = match self {
            Palette::RdPu => &RD_PU,
            Palette::YlGnBu => &YL_GN_BU,
            Palette::PuBu => &PU_BU,
            Palette::YlGn => &YL_GN,
            Palette::Greys => &GREYS,
        };
        hex.map(Rgb::from_hex)
    }

    /// Color of the bin containing `t`, `None` outside `[0, 1]`
    pub fn color(&self, t: f64) -> Option<Rgb> {
        bin_index(t).map(|i| self.colors()[i])
    }

    /// Parse a palette name, falling back to `default` with a warning
    pub fn parse_or(name: &str, default: Palette) -> Palette {
        name.parse().unwrap_or_else(|e| {
            log::warn!("{e}; using {}", default.name());
            default
        })
    }
}

impl FromStr for Palette {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Palette::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::config(format!("unknown color palette '{s}'")))
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lower bound of bin `i`
pub fn bin_lower_bound(i: usize) -> f64 {
    i as f64 / BIN_COUNT as f64
}

/// Discrete bin containing `t`
///
/// `[i/9, (i+1)/9)` for the first eight bins, `[8/9, 1]` for the last; `None`
/// for anything outside `[0, 1]` (including NaN).
pub fn bin_index(t: f64) -> Option<usize> {
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    (0..BIN_COUNT).rev().find(|&i| t >= bin_lower_bound(i))
}

// =================================================================================================
// Color scale
// =================================================================================================

/// Mapping from saturation level to color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColorScale {
    /// Linear blend between two endpoint colors
    Continuous { min: Rgb, max: Rgb },
    /// Nine-bin palette
    Discrete(Palette),
}

impl Default for ColorScale {
    fn default() -> Self {
        ColorScale::Discrete(Palette::YlGnBu)
    }
}

impl ColorScale {
    /// Color for level `t`
    ///
    /// Continuous scales clamp `t` into `[0, 1]`. Discrete scales log levels
    /// outside that range and return [`SENTINEL`].
    pub fn color(&self, t: f64) -> Rgb {
        match self {
            ColorScale::Continuous { min, max } => lerp_color(*min, *max, t.clamp(0.0, 1.0)),
            ColorScale::Discrete(palette) => palette.color(t).unwrap_or_else(|| {
                log::error!("saturation level {t} is outside [0, 1]; drawing sentinel color");
                SENTINEL
            }),
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ====== Interpolation ======

    #[test]
    fn test_lerp_endpoints_exact() {
        let min = Rgb::new(0.1, 0.7, 0.3);
        let max = Rgb::new(0.9, 0.2, 0.6);
        assert_eq!(lerp_color(min, max, 0.0), min);
        assert_eq!(lerp_color(min, max, 1.0), max);
    }

    #[test]
    fn test_lerp_midpoint() {
        assert_eq!(lerp(0.0, 1.0, 0.5), 0.5);
        assert_eq!(lerp(2.0, 4.0, 0.25), 2.5);
    }

    // ====== Bins ======

    #[test]
    fn test_extremes() {
        assert_eq!(bin_index(0.0), Some(0));
        assert_eq!(bin_index(1.0), Some(8));
        assert_eq!(Palette::Greys.color(1.0), Some(Rgb::BLACK));
        assert_eq!(Palette::Greys.color(0.0), Some(Rgb::WHITE));
    }

    #[test]
    fn test_interior_boundaries_open_upwards() {
        for i in 1..BIN_COUNT {
            let boundary = i as f64 / 9.0;
            assert_eq!(bin_index(boundary), Some(i), "boundary {i}/9");
            assert_eq!(bin_index(boundary - 1e-9), Some(i - 1));
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(bin_index(-0.01), None);
        assert_eq!(bin_index(1.01), None);
        assert_eq!(bin_index(f64::NAN), None);
        assert_eq!(ColorScale::Discrete(Palette::RdPu).color(2.0), SENTINEL);
    }

    #[test]
    fn test_continuous_clamps() {
        let scale = ColorScale::Continuous {
            min: Rgb::WHITE,
            max: Rgb::BLACK,
        };
        assert_eq!(scale.color(-1.0), Rgb::WHITE);
        assert_eq!(scale.color(5.0), Rgb::BLACK);
    }

    // ====== Palettes ======

    #[test]
    fn test_palette_names() {
        assert_eq!("ylgnbu".parse::<Palette>().unwrap(), Palette::YlGnBu);
        assert!("Viridis".parse::<Palette>().is_err());
        assert_eq!(Palette::parse_or("Viridis", Palette::Greys), Palette::Greys);
    }

    #[test]
    fn test_hex_conversion() {
        let c = Rgb::from_hex(0x49006a);
        assert_eq!(c.to_rgb8(), (0x49, 0x00, 0x6a));
        assert_eq!(c.to_string(), "#49006a");
        assert_eq!(Palette::RdPu.colors()[8], c);
    }
}
