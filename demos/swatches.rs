//! Example: Color Scale Swatches
//!
//! Writes the reference sheet with every discrete palette and a few gradient
//! strips, to check the diagram colors by eye.
//!
//! **Outputs** (under the system temp directory, `satmap_swatches/`):
//! - `all_discrete_scales.svg`: RdPu, YlGnBu, PuBu, YlGn and Greys, 9 bins each
//! - `gradient_<n>.svg`: continuous scale sampled in `n` cells
//! - `gradient_<n>.png`: the same strip as a bitmap

use satmap::color::{Palette, Rgb, BIN_COUNT};
use satmap::output::diagram::{render_continuous_swatch, render_palette_sheet, PALETTE_SHEET_FILE};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("═══════════════════════════════════════════════════════");
    println!("  Color Scale Swatches");
    println!("═══════════════════════════════════════════════════════\n");

    let out_dir = std::env::temp_dir().join("satmap_swatches");

    // ====== Discrete palettes ======

    let sheet = out_dir.join(PALETTE_SHEET_FILE);
    render_palette_sheet(900, 60, &sheet)?;

    for palette in Palette::ALL {
        let colors = palette.colors();
        let (r, g, b) = colors[0].to_rgb8();
        let (r2, g2, b2) = colors[BIN_COUNT - 1].to_rgb8();
        println!(
            "  {:<7} : #{:02x}{:02x}{:02x} → #{:02x}{:02x}{:02x}",
            palette.name(),
            r,
            g,
            b,
            r2,
            g2,
            b2
        );
    }
    println!("  → {:?}\n", sheet);

    // ====== Continuous scale ======

    let min = Rgb::from_hex(0xffffd9);
    let max = Rgb::from_hex(0x081d58);

    for steps in [9, 32, 256] {
        for extension in ["svg", "png"] {
            let path = out_dir.join(format!("gradient_{steps}.{extension}"));
            render_continuous_swatch(min, max, 900, 60, steps, &path)?;
            println!("  {:>3} steps : {:?}", steps, path);
        }
    }

    Ok(())
}
