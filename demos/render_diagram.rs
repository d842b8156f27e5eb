//! Example: Saturation Diagram from a Results Document
//!
//! Reads a results JSON written by a measurement session and draws the
//! memory-hierarchy diagram of one region.
//!
//! **Usage**:
//! ```text
//! cargo run --example render_diagram -- <results.json> <region> <output.svg|png> [profile.json] [palette]
//! ```
//!
//! - The output format follows the file extension (`.svg` or bitmap)
//! - Without a profile the reference machine is assumed (8 ports per core)
//! - Palette is one of RdPu, YlGnBu, PuBu, YlGn, Greys (default YlGnBu)

use std::env;
use std::path::PathBuf;

use satmap::color::Palette;
use satmap::output::diagram::{render_diagram, DiagramConfig, DiagramInput};
use satmap::ExperientialProfile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <results.json> <region> <output> [profile.json] [palette]", args[0]);
        return Ok(());
    }

    let input_path = PathBuf::from(&args[1]);
    let region = &args[2];
    let output_path = PathBuf::from(&args[3]);

    println!("═══════════════════════════════════════════════════════");
    println!("  Saturation Diagram");
    println!("═══════════════════════════════════════════════════════\n");

    // ====== Inputs ======

    let input = DiagramInput::from_json_file(&input_path)?;
    let profile = match args.get(4) {
        Some(path) => ExperientialProfile::from_json_file(path)?,
        None => ExperientialProfile::default(),
    };
    let palette = args
        .get(5)
        .map(|name| Palette::parse_or(name, Palette::YlGnBu))
        .unwrap_or(Palette::YlGnBu);

    println!("{}", input.description());
    println!("Regions in document:");
    for name in input.results.keys() {
        let marker = if name == region { "→" } else { " " };
        println!("  {} {}", marker, name);
    }
    println!("Palette: {}\n", palette.name());

    // ====== Render ======

    let config = DiagramConfig::with_palette(palette);
    let diagram = render_diagram(&input, region, &profile, &output_path, Some(&config))?;

    let neutral = diagram.neutral_nodes().count();
    let bound = diagram.bound_nodes().count();
    println!("Bound elements     : {}", bound);
    println!("Unmeasured (grey)  : {}", neutral);
    println!("Canvas             : {} x {}", diagram.width, diagram.height);
    println!("\n  → {:?}", output_path);

    Ok(())
}
