//! Remove the background of a single sprite sheet.
//!
//! Usage:
//! ```sh
//! cargo run --example remove_background -- input.png output.png
//! ```

use std::env;
use std::process;

use sprite_bg_removal::sprite_sheet::process_sprite_sheet;
use sprite_bg_removal::{decode, save_image, Result};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output>", args[0]);
        process::exit(1);
    }

    if let Err(e) = run(&args[1], &args[2]) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(input: &str, output: &str) -> Result<()> {
    let mut img = decode(&std::fs::read(input)?)?;
    let stats = process_sprite_sheet(&mut img)?;
    save_image(&img, output.as_ref())?;

    if let Some(bg) = stats.background {
        println!("Detected background color: RGB({}, {}, {})", bg[0], bg[1], bg[2]);
    }
    println!("Processed sprite sheet: {input} -> {output}");
    Ok(())
}
