//! Remove white and near-white backgrounds from game sprites.
//!
//! Sprites exported on a white canvas get their background replaced with
//! transparency. Three strategies are available:
//!
//! - **Fixed whitening**: every pixel whose channels all exceed
//!   `255 - tolerance` becomes transparent (default tolerance 30).
//! - **Edge-aware whitening**: the same test with a more aggressive default
//!   tolerance of 40.
//! - **Sprite sheet**: the background color is estimated from the four corners
//!   and pixels fade out by color distance, so anti-aliased edges stay smooth.
//!
//! # Quick Start
//!
//! ```no_run
//! use sprite_bg_removal::{process_image, Strategy};
//!
//! let mut img = image::open("hero.png").unwrap().to_rgba8();
//! let stats = process_image(&mut img, Strategy::SpriteSheet).unwrap();
//! println!("background: {:?}", stats.background);
//! img.save("hero.png").unwrap();
//! ```
//!
//! # Files and backups
//!
//! ```no_run
//! use std::path::Path;
//! use sprite_bg_removal::{process_file, ProcessOptions};
//!
//! let opts = ProcessOptions {
//!     backup_dir: Some("assets/backups".into()),
//!     ..ProcessOptions::default()
//! };
//! let sheet = Path::new("assets/gta_1.png");
//! let result = process_file(sheet, sheet, &opts);
//! assert!(result.success, "{}", result.message);
//! ```

#![deny(missing_docs)]

pub mod color;
mod engine;
pub mod error;
pub mod sprite_sheet;
pub mod whitening;

pub use engine::{
    backup_path, create_backup, decode, default_output_path, encode, is_supported_image,
    process_bytes, process_directory, process_file, process_image, same_file, save_image,
    write_atomic, ProcessOptions, ProcessResult, ProcessStats, Strategy,
};
pub use error::{Error, Result};
