//! Fixed-tolerance white removal.
//!
//! A pixel is background when all three color channels sit above
//! `255 - tolerance`. Matching pixels keep their RGB and get alpha 0; every
//! other pixel, including its alpha, is left alone.
//!
//! The plain and edge-aware variants share this predicate and differ only in
//! their default tolerance, so both are presets over [`whiten`].

use image::RgbaImage;

use crate::color;
use crate::engine::ProcessStats;
use crate::error::{Error, Result};

/// Default tolerance of the plain whitener.
pub const DEFAULT_TOLERANCE: u8 = 30;

/// Default tolerance of the edge-aware whitener.
pub const EDGE_AWARE_TOLERANCE: u8 = 40;

/// Validate a caller-supplied tolerance.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `tolerance` is outside `0..=255`.
pub fn check_tolerance(tolerance: i64) -> Result<u8> {
    u8::try_from(tolerance).map_err(|_| Error::InvalidArgument { tolerance })
}

/// Make every near-white pixel fully transparent.
///
/// The tolerance is the margin below pure white: higher values treat more
/// colors as background. A tolerance of 0 leaves the image unchanged.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `tolerance` is outside `0..=255`.
/// The image is not touched in that case.
pub fn whiten(image: &mut RgbaImage, tolerance: i64) -> Result<ProcessStats> {
    let tolerance = check_tolerance(tolerance)?;
    Ok(clear_near_white(image, tolerance))
}

/// Plain white removal with the default tolerance of 30.
pub fn remove_white_background(image: &mut RgbaImage) -> ProcessStats {
    clear_near_white(image, DEFAULT_TOLERANCE)
}

/// Edge-aware white removal with the more aggressive default tolerance of 40.
pub fn remove_near_white_with_edges(image: &mut RgbaImage) -> ProcessStats {
    clear_near_white(image, EDGE_AWARE_TOLERANCE)
}

fn clear_near_white(image: &mut RgbaImage, tolerance: u8) -> ProcessStats {
    color::rewrite_alpha(image, |px| {
        color::is_near_white(px, tolerance).then_some(0)
    })
}
