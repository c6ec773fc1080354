//! Background-color-adaptive removal for sprite sheets.
//!
//! The four corners of the image are assumed to show the background. Their
//! average becomes the background estimate, and each pixel's alpha is then
//! chosen from its Manhattan distance `d` to that estimate:
//!
//! - `d < T`: fully transparent
//! - `T <= d < 3T`: linear ramp from 0 towards 255, keeping anti-aliased edges
//! - `d >= 3T`: left untouched
//!
//! with `T` = [`BACKGROUND_TOLERANCE`]. RGB channels are never modified.

use image::{Rgb, RgbaImage};

use crate::color;
use crate::engine::ProcessStats;
use crate::error::{Error, Result};

/// Distance below which a pixel counts as pure background.
pub const BACKGROUND_TOLERANCE: u32 = 35;

/// Distance at or beyond which a pixel is foreground and left as is.
const OPAQUE_DISTANCE: u32 = BACKGROUND_TOLERANCE * 3;

/// Width of the partial-transparency ramp.
const RAMP_WIDTH: u32 = OPAQUE_DISTANCE - BACKGROUND_TOLERANCE;

/// Estimate the background color from the four corner pixels.
///
/// Images narrower or shorter than two pixels have coinciding corners; the
/// same pixel is then simply counted more than once.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the image has zero width or height.
pub fn estimate_background(image: &RgbaImage) -> Result<Rgb<u8>> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::InvalidInput {
            width: w,
            height: h,
        });
    }

    Ok(color::average_corners([
        image.get_pixel(0, 0),
        image.get_pixel(w - 1, 0),
        image.get_pixel(0, h - 1),
        image.get_pixel(w - 1, h - 1),
    ]))
}

/// Alpha assigned to a pixel at `distance` from the background estimate.
///
/// `None` means the pixel is foreground and keeps its original alpha.
#[must_use]
pub fn alpha_for_distance(distance: u32) -> Option<u8> {
    if distance < BACKGROUND_TOLERANCE {
        return Some(0);
    }
    if distance >= OPAQUE_DISTANCE {
        return None;
    }
    // round((d - T) / 2T * 255), half away from zero
    let scaled = ((distance - BACKGROUND_TOLERANCE) * 255 + RAMP_WIDTH / 2) / RAMP_WIDTH;
    Some(u8::try_from(scaled).unwrap_or(u8::MAX))
}

/// Remove the background of a sprite sheet in place.
///
/// The estimate is fixed before any pixel is written, so corner pixels made
/// transparent during the pass cannot skew the result. Running the processor
/// twice gives the same image as running it once.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the image has zero width or height.
/// The image is not touched in that case.
pub fn process_sprite_sheet(image: &mut RgbaImage) -> Result<ProcessStats> {
    let background = estimate_background(image)?;

    let stats = color::rewrite_alpha(image, |px| {
        alpha_for_distance(color::manhattan_distance(px, background))
    });

    Ok(ProcessStats {
        background: Some(background),
        ..stats
    })
}
