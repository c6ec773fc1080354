//! Color-proximity helpers shared by the removal strategies.

use image::{Pixel, Rgb, Rgba, RgbaImage};

use crate::engine::ProcessStats;

/// Manhattan distance between a pixel's RGB channels and a reference color.
///
/// Alpha is ignored, so a pixel that was already made transparent keeps the
/// same distance on a second pass.
#[must_use]
pub fn manhattan_distance(pixel: &Rgba<u8>, reference: Rgb<u8>) -> u32 {
    pixel.0[..3]
        .iter()
        .zip(reference.0.iter())
        .map(|(&a, &b)| u32::from(a.abs_diff(b)))
        .sum()
}

/// Whether every color channel lies strictly above `255 - tolerance`.
///
/// A tolerance of 0 never matches; 255 matches everything except pixels with
/// a zero channel.
#[must_use]
pub fn is_near_white(pixel: &Rgba<u8>, tolerance: u8) -> bool {
    let floor = 255 - tolerance;
    pixel.0[..3].iter().all(|&c| c > floor)
}

/// Average the four corner pixels of an image into a background estimate.
///
/// Each channel is summed across the corners and divided by four, truncating.
/// The corners must already be known to exist; callers check for zero area.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn average_corners(corners: [&Rgba<u8>; 4]) -> Rgb<u8> {
    let mut sums = [0u32; 3];
    for px in corners {
        for (sum, &c) in sums.iter_mut().zip(px.0.iter()) {
            *sum += u32::from(c);
        }
    }
    // Four u8 values sum to at most 1020, so the quotient always fits.
    Rgb(sums.map(|s| (s / 4) as u8))
}

/// Rewrite the alpha channel of every pixel for which `alpha_for` yields a value.
///
/// RGB is never touched. Pixels are independent, so with the `parallel`
/// feature the rows are split across the rayon pool.
pub(crate) fn rewrite_alpha<F>(image: &mut RgbaImage, alpha_for: F) -> ProcessStats
where
    F: Fn(&Rgba<u8>) -> Option<u8> + Sync,
{
    let row_len = image.width() as usize * 4;
    if row_len == 0 || image.height() == 0 {
        return ProcessStats::default();
    }

    let buf: &mut [u8] = image;
    let visit_row = |row: &mut [u8]| -> ProcessStats {
        let mut stats = ProcessStats::default();
        for chunk in row.chunks_exact_mut(4) {
            let px = Rgba::<u8>::from_slice_mut(chunk);
            if let Some(alpha) = alpha_for(px) {
                px.0[3] = alpha;
                stats.count(alpha);
            }
        }
        stats
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        buf.par_chunks_mut(row_len)
            .map(visit_row)
            .reduce(ProcessStats::default, ProcessStats::merge)
    }

    #[cfg(not(feature = "parallel"))]
    {
        buf.chunks_mut(row_len)
            .map(visit_row)
            .fold(ProcessStats::default(), ProcessStats::merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_sums_absolute_channel_differences() {
        let red = Rgba([255, 0, 0, 255]);
        assert_eq!(manhattan_distance(&red, Rgb([255, 255, 255])), 510);

        let grey = Rgba([200, 210, 220, 0]);
        assert_eq!(manhattan_distance(&grey, Rgb([210, 200, 230])), 30);
    }

    #[test]
    fn distance_ignores_alpha() {
        let opaque = Rgba([10, 20, 30, 255]);
        let clear = Rgba([10, 20, 30, 0]);
        let bg = Rgb([0, 0, 0]);
        assert_eq!(manhattan_distance(&opaque, bg), manhattan_distance(&clear, bg));
    }

    #[test]
    fn near_white_is_strict_per_channel() {
        assert!(is_near_white(&Rgba([230, 230, 230, 255]), 30));
        assert!(!is_near_white(&Rgba([225, 255, 255, 255]), 30));
        assert!(is_near_white(&Rgba([226, 226, 226, 255]), 30));
        assert!(!is_near_white(&Rgba([255, 255, 255, 255]), 0));
        assert!(is_near_white(&Rgba([1, 1, 1, 255]), 255));
        assert!(!is_near_white(&Rgba([0, 255, 255, 255]), 255));
    }

    #[test]
    fn corner_average_truncates() {
        let a = Rgba([255, 0, 10, 255]);
        let b = Rgba([254, 1, 10, 255]);
        let c = Rgba([254, 0, 11, 0]);
        let d = Rgba([254, 0, 10, 255]);
        assert_eq!(average_corners([&a, &b, &c, &d]), Rgb([254, 0, 10]));
    }

    #[test]
    fn rewrite_alpha_counts_across_rows() {
        let mut img = RgbaImage::from_fn(3, 5, |x, _| match x {
            0 => Rgba([0, 0, 0, 255]),
            1 => Rgba([1, 1, 1, 255]),
            _ => Rgba([9, 9, 9, 200]),
        });
        let stats = rewrite_alpha(&mut img, |px| match px.0[0] {
            0 => Some(0),
            1 => Some(77),
            _ => None,
        });
        assert_eq!(stats.transparent, 5);
        assert_eq!(stats.partial, 5);
        for (x, _, px) in img.enumerate_pixels() {
            let expected = [0, 77, 200][x as usize];
            assert_eq!(px.0[3], expected);
        }
    }

    #[test]
    fn rewrite_alpha_on_empty_image_is_a_no_op() {
        for (w, h) in [(0, 0), (0, 4), (4, 0)] {
            let mut img = RgbaImage::new(w, h);
            assert_eq!(rewrite_alpha(&mut img, |_| Some(0)), ProcessStats::default());
        }
    }

    #[test]
    fn corner_average_of_one_pixel_is_that_pixel() {
        let px = Rgba([17, 99, 201, 128]);
        assert_eq!(average_corners([&px, &px, &px, &px]), Rgb([17, 99, 201]));
    }
}
