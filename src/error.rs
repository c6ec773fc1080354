//! Error types for the sprite-bg-removal crate.

/// Errors that can occur while removing a sprite background.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input bytes could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),

    /// The image has no pixels, so there are no corners to sample.
    #[error("image has zero area ({width}x{height})")]
    InvalidInput {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// A whitening tolerance outside `0..=255` was requested.
    #[error("tolerance {tolerance} is out of range (expected 0-255)")]
    InvalidArgument {
        /// The rejected tolerance.
        tolerance: i64,
    },

    /// An I/O error occurred while reading, writing or backing up files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output format is unknown or cannot store transparency.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred while encoding the processed image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
