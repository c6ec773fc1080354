//! Strategy dispatch and the file-level processing pipeline.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbaImage};

use crate::error::{Error, Result};
use crate::sprite_sheet;
use crate::whitening;

/// How background pixels are recognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Pixels whose channels all exceed `255 - tolerance` become transparent.
    Whiten {
        /// Margin below pure white, `0..=255`.
        tolerance: i64,
    },
    /// Corner-sampled background with an alpha ramp for anti-aliased edges.
    #[default]
    SpriteSheet,
}

impl Strategy {
    /// Plain white removal, tolerance 30.
    pub const FIXED: Self = Self::Whiten {
        tolerance: whitening::DEFAULT_TOLERANCE as i64,
    };

    /// Edge-aware white removal, tolerance 40.
    pub const EDGE_AWARE: Self = Self::Whiten {
        tolerance: whitening::EDGE_AWARE_TOLERANCE as i64,
    };
}

/// What a single processing call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    /// Background color estimated from the corners (sprite-sheet strategy only).
    pub background: Option<Rgb<u8>>,
    /// Pixels whose alpha was set to 0.
    pub transparent: u64,
    /// Pixels given a partial alpha by the edge ramp.
    pub partial: u64,
}

impl ProcessStats {
    pub(crate) fn count(&mut self, alpha: u8) {
        if alpha == 0 {
            self.transparent += 1;
        } else {
            self.partial += 1;
        }
    }

    pub(crate) fn merge(self, other: Self) -> Self {
        Self {
            background: self.background.or(other.background),
            transparent: self.transparent + other.transparent,
            partial: self.partial + other.partial,
        }
    }
}

/// Options controlling file processing.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Strategy applied to every image.
    pub strategy: Strategy,
    /// Directory receiving create-once copies of inputs, and of any other
    /// existing file about to be replaced, before processing.
    pub backup_dir: Option<PathBuf>,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Where the processed image was written, if it was.
    pub output: Option<PathBuf>,
    /// Whether processing succeeded.
    pub success: bool,
    /// Backups created for this file during this run.
    pub backups: Vec<PathBuf>,
    /// What the strategy changed.
    pub stats: ProcessStats,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            output: None,
            success: false,
            backups: Vec::new(),
            stats: ProcessStats::default(),
            message,
        }
    }
}

/// Apply `strategy` to a decoded image in place.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for a whitening tolerance outside `0..=255`,
/// [`Error::InvalidInput`] for a zero-area image under the sprite-sheet
/// strategy. The image is untouched on error.
pub fn process_image(image: &mut RgbaImage, strategy: Strategy) -> Result<ProcessStats> {
    match strategy {
        Strategy::Whiten { tolerance } => whitening::whiten(image, tolerance),
        Strategy::SpriteSheet => sprite_sheet::process_sprite_sheet(image),
    }
}

/// Decode image bytes into RGBA, adding an opaque alpha channel if missing.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the data is not a supported image.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes).map_err(Error::Decode)?;
    Ok(img.to_rgba8())
}

/// Encode an RGBA image losslessly into memory.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for formats that cannot store alpha
/// losslessly, or [`Error::Image`] if encoding fails.
pub fn encode(image: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>> {
    if !keeps_alpha(format) {
        return Err(Error::UnsupportedFormat(format!(
            "{format:?} cannot store transparency"
        )));
    }
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format)?;
    Ok(buf.into_inner())
}

/// Decode, process and re-encode an image held in memory.
///
/// # Errors
///
/// Any error from [`decode`], [`process_image`] or [`encode`].
pub fn process_bytes(bytes: &[u8], strategy: Strategy, format: ImageFormat) -> Result<Vec<u8>> {
    let mut img = decode(bytes)?;
    process_image(&mut img, strategy)?;
    encode(&img, format)
}

/// Save an RGBA image, choosing the format from the path's extension.
///
/// The file is written with [`write_atomic`], so a failure never leaves a
/// truncated image behind.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
    let bytes = encode(img, format)?;
    write_atomic(path, &bytes)
}

/// Replace `path` with `bytes` without ever exposing a partial file.
///
/// The data goes to a temporary sibling first, which is then renamed over
/// `path`. On failure `path` keeps its previous contents and the temporary
/// file is removed.
///
/// # Errors
///
/// Returns [`Error::Io`] if the temporary file cannot be written or renamed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Whether two paths name the same file.
///
/// Paths that do not exist yet are compared as written.
#[must_use]
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Backup location for `input` inside `backup_dir`.
///
/// Example: `"hero.png"` becomes `"{backup_dir}/hero_original.png"`.
#[must_use]
pub fn backup_path(input: &Path, backup_dir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    match input.extension() {
        Some(ext) => backup_dir.join(format!("{stem}_original.{}", ext.to_string_lossy())),
        None => backup_dir.join(format!("{stem}_original")),
    }
}

/// Copy `input` to `backup` unless a backup already exists.
///
/// Returns `true` when a new copy was made. An existing backup is never
/// overwritten, so it always holds the first, unprocessed version.
///
/// # Errors
///
/// Returns [`Error::Io`] if the backup directory or copy cannot be created.
pub fn create_backup(input: &Path, backup: &Path) -> Result<bool> {
    if backup.exists() {
        return Ok(false);
    }
    if let Some(parent) = backup.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(input, backup)?;
    Ok(true)
}

/// Process a single image file: back up, load, process, save.
///
/// With a backup directory, the input and any different file already sitting
/// at `output` are backed up first. Nothing is written to `output` unless
/// every earlier step succeeded, and the write itself is atomic.
#[must_use]
pub fn process_file(input: &Path, output: &Path, opts: &ProcessOptions) -> ProcessResult {
    let mut result = ProcessResult::failed(input, String::new());

    if let Some(dir) = &opts.backup_dir {
        let mut originals = vec![input];
        if output.is_file() && !same_file(input, output) {
            originals.push(output);
        }
        for original in originals {
            let backup = backup_path(original, dir);
            match create_backup(original, &backup) {
                Ok(true) => result.backups.push(backup),
                Ok(false) => {}
                Err(e) => {
                    result.message =
                        format!("Failed to create backup {}: {e}", backup.display());
                    return result;
                }
            }
        }
    }

    let bytes = match fs::read(input) {
        Ok(b) => b,
        Err(e) => {
            result.message = format!("Failed to read: {e}");
            return result;
        }
    };

    let mut img = match decode(&bytes) {
        Ok(img) => img,
        Err(e) => {
            result.message = format!("Failed to load: {e}");
            return result;
        }
    };

    result.stats = match process_image(&mut img, opts.strategy) {
        Ok(stats) => stats,
        Err(e) => {
            result.message = format!("Failed to process: {e}");
            return result;
        }
    };

    let encoded = ImageFormat::from_path(output)
        .map_err(|e| Error::UnsupportedFormat(e.to_string()))
        .and_then(|format| encode(&img, format));
    let encoded = match encoded {
        Ok(bytes) => bytes,
        Err(e) => {
            result.message = format!("Failed to encode: {e}");
            return result;
        }
    };

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                result.message = format!("Failed to create output directory: {e}");
                return result;
            }
        }
    }

    match write_atomic(output, &encoded) {
        Ok(()) => {
            result.success = true;
            result.output = Some(output.to_path_buf());
            result.message = format!(
                "{} transparent, {} partial",
                result.stats.transparent, result.stats.partial
            );
        }
        Err(e) => {
            result.message = format!("Failed to save: {e}");
        }
    }

    result
}

/// Process all supported images in a directory (non-recursive).
///
/// Each output keeps the input's file name, with the extension switched to
/// `.png` when the input format cannot hold transparency. Files are processed
/// in parallel with the `parallel` feature; results are ordered by path. A
/// failure on one file does not affect the others.
#[must_use]
pub fn process_directory(
    input_dir: &Path,
    output_dir: &Path,
    opts: &ProcessOptions,
) -> Vec<ProcessResult> {
    let mut inputs: Vec<PathBuf> = match fs::read_dir(input_dir) {
        Ok(rd) => rd
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .filter(|p| is_supported_image(p))
            .collect(),
        Err(e) => {
            return vec![ProcessResult::failed(
                input_dir,
                format!("Failed to read directory: {e}"),
            )];
        }
    };
    inputs.sort();

    if !output_dir.exists() {
        if let Err(e) = fs::create_dir_all(output_dir) {
            return vec![ProcessResult::failed(
                output_dir,
                format!("Failed to create output directory: {e}"),
            )];
        }
    }

    let jobs: Vec<_> = inputs
        .iter()
        .zip(plan_output_names(&inputs))
        .collect();

    let run = |(input, name): &(&PathBuf, std::result::Result<String, String>)| match name {
        Ok(name) => process_file(input, &output_dir.join(name), opts),
        Err(message) => ProcessResult::failed(input, message.clone()),
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        jobs.par_iter().map(run).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        jobs.iter().map(run).collect()
    }
}

/// Pick a distinct output file name for every input of a directory run.
///
/// Inputs normally keep their name (see [`default_output_path`]). When a
/// renamed input would land on another input's name, e.g. `hero.jpg` and
/// `hero.png`, the renamed one keeps its full name plus `.png`
/// (`hero.jpg.png`). Names still claimed twice after that are refused.
fn plan_output_names(inputs: &[PathBuf]) -> Vec<std::result::Result<String, String>> {
    let own_name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());

    let mut names: Vec<Option<String>> = inputs
        .iter()
        .map(|p| own_name(&default_output_path(p)))
        .collect();

    let claims = count_claims(&names);
    for (input, name) in inputs.iter().zip(names.iter_mut()) {
        let renamed = match (name.as_deref(), own_name(input)) {
            (Some(n), Some(own)) if claims[n] > 1 && n != own => Some(format!("{own}.png")),
            _ => None,
        };
        if renamed.is_some() {
            *name = renamed;
        }
    }

    let claims = count_claims(&names);
    names
        .into_iter()
        .map(|name| match name {
            None => Err("Input has no file name".to_string()),
            Some(n) if claims[&n] > 1 => {
                Err(format!("Output {n} would be written by more than one input"))
            }
            Some(n) => Ok(n),
        })
        .collect()
}

fn count_claims(names: &[Option<String>]) -> HashMap<String, usize> {
    let mut claims = HashMap::new();
    for name in names.iter().flatten() {
        *claims.entry(name.clone()).or_insert(0) += 1;
    }
    claims
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Generate a default output path from an input path.
///
/// Inputs that can hold transparency are overwritten in place; anything else
/// gets a `.png` sibling, e.g. `"hero.jpg"` becomes `"hero.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    match ImageFormat::from_path(input) {
        Ok(format) if keeps_alpha(format) => input.to_path_buf(),
        _ => input.with_extension("png"),
    }
}

/// Formats the crate writes: lossless and alpha-capable.
fn keeps_alpha(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn presets_carry_their_tolerances() {
        assert_eq!(Strategy::FIXED, Strategy::Whiten { tolerance: 30 });
        assert_eq!(Strategy::EDGE_AWARE, Strategy::Whiten { tolerance: 40 });
        assert_eq!(Strategy::default(), Strategy::SpriteSheet);
    }

    #[test]
    fn whiteners_agree_at_equal_tolerance() {
        #[allow(clippy::cast_possible_truncation)]
        let original = RgbaImage::from_fn(24, 24, |x, y| {
            Rgba([200 + (x * 2) as u8, 210 + y as u8, 255 - (x + y) as u8, 255])
        });
        for tolerance in [0, 1, 30, 40, 128, 255] {
            let mut fixed = original.clone();
            let mut edges = original.clone();
            whitening::whiten(&mut fixed, tolerance).unwrap();
            process_image(&mut edges, Strategy::Whiten { tolerance }).unwrap();
            assert_eq!(fixed, edges, "tolerance {tolerance}");
        }
    }

    #[test]
    fn stats_merge_sums_counts() {
        let mut a = ProcessStats::default();
        a.count(0);
        let mut b = ProcessStats::default();
        b.count(99);
        b.count(0);
        let merged = a.merge(b);
        assert_eq!(merged.transparent, 2);
        assert_eq!(merged.partial, 1);
        assert_eq!(merged.background, None);
    }

    #[test]
    fn encode_rejects_formats_without_alpha() {
        let img = RgbaImage::new(2, 2);
        let err = encode(&img, ImageFormat::Jpeg).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn png_round_trip_preserves_alpha() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 77]));
        let bytes = encode(&img, ImageFormat::Png).unwrap();
        assert_eq!(decode(&bytes).unwrap(), img);
    }

    #[test]
    fn process_bytes_applies_strategy() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let png = encode(&img, ImageFormat::Png).unwrap();
        let out = process_bytes(&png, Strategy::SpriteSheet, ImageFormat::Png).unwrap();
        let out = decode(&out).unwrap();
        assert!(out.pixels().all(|px| px.0 == [255, 255, 255, 0]));
    }

    #[test]
    fn backup_path_appends_original_suffix() {
        let p = backup_path(Path::new("assets/gta_1.png"), Path::new("assets/backups"));
        assert_eq!(p, PathBuf::from("assets/backups/gta_1_original.png"));

        let p = backup_path(Path::new("sprite"), Path::new("b"));
        assert_eq!(p, PathBuf::from("b/sprite_original"));
    }

    #[test]
    fn default_output_path_overwrites_alpha_capable_inputs() {
        assert_eq!(
            default_output_path(Path::new("/tmp/hero.png")),
            PathBuf::from("/tmp/hero.png")
        );
        assert_eq!(
            default_output_path(Path::new("/tmp/hero.jpg")),
            PathBuf::from("/tmp/hero.png")
        );
    }

    #[test]
    fn output_names_avoid_renamed_collisions() {
        let inputs = [
            PathBuf::from("d/hero.jpg"),
            PathBuf::from("d/hero.png"),
            PathBuf::from("d/tree.jpeg"),
        ];
        let names: Vec<_> = plan_output_names(&inputs)
            .into_iter()
            .map(std::result::Result::unwrap)
            .collect();
        assert_eq!(names, ["hero.jpg.png", "hero.png", "tree.png"]);
    }

    #[test]
    fn output_names_refuse_unresolvable_collisions() {
        let inputs = [
            PathBuf::from("d/x.jpg"),
            PathBuf::from("d/x.jpg.png"),
            PathBuf::from("d/x.png"),
        ];
        let names = plan_output_names(&inputs);
        assert!(names[0].as_ref().unwrap_err().contains("x.jpg.png"));
        assert!(names[1].is_err());
        assert_eq!(names[2].as_deref(), Ok("x.png"));
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        fs::write(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_write_keeps_destination_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("out.png");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("keep"), b"previous").unwrap();

        assert!(matches!(write_atomic(&blocked, b"new"), Err(Error::Io(_))));
        assert_eq!(fs::read(blocked.join("keep")).unwrap(), b"previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn same_file_sees_through_relative_segments() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        fs::write(&a, b"x").unwrap();
        let dotted = dir.path().join(".").join("a.png");
        assert!(same_file(&a, &dotted));
        assert!(!same_file(&a, &dir.path().join("b.png")));
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("sheet.jpg")));
        assert!(is_supported_image(Path::new("sheet.JPEG")));
        assert!(is_supported_image(Path::new("sheet.png")));
        assert!(is_supported_image(Path::new("sheet.webp")));
        assert!(is_supported_image(Path::new("sheet.bmp")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("sheet.gif")));
        assert!(!is_supported_image(Path::new("sheet.txt")));
        assert!(!is_supported_image(Path::new("sheet")));
    }
}
