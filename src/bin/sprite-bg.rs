use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};

use sprite_bg_removal::{
    default_output_path, process_directory, process_file, same_file, whitening, ProcessOptions,
    ProcessResult, Strategy,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Corner-sampled background with smooth, anti-aliased edges
    SpriteSheet,
    /// Near-white pixels become transparent (tolerance 30)
    Fixed,
    /// Like fixed, but more aggressive (tolerance 40)
    EdgeAware,
}

#[derive(Parser)]
#[command(
    name = "sprite-bg",
    about = "Remove white and near-white backgrounds from game sprites",
    version,
    after_help = "Simple usage: sprite-bg <image>  (sprite-sheet mode, in-place, backup in ./backups)\n\n\
                  Existing files that get replaced are backed up once; a backup is never overwritten."
)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: overwrite the input)
    #[arg(short, long)]
    output: Option<String>,

    /// Background removal strategy
    #[arg(short, long, value_enum, default_value = "sprite-sheet")]
    mode: Mode,

    /// Margin below pure white for the fixed and edge-aware modes (0-255)
    #[arg(short, long, allow_negative_numbers = true)]
    tolerance: Option<i64>,

    /// Directory for backups of overwritten inputs (default: <input dir>/backups)
    #[arg(long)]
    backup_dir: Option<String>,

    /// Never create backups
    #[arg(long, conflicts_with = "backup_dir")]
    no_backup: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let strategy = match (cli.mode, cli.tolerance) {
        (Mode::SpriteSheet, Some(_)) => {
            eprintln!("Error: --tolerance only applies to the fixed and edge-aware modes");
            process::exit(1);
        }
        (Mode::SpriteSheet, None) => Strategy::SpriteSheet,
        (Mode::Fixed, None) => Strategy::FIXED,
        (Mode::EdgeAware, None) => Strategy::EDGE_AWARE,
        (Mode::Fixed | Mode::EdgeAware, Some(tolerance)) => {
            if let Err(e) = whitening::check_tolerance(tolerance) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            Strategy::Whiten { tolerance }
        }
    };

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    let output_path = match &cli.output {
        Some(o) => PathBuf::from(o),
        None if input_path.is_dir() => input_path.to_path_buf(),
        None => default_output_path(input_path),
    };

    let backup_dir = if cli.no_backup {
        None
    } else if let Some(dir) = &cli.backup_dir {
        Some(PathBuf::from(dir))
    } else if same_file(input_path, &output_path) || output_path.exists() {
        // Something already on disk may be replaced.
        let base = if input_path.is_dir() {
            input_path
        } else {
            input_path.parent().unwrap_or(Path::new("."))
        };
        Some(base.join("backups"))
    } else {
        None
    };

    let opts = ProcessOptions {
        strategy,
        backup_dir,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if opts.verbose && !opts.quiet {
        eprintln!("Strategy: {:?}", opts.strategy);
        match &opts.backup_dir {
            Some(dir) => eprintln!("Backups: {}", dir.display()),
            None => eprintln!("Backups: disabled"),
        }
        eprintln!();
    }

    let results = if input_path.is_dir() {
        process_directory(input_path, &output_path, &opts)
    } else {
        vec![process_file(input_path, &output_path, &opts)]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if !result.success {
        eprintln!("[FAIL] {filename}: {}", result.message);
        return;
    }
    if opts.quiet {
        return;
    }

    for backup in &result.backups {
        eprintln!("[BACKUP] {filename} -> {}", backup.display());
    }
    match &result.output {
        Some(out) if out != &result.path => eprintln!("[OK] {filename} -> {}", out.display()),
        _ => eprintln!("[OK] {filename}"),
    }

    if opts.verbose {
        if let Some(bg) = result.stats.background {
            eprintln!("  -> detected background: RGB({}, {}, {})", bg[0], bg[1], bg[2]);
        }
        eprintln!("  -> {}", result.message);
    }
}
