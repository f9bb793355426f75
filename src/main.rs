//! Command-line front end.
//!
//! Recolors each input presentation for the requested palette and writes
//! one output file per document, or a single combined archive with
//! `--zip-output`. Results print to stdout as documents finish; logs go
//! to stderr.

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use damson::{
    BatchOptions, DEFAULT_MAX_WORKERS, InputDocument, InversionConfig, ProcessingResult,
    WorkerBackend, process_batch, process_batch_streaming,
};

#[derive(Parser)]
#[command(name = "damson")]
#[command(version, about = "Recolor PowerPoint decks for dark backgrounds", long_about = None)]
struct Cli {
    /// Input .pptx files, or zip containers of them
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Background color of the recolored deck, hex RGB
    #[arg(short, long, value_name = "RRGGBB", default_value = "000000")]
    background: String,

    /// Foreground (text) color of the recolored deck, hex RGB
    #[arg(short, long, value_name = "RRGGBB", default_value = "FFFFFF")]
    foreground: String,

    /// Text spliced into output filenames, before the extension
    #[arg(long, value_name = "TEXT", default_value = "(inverted)")]
    suffix: String,

    /// Directory for output files
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Leave embedded images untouched
    #[arg(long)]
    no_images: bool,

    /// JPEG quality for re-encoded images, 1-100
    #[arg(long, value_name = "N", default_value_t = 85)]
    quality: u8,

    /// Number of parallel workers
    #[arg(short = 'j', long, value_name = "N", default_value_t = DEFAULT_MAX_WORKERS)]
    workers: usize,

    /// How documents are processed in parallel
    #[arg(long, value_enum, default_value = "process")]
    backend: Backend,

    /// Write every output into one zip archive at this path
    #[arg(long, value_name = "FILE", conflicts_with = "output_dir")]
    zip_output: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Worker execution backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// One child process per worker
    Process,
    /// Threads inside this process
    Thread,
}

impl From<Backend> for WorkerBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Process => WorkerBackend::Process,
            Backend::Thread => WorkerBackend::Thread,
        }
    }
}

fn main() {
    // Must run before argument parsing: worker children re-execute this
    // binary and expect job frames on stdin, not a CLI.
    damson::init_worker();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(0) => {}
        Ok(failed) => {
            eprintln!("{failed} document(s) failed");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "damson=warn",
        1 => "damson=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Returns the number of failed documents; anything fatal is `Err`.
fn run(cli: Cli) -> Result<usize, String> {
    let config = InversionConfig::from_hex(&cli.background, &cli.foreground)
        .map_err(|e| e.to_string())?
        .with_invert_images(!cli.no_images)
        .with_image_quality(cli.quality);
    config.validate().map_err(|e| e.to_string())?;

    let options = BatchOptions {
        backend: cli.backend.into(),
        max_workers: cli.workers,
    };

    let docs = read_inputs(&cli.files)?;

    match cli.zip_output.as_deref() {
        Some(archive_path) => run_archived(docs, &config, &options, archive_path),
        None => run_per_file(docs, &config, &options, &cli.output_dir, &cli.suffix),
    }
}

fn read_inputs(paths: &[PathBuf]) -> Result<Vec<InputDocument>, String> {
    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes =
            std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        docs.push(InputDocument::new(name, bytes));
    }
    Ok(docs)
}

/// Stream results as they finish, writing each success into `output_dir`.
fn run_per_file(
    docs: Vec<InputDocument>,
    config: &InversionConfig,
    options: &BatchOptions,
    output_dir: &Path,
    suffix: &str,
) -> Result<usize, String> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| format!("cannot create {}: {e}", output_dir.display()))?;

    let stream = process_batch_streaming(docs, config, options).map_err(|e| e.to_string())?;
    for warning in stream.config_warnings() {
        eprintln!("warning: {warning}");
    }

    let mut total = 0usize;
    let mut failed = 0usize;
    for result in stream {
        total += 1;
        report(&result);
        match result.output {
            Some(bytes) => {
                let path = output_dir.join(output_name(&result.name, suffix));
                std::fs::write(&path, bytes)
                    .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
                println!("  wrote {}", path.display());
            }
            None => failed += 1,
        }
    }
    println!("{} of {total} document(s) recolored", total - failed);
    Ok(failed)
}

/// Collect the whole batch, then write the combined archive of successes.
fn run_archived(
    docs: Vec<InputDocument>,
    config: &InversionConfig,
    options: &BatchOptions,
    archive_path: &Path,
) -> Result<usize, String> {
    let outcome = process_batch(docs, config, options).map_err(|e| e.to_string())?;
    for warning in &outcome.config_warnings {
        eprintln!("warning: {warning}");
    }
    for result in &outcome.results {
        report(result);
    }

    let total = outcome.results.len();
    let failed = outcome.failed().count();
    match outcome.archive {
        Some(bytes) => {
            std::fs::write(archive_path, bytes)
                .map_err(|e| format!("cannot write {}: {e}", archive_path.display()))?;
            println!("wrote {}", archive_path.display());
        }
        None => eprintln!("nothing succeeded; {} not written", archive_path.display()),
    }
    println!("{} of {total} document(s) recolored", total - failed);
    Ok(failed)
}

fn report(result: &ProcessingResult) {
    if result.succeeded {
        if result.warnings.is_empty() {
            println!("{}: recolored", result.name);
        } else {
            println!(
                "{}: recolored with {} warning(s)",
                result.name,
                result.warnings.len()
            );
        }
    } else {
        println!("{}: failed", result.name);
    }
    for warning in &result.warnings {
        println!("  - {warning}");
    }
}

/// Flatten container-joined names and splice the suffix in before the
/// extension: `deck.pptx` becomes `deck (inverted).pptx`.
fn output_name(result_name: &str, suffix: &str) -> String {
    let flat = result_name.replace(['/', '\\'], "_");
    if suffix.is_empty() {
        return flat;
    }
    match flat.rfind('.') {
        Some(dot) if dot > 0 => format!("{} {}{}", &flat[..dot], suffix, &flat[dot..]),
        _ => format!("{flat} {suffix}"),
    }
}
