//! CLI binary for xpdf-driver.
//!
//! A thin shim over the library crate that maps CLI flags to extractor
//! options and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use xpdf_driver::{Configuration, OutputFormat, RasterExtractor, TextExtractor};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render every page as PPM into the temp directory
  xpdf images report.pdf

  # Pages 2-4 as 300 DPI PNGs into ./out
  xpdf images report.pdf --format png --resolution 300 -f 2 -l 4 --output-dir out

  # First page, longest side 2000 px, JSON list of files
  xpdf images report.pdf --format jpeg --max-dimension 2000 -f 1 -l 1 --json

  # Text of the whole document to stdout
  xpdf text report.pdf

  # Two pages starting at page 3, Latin-1, to a file
  xpdf text report.pdf -f 3 --page-quantity 1 --encoding Latin1 -o page3.txt

ENVIRONMENT VARIABLES:
  PDFTOPPM_BINARY   Name or path of pdftoppm  (default: pdftoppm on PATH)
  PDFTOTEXT_BINARY  Name or path of pdftotext (default: pdftotext on PATH)
  XPDF_TIMEOUT      Per-invocation timeout in seconds (default: 60)
  RUST_LOG          Log filter, overrides -v / -q
"#;

/// Render or extract text from PDF files with pdftoppm / pdftotext.
#[derive(Parser, Debug)]
#[command(
    name = "xpdf",
    version,
    about = "Render or extract text from PDF files with pdftoppm / pdftotext",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Per-invocation timeout in seconds.
    #[arg(long, global = true, env = "XPDF_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "XPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "XPDF_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rasterise pages into image files (pdftoppm).
    Images(ImagesArgs),
    /// Extract page text (pdftotext).
    Text(TextArgs),
}

#[derive(Args, Debug)]
struct PageArgs {
    /// First page to process (1-indexed).
    #[arg(short = 'f', long = "first")]
    first: Option<u32>,

    /// Last page to process. Takes precedence over --page-quantity.
    #[arg(short = 'l', long = "last")]
    last: Option<u32>,

    /// Pages to process after --first when --last is not given.
    #[arg(long)]
    page_quantity: Option<i64>,
}

#[derive(Args, Debug)]
struct ImagesArgs {
    /// PDF file to render.
    input: PathBuf,

    /// Image format: ppm, png, jpeg (jpg), jpegcmyk, tiff.
    #[arg(long, default_value = "ppm")]
    format: String,

    /// Resolution in DPI.
    #[arg(short, long, conflicts_with = "max_dimension")]
    resolution: Option<u32>,

    /// Scale pages so the longer side is this many pixels.
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Directory to write images to (default: system temp directory).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print the produced files as a JSON array.
    #[arg(long)]
    json: bool,

    /// Name or path of the pdftoppm binary.
    #[arg(long, env = "PDFTOPPM_BINARY", default_value = "pdftoppm")]
    binary: String,

    #[command(flatten)]
    pages: PageArgs,
}

#[derive(Args, Debug)]
struct TextArgs {
    /// PDF file to read.
    input: PathBuf,

    /// Output text encoding (see `pdftotext -listenc`).
    #[arg(long, default_value = "UTF-8")]
    encoding: String,

    /// Write text to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Name or path of the pdftotext binary.
    #[arg(long, env = "PDFTOTEXT_BINARY", default_value = "pdftotext")]
    binary: String,

    #[command(flatten)]
    pages: PageArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let span = tracing::info_span!("xpdf");

    match &cli.command {
        Command::Images(args) => run_images(&cli, args, span),
        Command::Text(args) => run_text(&cli, args, span),
    }
}

fn run_images(cli: &Cli, args: &ImagesArgs, span: tracing::Span) -> Result<()> {
    let config = Configuration::from([
        ("pdftoppm.binaries", serde_json::Value::from(args.binary.as_str())),
        ("timeout", serde_json::Value::from(cli.timeout)),
    ]);
    let mut pdftoppm =
        RasterExtractor::create(config, Some(span)).context("Failed to set up pdftoppm")?;

    let format: OutputFormat = args.format.parse().context("Invalid --format")?;
    pdftoppm.set_format(format);
    if let Some(dpi) = args.resolution {
        pdftoppm.set_resolution(dpi);
    }
    if let Some(px) = args.max_dimension {
        pdftoppm.set_max_dimension(px);
    }
    if let Some(n) = args.pages.page_quantity {
        pdftoppm.set_page_quantity(n).context("Invalid --page-quantity")?;
    }
    if let Some(ref dir) = args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
        pdftoppm.set_output_directory(dir);
    }

    let spinner = spinner(cli, "Rendering");
    let started = Instant::now();
    let result = pdftoppm.extract_images(&args.input, args.pages.first, args.pages.last);
    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }
    let images = result.with_context(|| format!("Failed to render {:?}", args.input))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&images).context("Failed to serialise file list")?
        );
    } else {
        for image in &images {
            println!("{}", image.display());
        }
    }

    if !cli.quiet && !args.json {
        eprintln!(
            "{} {} {} image(s) in {}",
            green("✔"),
            bold(&images.len().to_string()),
            format,
            dim(&format!("{}ms", started.elapsed().as_millis())),
        );
    }
    Ok(())
}

fn run_text(cli: &Cli, args: &TextArgs, span: tracing::Span) -> Result<()> {
    let config = Configuration::from([
        ("pdftotext.binaries", serde_json::Value::from(args.binary.as_str())),
        ("timeout", serde_json::Value::from(cli.timeout)),
    ]);
    let mut pdftotext =
        TextExtractor::create(config, Some(span)).context("Failed to set up pdftotext")?;

    pdftotext.set_output_encoding(args.encoding.as_str());
    if let Some(n) = args.pages.page_quantity {
        pdftotext.set_page_quantity(n).context("Invalid --page-quantity")?;
    }

    // Raw bytes so non-UTF-8 encodings reach the output untouched.
    let spinner = spinner(cli, "Extracting");
    let result = pdftotext.extract_bytes(&args.input, args.pages.first, args.pages.last);
    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }
    let bytes = result.with_context(|| format!("Failed to extract text from {:?}", args.input))?;

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write output file {:?}", path))?;
            if !cli.quiet {
                eprintln!(
                    "{} {} bytes  →  {}",
                    green("✔"),
                    bytes.len(),
                    bold(&path.display().to_string())
                );
            }
        }
        None => {
            io::stdout()
                .lock()
                .write_all(&bytes)
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

/// A steady-tick spinner on stderr; cleared before any result is printed.
fn spinner(cli: &Cli, prefix: &'static str) -> Option<ProgressBar> {
    if cli.quiet || cli.verbose {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix(prefix);
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}
