//! # xpdf-driver
//!
//! Typed, blocking driver for two PDF command-line tools shipped by Poppler
//! and Xpdf:
//!
//! * `pdftoppm`: render pages to PPM/PNG/JPEG/TIFF images
//!   ([`RasterExtractor`])
//! * `pdftotext`: extract page text ([`TextExtractor`])
//!
//! The crate does not parse PDF itself. Its job is to turn a handful of
//! options (page range, page quantity, image format, resolution or max
//! dimension, text encoding) into a correct argument list, run the tool, and
//! turn what it produced into a typed result.
//!
//! ## Invocation flow
//!
//! ```text
//! create(config) ──▶ BinaryLocator    resolve "pdftoppm" on PATH (eager)
//!       │
//! set_*(...)         page quantity / format / sizing / encoding
//!       │
//! extract_*(path, start, end)
//!       ├─ 1. validate   source must be an existing file
//!       ├─ 2. arguments  -f/-l, format, -r/-scale-to, -enc, …
//!       ├─ 3. run        CommandRunner with the configured timeout
//!       └─ 4. collect    per-page image files / captured stdout
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xpdf_driver::{Configuration, RasterExtractor, TextExtractor};
//!
//! fn main() -> Result<(), xpdf_driver::XpdfError> {
//!     let text = TextExtractor::create(Configuration::new(), None)?;
//!     print!("{}", text.extract_text("document.pdf", None, None)?);
//!
//!     let mut raster = RasterExtractor::create([("timeout", 120)], None)?;
//!     raster.set_output_format("png")?.set_resolution(300);
//!     let pages = raster.extract_images("document.pdf", Some(1), Some(2))?;
//!     eprintln!("rendered {} pages", pages.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `xpdf` binary (clap, anyhow, tracing-subscriber, indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! xpdf-driver = { version = "0.5", default-features = false }
//! ```
//!
//! ## Threading
//!
//! Setters take `&mut self` and extraction takes `&self`, so options cannot
//! change under an in-flight call. Use one extractor per concurrent job.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pages;
pub mod raster;
pub mod runner;
pub mod text;
mod tool;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Configuration, ExtractorConfig, ExtractorConfigBuilder, DEFAULT_TIMEOUT_SECS};
pub use error::{ErrorKind, RunError, XpdfError};
pub use pages::PageRange;
pub use raster::{OutputFormat, RasterExtractor, SizingMode, PDFTOPPM};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use text::{TextExtractor, DEFAULT_ENCODING, PDFTOTEXT};
pub use xpdf_locate::{BinaryLocator, LocateError, SystemLocator};
