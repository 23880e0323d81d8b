//! Page rasterisation through `pdftoppm`.
//!
//! `pdftoppm` writes one file per page next to an *output prefix* it is given:
//! `<prefix>-<page>.<ext>`, the page number zero-padded to the width of the
//! document's page count. [`RasterExtractor::extract_images`] reserves a fresh
//! prefix, runs the tool, then collects every file whose name starts with that
//! prefix.
//!
//! ## Sizing
//!
//! The output size is either a resolution (`-r <dpi>`) or a cap on the longest
//! side (`-scale-to <px>`), never both. [`SizingMode`] holds whichever was set
//! last.

use crate::config::{Configuration, ExtractorConfig};
use crate::error::XpdfError;
use crate::pages::{self, PageRange};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::tool::{ensure_file, Tool};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn, Span};
use xpdf_locate::{BinaryLocator, SystemLocator};

/// Name of the rasteriser binary and of its configuration key prefix.
pub const PDFTOPPM: &str = "pdftoppm";

/// Prefix of the reserved output names.
const PREFIX_STEM: &str = "xpdf";

/// `-<page>.<ext>` at the end of a produced file name.
static PAGE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-(\d+)\.[A-Za-z0-9]+$").unwrap());

// ── Enums ────────────────────────────────────────────────────────────────

/// Image format written by `pdftoppm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Portable pixmap, the tool's default. No flag is emitted.
    #[default]
    Ppm,
    Jpeg,
    /// JPEG in the CMYK colour space.
    JpegCmyk,
    Png,
    Tiff,
}

impl OutputFormat {
    /// The command-line flag selecting this format, if any.
    pub fn flag(self) -> Option<&'static str> {
        match self {
            OutputFormat::Ppm => None,
            OutputFormat::Jpeg => Some("-jpeg"),
            OutputFormat::JpegCmyk => Some("-jpegcmyk"),
            OutputFormat::Png => Some("-png"),
            OutputFormat::Tiff => Some("-tiff"),
        }
    }

    /// File extension the tool gives produced images.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Ppm => "ppm",
            OutputFormat::Jpeg | OutputFormat::JpegCmyk => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Tiff => "tif",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = XpdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ppm" => Ok(OutputFormat::Ppm),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "jpegcmyk" => Ok(OutputFormat::JpegCmyk),
            "png" => Ok(OutputFormat::Png),
            "tiff" => Ok(OutputFormat::Tiff),
            _ => Err(XpdfError::InvalidArgument(format!(
                "Format must be one of \"ppm\", \"png\", \"jpeg\", \"jpegcmyk\" or \"tiff\", got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Ppm => "ppm",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::JpegCmyk => "jpegcmyk",
            OutputFormat::Png => "png",
            OutputFormat::Tiff => "tiff",
        };
        f.write_str(name)
    }
}

/// How the rendered image size is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizingMode {
    /// Tool default (150 DPI).
    #[default]
    Unset,
    /// Render at this many dots per inch.
    Resolution(u32),
    /// Scale so the longer side is exactly this many pixels.
    MaxDimension(u32),
}

impl SizingMode {
    fn push_args(self, args: &mut Vec<OsString>) {
        match self {
            SizingMode::Unset => {}
            SizingMode::Resolution(dpi) => {
                args.push("-r".into());
                args.push(dpi.to_string().into());
            }
            SizingMode::MaxDimension(px) => {
                args.push("-scale-to".into());
                args.push(px.to_string().into());
            }
        }
    }
}

// ── Extractor ────────────────────────────────────────────────────────────

/// Rasterises PDF pages into image files with `pdftoppm`.
///
/// Configure once, extract many times:
///
/// ```rust,no_run
/// use xpdf_driver::{Configuration, RasterExtractor};
///
/// let mut pdftoppm = RasterExtractor::create(Configuration::new(), None)?;
/// pdftoppm.set_output_format("png")?.set_max_dimension(2000);
///
/// for image in pdftoppm.extract_images("report.pdf", Some(1), Some(3))? {
///     println!("{}", image.display());
/// }
/// # Ok::<(), xpdf_driver::XpdfError>(())
/// ```
#[derive(Debug)]
pub struct RasterExtractor {
    tool: Tool,
    page_quantity: Option<NonZeroU32>,
    format: OutputFormat,
    sizing: SizingMode,
    /// Where output prefixes are reserved. `None` = system temp directory.
    output_dir: Option<PathBuf>,
}

impl RasterExtractor {
    /// Build an extractor from a loose configuration, locating `pdftoppm` on
    /// the host and running it as a child process.
    ///
    /// Reads `"pdftoppm.binaries"` (default `"pdftoppm"`) and `"timeout"`
    /// (default 60). Fails with [`XpdfError::BinaryNotFound`] right away if
    /// the binary cannot be located.
    pub fn create(
        configuration: impl Into<Configuration>,
        span: Option<Span>,
    ) -> Result<Self, XpdfError> {
        Self::with_collaborators(
            configuration,
            span,
            &SystemLocator::default(),
            Box::new(ProcessRunner),
        )
    }

    /// Like [`RasterExtractor::create`] with injected collaborators.
    pub fn with_collaborators(
        configuration: impl Into<Configuration>,
        span: Option<Span>,
        locator: &dyn BinaryLocator,
        runner: Box<dyn CommandRunner>,
    ) -> Result<Self, XpdfError> {
        let tool = Tool::resolve(configuration.into(), PDFTOPPM, span, locator, runner)?;
        Ok(Self::from_tool(tool))
    }

    /// Build an extractor from an already-resolved configuration.
    pub fn from_config(config: ExtractorConfig, runner: Box<dyn CommandRunner>) -> Self {
        Self::from_tool(Tool::new(config, runner))
    }

    fn from_tool(tool: Tool) -> Self {
        Self {
            tool,
            page_quantity: None,
            format: OutputFormat::default(),
            sizing: SizingMode::default(),
            output_dir: None,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        self.tool.config()
    }

    // ── Options ──────────────────────────────────────────────────────────

    /// Number of pages to render after `page_start` when no end page is given.
    pub fn set_page_quantity(&mut self, n: i64) -> Result<&mut Self, XpdfError> {
        self.page_quantity = Some(pages::page_quantity(n)?);
        Ok(self)
    }

    pub fn page_quantity(&self) -> Option<u32> {
        self.page_quantity.map(NonZeroU32::get)
    }

    /// Select the image format by name: `ppm`, `jpeg`/`jpg`, `jpegcmyk`,
    /// `png` or `tiff`, case-insensitive.
    pub fn set_output_format(&mut self, name: &str) -> Result<&mut Self, XpdfError> {
        self.format = name.parse()?;
        Ok(self)
    }

    pub fn set_format(&mut self, format: OutputFormat) -> &mut Self {
        self.format = format;
        self
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// Render at `dpi` dots per inch. Replaces any max dimension; 0 unsets.
    pub fn set_resolution(&mut self, dpi: u32) -> &mut Self {
        self.sizing = if dpi == 0 {
            SizingMode::Unset
        } else {
            SizingMode::Resolution(dpi)
        };
        self
    }

    /// Scale each page so its longer side is `pixels`. Replaces any
    /// resolution; 0 unsets.
    pub fn set_max_dimension(&mut self, pixels: u32) -> &mut Self {
        self.sizing = if pixels == 0 {
            SizingMode::Unset
        } else {
            SizingMode::MaxDimension(pixels)
        };
        self
    }

    /// Active resolution in DPI, or 0.
    pub fn resolution(&self) -> u32 {
        match self.sizing {
            SizingMode::Resolution(dpi) => dpi,
            _ => 0,
        }
    }

    /// Active max dimension in pixels, or 0.
    pub fn max_dimension(&self) -> u32 {
        match self.sizing {
            SizingMode::MaxDimension(px) => px,
            _ => 0,
        }
    }

    pub fn sizing(&self) -> SizingMode {
        self.sizing
    }

    /// Reserve output prefixes in `dir` instead of the system temp directory.
    pub fn set_output_directory(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn output_directory(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    // ── Extraction ───────────────────────────────────────────────────────

    /// The exact argument list passed to `pdftoppm` for this request.
    pub fn build_arguments(
        &self,
        path: &Path,
        page_start: Option<u32>,
        page_end: Option<u32>,
        output_prefix: &Path,
    ) -> Vec<OsString> {
        let mut args = Vec::new();
        PageRange::new(page_start, page_end).push_args(self.page_quantity, &mut args);
        if let Some(flag) = self.format.flag() {
            args.push(flag.into());
        }
        self.sizing.push_args(&mut args);
        args.push(path.into());
        args.push(output_prefix.into());
        args
    }

    /// Render pages of `path` to images and return the produced files.
    ///
    /// With no page bounds every page is rendered. Files are returned in page
    /// order and left on disk; the caller owns them.
    ///
    /// # Errors
    /// - [`XpdfError::InvalidFile`] if `path` is not an existing file (the
    ///   tool is not started)
    /// - [`XpdfError::Runtime`] / [`XpdfError::ProcessFailed`] if the tool
    ///   fails or times out
    ///
    /// On any error after the tool has started, images it wrote are removed.
    pub fn extract_images(
        &self,
        path: impl AsRef<Path>,
        page_start: Option<u32>,
        page_end: Option<u32>,
    ) -> Result<Vec<PathBuf>, XpdfError> {
        let path = path.as_ref();
        ensure_file(path)?;

        let prefix = self.reserve_prefix()?;
        let args = self.build_arguments(path, page_start, page_end, &prefix);

        let guard = OutputGuard::new(&prefix);
        self.tool.invoke(&args, "Unable to extract images")?;
        let images = collect_outputs(&prefix).map_err(|source| XpdfError::Io {
            operation: "Unable to collect extracted images",
            source,
        })?;
        guard.keep();
        info!(
            "Extracted {} {} image(s) from {}",
            images.len(),
            self.format,
            path.display()
        );
        Ok(images)
    }

    /// Create a unique placeholder file, then remove it so only the tool's
    /// own outputs carry its name.
    fn reserve_prefix(&self) -> Result<PathBuf, XpdfError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX_STEM);
        let placeholder = match &self.output_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|source| XpdfError::Io {
            operation: "Unable to reserve an output prefix",
            source,
        })?;

        let prefix = placeholder.path().to_path_buf();
        placeholder.close().map_err(|source| XpdfError::Io {
            operation: "Unable to release the output prefix placeholder",
            source,
        })?;
        debug!("Reserved output prefix {}", prefix.display());
        Ok(prefix)
    }
}

// ── Output discovery ─────────────────────────────────────────────────────

/// Files next to `prefix` whose names start with its file name, in page order.
pub fn collect_outputs(prefix: &Path) -> std::io::Result<Vec<PathBuf>> {
    let (dir, stem) = split_prefix(prefix);
    let mut found: Vec<(Option<u64>, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(stem.as_str()) && entry.file_type()?.is_file() {
            found.push((page_number(name), entry.path()));
        }
    }

    // Unnumbered names sort last.
    found.sort_by(|(a, pa), (b, pb)| {
        a.is_none()
            .cmp(&b.is_none())
            .then(a.cmp(b))
            .then_with(|| pa.cmp(pb))
    });
    Ok(found.into_iter().map(|(_, p)| p).collect())
}

/// Page number embedded in a produced file name, e.g. `xpdfAb12Cd-07.png` → 7.
pub fn page_number(file_name: &str) -> Option<u64> {
    PAGE_SUFFIX_RE
        .captures(file_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn split_prefix(prefix: &Path) -> (&Path, String) {
    let dir = match prefix.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let stem = prefix
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, stem)
}

/// Removes every file carrying `prefix` when dropped, unless kept.
struct OutputGuard<'a> {
    prefix: &'a Path,
    armed: bool,
}

impl<'a> OutputGuard<'a> {
    fn new(prefix: &'a Path) -> Self {
        Self {
            prefix,
            armed: true,
        }
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for OutputGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            discard_partial_output(self.prefix);
        }
    }
}

fn discard_partial_output(prefix: &Path) {
    let Ok(partial) = collect_outputs(prefix) else {
        return;
    };
    for file in partial {
        if let Err(e) = std::fs::remove_file(&file) {
            warn!("Could not remove partial output {}: {}", file.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, RunError};
    use crate::runner::CommandOutput;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records arguments and writes `pages` fake images next to the prefix.
    #[derive(Clone, Default)]
    struct FakePdftoppm {
        calls: Arc<Mutex<Vec<Vec<OsString>>>>,
        pages: u32,
        exit_code: i32,
    }

    impl CommandRunner for FakePdftoppm {
        fn run(
            &self,
            _binary: &Path,
            args: &[OsString],
            _timeout: Duration,
        ) -> Result<CommandOutput, RunError> {
            self.calls.lock().unwrap().push(args.to_vec());
            let prefix = PathBuf::from(args.last().unwrap());
            let ext = if args.iter().any(|a| a == "-png") { "png" } else { "ppm" };
            for page in 1..=self.pages {
                let name = format!("{}-{page:02}.{ext}", prefix.display());
                std::fs::write(name, b"P6\n1 1\n255\n\0\0\0").unwrap();
            }
            Ok(CommandOutput {
                exit_code: Some(self.exit_code),
                ..Default::default()
            })
        }
    }

    fn extractor(runner: FakePdftoppm) -> RasterExtractor {
        let config = ExtractorConfig::builder("/usr/bin/pdftoppm").build().unwrap();
        RasterExtractor::from_config(config, Box::new(runner))
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn format_names_map_to_flags() {
        let cases = [
            ("ppm", None),
            ("PPM", None),
            ("jpeg", Some("-jpeg")),
            ("JPG", Some("-jpeg")),
            ("jpegcmyk", Some("-jpegcmyk")),
            ("Png", Some("-png")),
            ("tiff", Some("-tiff")),
        ];
        for (name, flag) in cases {
            let format: OutputFormat = name.parse().unwrap();
            assert_eq!(format.flag(), flag, "{name}");
        }
    }

    #[test]
    fn unknown_format_is_invalid_argument() {
        let mut e = extractor(FakePdftoppm::default());
        for name in ["gif", "", "tif", "jpeg2000"] {
            let err = e.set_output_format(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{name}");
        }
        assert_eq!(e.output_format(), OutputFormat::Ppm);
    }

    #[test]
    fn resolution_and_max_dimension_are_exclusive() {
        let mut e = extractor(FakePdftoppm::default());
        e.set_resolution(300);
        assert_eq!((e.resolution(), e.max_dimension()), (300, 0));
        e.set_max_dimension(2000);
        assert_eq!((e.resolution(), e.max_dimension()), (0, 2000));
        e.set_resolution(72);
        assert_eq!(e.sizing(), SizingMode::Resolution(72));
        e.set_resolution(0);
        assert_eq!(e.sizing(), SizingMode::Unset);
    }

    #[test]
    fn page_quantity_validation() {
        let mut e = extractor(FakePdftoppm::default());
        assert!(e.set_page_quantity(0).is_err());
        assert!(e.set_page_quantity(-3).is_err());
        assert_eq!(e.page_quantity(), None);
        e.set_page_quantity(2).unwrap();
        assert_eq!(e.page_quantity(), Some(2));
    }

    #[test]
    fn arguments_follow_fixed_order() {
        let mut e = extractor(FakePdftoppm::default());
        e.set_output_format("jpeg").unwrap().set_resolution(300);
        e.set_page_quantity(2).unwrap();
        let args = e.build_arguments(
            Path::new("in.pdf"),
            Some(3),
            None,
            Path::new("/tmp/xpdfABC"),
        );
        assert_eq!(
            strings(&args),
            ["-f", "3", "-l", "5", "-jpeg", "-r", "300", "in.pdf", "/tmp/xpdfABC"]
        );
    }

    #[test]
    fn scale_to_and_default_format() {
        let mut e = extractor(FakePdftoppm::default());
        e.set_resolution(300).set_max_dimension(2000);
        let args = e.build_arguments(Path::new("in.pdf"), Some(1), Some(1), Path::new("p"));
        assert_eq!(
            strings(&args),
            ["-f", "1", "-l", "1", "-scale-to", "2000", "in.pdf", "p"]
        );
    }

    #[test]
    fn missing_source_does_not_spawn() {
        let runner = FakePdftoppm::default();
        let e = extractor(runner.clone());
        let err = e.extract_images("/path/to/nowhere", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn collects_outputs_in_page_order() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let runner = FakePdftoppm {
            pages: 12,
            ..Default::default()
        };
        let mut e = extractor(runner.clone());
        e.set_output_directory(dir.path());

        let images = e.extract_images(&pdf, None, None).unwrap();
        assert_eq!(images.len(), 12);
        let pages: Vec<_> = images
            .iter()
            .map(|p| page_number(p.file_name().unwrap().to_str().unwrap()).unwrap())
            .collect();
        assert_eq!(pages, (1..=12).collect::<Vec<_>>());
        assert!(images.iter().all(|p| p.extension().unwrap() == "ppm"));

        // The placeholder itself must not be reported.
        let call = &runner.calls.lock().unwrap()[0];
        let prefix = PathBuf::from(call.last().unwrap());
        assert!(!prefix.exists());
        assert!(prefix.starts_with(dir.path()));
    }

    #[test]
    fn failed_run_removes_partial_images() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let mut e = extractor(FakePdftoppm {
            pages: 2,
            exit_code: 99,
            ..Default::default()
        });
        e.set_output_directory(dir.path());

        let err = e.extract_images(&pdf, Some(1), None).unwrap_err();
        assert_eq!(err.exit_code(), Some(99));
        let left: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(left.len(), 1, "only the source PDF should remain");
    }

    #[test]
    fn output_guard_discards_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("xpdfAbC123");
        let write_pages = || {
            for page in 1..=3 {
                std::fs::write(format!("{}-{page}.png", prefix.display()), b"").unwrap();
            }
        };

        write_pages();
        {
            let _guard = OutputGuard::new(&prefix);
            // Dropped armed, as on an early `?` return after the run.
        }
        assert!(collect_outputs(&prefix).unwrap().is_empty());

        write_pages();
        OutputGuard::new(&prefix).keep();
        assert_eq!(collect_outputs(&prefix).unwrap().len(), 3);
    }

    #[test]
    fn page_number_parsing() {
        assert_eq!(page_number("xpdfa1B2c3-1.ppm"), Some(1));
        assert_eq!(page_number("xpdfa1B2c3-012.png"), Some(12));
        assert_eq!(page_number("xpdfa1B2c3"), None);
        assert_eq!(page_number("xpdf-a1-b.png"), None);
    }

    #[test]
    fn output_format_extensions() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::JpegCmyk.extension(), "jpg");
        assert_eq!(OutputFormat::Tiff.extension(), "tif");
        assert_eq!(OutputFormat::default().extension(), "ppm");
    }
}
