//! Text extraction through `pdftotext`.
//!
//! The tool is told to write to `-` (stdout), so nothing touches the
//! filesystem: the captured stream is the result. It is returned byte-for-byte
//! (no trimming, no newline normalisation), so callers see exactly what the
//! tool produced, form feeds between pages included.

use crate::config::{Configuration, ExtractorConfig};
use crate::error::XpdfError;
use crate::pages::{self, PageRange};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::tool::{ensure_file, Tool};
use std::ffi::OsString;
use std::num::NonZeroU32;
use std::path::Path;
use tracing::{info, warn, Span};
use xpdf_locate::{BinaryLocator, SystemLocator};

/// Name of the text extractor binary and of its configuration key prefix.
pub const PDFTOTEXT: &str = "pdftotext";

/// Encoding requested when none is configured.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Extracts the text of PDF pages with `pdftotext`.
///
/// ```rust,no_run
/// use xpdf_driver::{Configuration, TextExtractor};
///
/// let mut pdftotext = TextExtractor::create(Configuration::new(), None)?;
/// pdftotext.set_page_quantity(1)?;
/// let first_two_pages = pdftotext.extract_text("paper.pdf", Some(1), None)?;
/// # Ok::<(), xpdf_driver::XpdfError>(())
/// ```
#[derive(Debug)]
pub struct TextExtractor {
    tool: Tool,
    page_quantity: Option<NonZeroU32>,
    output_encoding: String,
}

impl TextExtractor {
    /// Build an extractor from a loose configuration, locating `pdftotext`
    /// on the host and running it as a child process.
    ///
    /// Reads `"pdftotext.binaries"` (default `"pdftotext"`) and `"timeout"`
    /// (default 60).
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

    /// Like [`TextExtractor::create`] with injected collaborators.
    pub fn with_collaborators(
        configuration: impl Into<Configuration>,
        span: Option<Span>,
        locator: &dyn BinaryLocator,
        runner: Box<dyn CommandRunner>,
    ) -> Result<Self, XpdfError> {
        let tool = Tool::resolve(configuration.into(), PDFTOTEXT, span, locator, runner)?;
        Ok(Self::from_tool(tool))
    }

    pub fn from_config(config: ExtractorConfig, runner: Box<dyn CommandRunner>) -> Self {
        Self::from_tool(Tool::new(config, runner))
    }

    fn from_tool(tool: Tool) -> Self {
        Self {
            tool,
            page_quantity: None,
            output_encoding: DEFAULT_ENCODING.to_string(),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        self.tool.config()
    }

    pub fn set_page_quantity(&mut self, n: i64) -> Result<&mut Self, XpdfError> {
        self.page_quantity = Some(pages::page_quantity(n)?);
        Ok(self)
    }

    pub fn page_quantity(&self) -> Option<u32> {
        self.page_quantity.map(NonZeroU32::get)
    }

    /// Encoding passed to `-enc`. Not validated here: the tool decides which
    /// names it supports (`pdftotext -listenc`).
    pub fn set_output_encoding(&mut self, encoding: impl Into<String>) -> &mut Self {
        self.output_encoding = encoding.into();
        self
    }

    pub fn output_encoding(&self) -> &str {
        &self.output_encoding
    }

    /// The exact argument list passed to `pdftotext` for this request.
    pub fn build_arguments(
        &self,
        path: &Path,
        page_start: Option<u32>,
        page_end: Option<u32>,
    ) -> Vec<OsString> {
        let mut args = Vec::new();
        PageRange::new(page_start, page_end).push_args(self.page_quantity, &mut args);
        args.push("-enc".into());
        args.push(self.output_encoding.as_str().into());
        args.push(path.into());
        args.push("-".into());
        args
    }

    /// Extract the text of `path` as raw bytes in the configured encoding.
    pub fn extract_bytes(
        &self,
        path: impl AsRef<Path>,
        page_start: Option<u32>,
        page_end: Option<u32>,
    ) -> Result<Vec<u8>, XpdfError> {
        let path = path.as_ref();
        ensure_file(path)?;

        let args = self.build_arguments(path, page_start, page_end);
        let output = self.tool.invoke(&args, "Unable to extract text")?;
        info!(
            "Extracted {} bytes of {} text from {}",
            output.stdout.len(),
            self.output_encoding,
            path.display()
        );
        Ok(output.stdout)
    }

    /// Extract the text of `path`, unmodified.
    ///
    /// With the default UTF-8 encoding the result is exact. Output in other
    /// encodings that is not valid UTF-8 is decoded lossily; use
    /// [`TextExtractor::extract_bytes`] to get the raw bytes instead.
    ///
    /// # Errors
    /// - [`XpdfError::InvalidFile`] if `path` is not an existing file
    /// - [`XpdfError::Runtime`] / [`XpdfError::ProcessFailed`] if the tool
    ///   fails or times out
    pub fn extract_text(
        &self,
        path: impl AsRef<Path>,
        page_start: Option<u32>,
        page_end: Option<u32>,
    ) -> Result<String, XpdfError> {
        let bytes = self.extract_bytes(path, page_start, page_end)?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(
                    "{} output is not valid UTF-8; decoding lossily",
                    self.output_encoding
                );
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }
}
