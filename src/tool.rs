//! The piece both extractors compose: a resolved binary plus the runner that
//! executes it.

use crate::config::{Configuration, ExtractorConfig};
use crate::error::XpdfError;
use crate::runner::{CommandOutput, CommandRunner};
use std::ffi::OsString;
use std::path::Path;
use tracing::{debug, info, Span};
use xpdf_locate::BinaryLocator;

#[derive(Debug)]
pub(crate) struct Tool {
    config: ExtractorConfig,
    runner: Box<dyn CommandRunner>,
}

impl Tool {
    pub(crate) fn new(config: ExtractorConfig, runner: Box<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub(crate) fn resolve(
        configuration: Configuration,
        name: &str,
        span: Option<Span>,
        locator: &dyn BinaryLocator,
        runner: Box<dyn CommandRunner>,
    ) -> Result<Self, XpdfError> {
        let config = ExtractorConfig::resolve(&configuration, name, span, locator)?;
        Ok(Self::new(config, runner))
    }

    pub(crate) fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run the binary once and require a zero exit status.
    pub(crate) fn invoke(
        &self,
        args: &[OsString],
        operation: &'static str,
    ) -> Result<CommandOutput, XpdfError> {
        let _entered = self.config.span().enter();
        let binary = self.config.binary();
        info!("Running {} {}", binary.display(), render_args(args));

        let output = self
            .runner
            .run(binary, args, self.config.timeout())
            .map_err(|source| XpdfError::Runtime { operation, source })?;

        if !output.success() {
            return Err(XpdfError::ProcessFailed {
                operation,
                binary: binary.to_path_buf(),
                code: output.exit_code,
                stderr: output.stderr_lossy(),
            });
        }

        debug!("{} succeeded", binary.display());
        Ok(output)
    }
}

/// Fail unless `path` names an existing regular file.
pub(crate) fn ensure_file(path: &Path) -> Result<(), XpdfError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(XpdfError::InvalidFile {
            path: path.to_path_buf(),
        })
    }
}

fn render_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
