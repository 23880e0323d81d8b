//! Error types for the xpdf-driver library.
//!
//! Every failure surfaces as one [`XpdfError`]. Callers that only care about
//! the broad category (bad input, missing tool, failed run, timeout) match on
//! [`XpdfError::kind`] instead of the individual variants.
//!
//! Process-level failures reported by a [`crate::runner::CommandRunner`] are
//! described by [`RunError`] and wrapped as the `source` of
//! [`XpdfError::Runtime`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use xpdf_locate::LocateError;

/// Broad classification of an [`XpdfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A caller-supplied value violates a precondition. No process was spawned.
    InvalidArgument,
    /// The configured tool binary could not be located.
    BinaryNotFound,
    /// The tool was invoked but failed.
    Runtime,
    /// The tool exceeded the configured timeout and was killed.
    Timeout,
}

/// All errors returned by the xpdf-driver library.
#[derive(Debug, Error)]
pub enum XpdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// An option value was rejected by a setter or the config builder.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The source document does not exist or is not a regular file.
    #[error("{path:?} is not a valid file")]
    InvalidFile { path: PathBuf },

    // ── Setup errors ──────────────────────────────────────────────────────
    /// The configured binary could not be resolved to an executable.
    #[error("Unable to find {binary}: {source}")]
    BinaryNotFound {
        binary: String,
        #[source]
        source: LocateError,
    },

    // ── Execution errors ──────────────────────────────────────────────────
    /// The runner could not complete the invocation (launch failure, timeout).
    #[error("{operation}: {source}")]
    Runtime {
        operation: &'static str,
        #[source]
        source: RunError,
    },

    /// The tool ran to completion but reported failure.
    #[error("{operation}: {binary:?} exited with {}{}", describe_code(*code), describe_stderr(stderr))]
    ProcessFailed {
        operation: &'static str,
        binary: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    /// Preparing or collecting output files failed.
    #[error("{operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl XpdfError {
    /// The broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            XpdfError::InvalidArgument(_) | XpdfError::InvalidFile { .. } => {
                ErrorKind::InvalidArgument
            }
            XpdfError::BinaryNotFound { .. } => ErrorKind::BinaryNotFound,
            XpdfError::Runtime {
                source: RunError::Timeout { .. },
                ..
            } => ErrorKind::Timeout,
            XpdfError::Runtime { .. } | XpdfError::ProcessFailed { .. } | XpdfError::Io { .. } => {
                ErrorKind::Runtime
            }
        }
    }

    /// Exit code of the failed process, when it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            XpdfError::ProcessFailed { code, .. } => *code,
            _ => None,
        }
    }

    /// `true` for both [`ErrorKind::Runtime`] and [`ErrorKind::Timeout`].
    pub fn is_runtime(&self) -> bool {
        matches!(self.kind(), ErrorKind::Runtime | ErrorKind::Timeout)
    }
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "no exit code (killed by signal)".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let s = stderr.trim();
    if s.is_empty() {
        String::new()
    } else {
        format!("\n{s}")
    }
}

/// Failure reported by a [`crate::runner::CommandRunner`].
#[derive(Debug, Error)]
pub enum RunError {
    /// The process could not be started.
    #[error("failed to launch {binary:?}: {source}")]
    Launch {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process did not finish in time and was killed.
    #[error("{binary:?} timed out after {}s", timeout.as_secs_f64())]
    Timeout { binary: PathBuf, timeout: Duration },

    /// Waiting on the process or reading its pipes failed.
    #[error("I/O error while running {binary:?}: {source}")]
    Io {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_file_display() {
        let e = XpdfError::InvalidFile {
            path: PathBuf::from("/path/to/nowhere"),
        };
        assert!(e.to_string().contains("/path/to/nowhere"));
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn timeout_is_distinguished() {
        let e = XpdfError::Runtime {
            operation: "Unable to extract text",
            source: RunError::Timeout {
                binary: PathBuf::from("/usr/bin/pdftotext"),
                timeout: Duration::from_secs(60),
            },
        };
        assert_eq!(e.kind(), ErrorKind::Timeout);
        assert!(e.is_runtime());
        assert!(e.to_string().contains("60s"), "got: {e}");
    }

    #[test]
    fn process_failed_display_with_stderr() {
        let e = XpdfError::ProcessFailed {
            operation: "Unable to extract images",
            binary: PathBuf::from("pdftoppm"),
            code: Some(99),
            stderr: "Syntax Error: Couldn't read xref table\n".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("code 99"), "got: {msg}");
        assert!(msg.contains("xref"), "got: {msg}");
        assert_eq!(e.exit_code(), Some(99));
        assert_eq!(e.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn process_killed_display() {
        let e = XpdfError::ProcessFailed {
            operation: "Unable to extract text",
            binary: PathBuf::from("pdftotext"),
            code: None,
            stderr: String::new(),
        };
        assert!(e.to_string().contains("signal"));
        assert_eq!(e.exit_code(), None);
    }

    #[test]
    fn binary_not_found_wraps_cause() {
        use std::error::Error as _;
        let e = XpdfError::BinaryNotFound {
            binary: "pdftoppm".into(),
            source: LocateError::NoSuchFile {
                path: PathBuf::from("/path/to/nowhere"),
            },
        };
        assert_eq!(e.kind(), ErrorKind::BinaryNotFound);
        assert!(e.source().is_some());
        assert!(e.to_string().starts_with("Unable to find pdftoppm"));
    }
}
