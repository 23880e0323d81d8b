//! # xpdf-locate
//!
//! Resolve a configured tool name (or path) to an executable on the host, the
//! way a shell would before running it.
//!
//! ## How it works
//!
//! [`SystemLocator::locate`] accepts either:
//!
//! 1. A path containing a separator (`/usr/bin/pdftoppm`, `./bin/pdftotext`):
//!    the file must exist and be executable. No `PATH` lookup is done.
//! 2. A bare name (`pdftoppm`): every directory of the search path is tried in
//!    order, appending the platform executable suffix where needed.
//!
//! The first hit is returned as an absolute path.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use xpdf_locate::{BinaryLocator, SystemLocator};
//!
//! let path = SystemLocator::default().locate("pdftoppm").expect("pdftoppm not installed");
//! println!("{}", path.display());
//! ```
//!
//! ## Platform support
//!
//! | OS      | Suffixes tried          | Executable check   |
//! |---------|-------------------------|--------------------|
//! | Unix    | none                    | any `x` mode bit   |
//! | Windows | `""`, `.exe`, `.bat`, `.cmd` | file exists   |

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned when a binary cannot be resolved.
#[derive(Error, Debug)]
pub enum LocateError {
    /// The name was empty or whitespace.
    #[error("Empty binary name")]
    EmptyName,

    /// An explicit path was given but nothing exists there.
    #[error("Binary '{path}' does not exist")]
    NoSuchFile { path: PathBuf },

    /// An explicit path exists but is a directory or lacks execute permission.
    #[error("Binary '{path}' is not an executable file")]
    NotExecutable { path: PathBuf },

    /// A bare name was not found in any search directory.
    #[error("Executable '{name}' not found in {searched} search path entries")]
    NotFound { name: String, searched: usize },

    /// Could not canonicalise the current directory for a relative path.
    #[error("Cannot resolve '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Locator trait ────────────────────────────────────────────────────────────

/// Resolves a binary name or path to an executable location.
pub trait BinaryLocator: Send + Sync {
    /// Return the absolute path of `name_or_path`, or why it cannot be used.
    fn locate(&self, name_or_path: &str) -> Result<PathBuf, LocateError>;
}

// ── Internal: platform metadata ──────────────────────────────────────────────

#[cfg(windows)]
const EXECUTABLE_SUFFIXES: &[&str] = &["", ".exe", ".bat", ".cmd"];
#[cfg(not(windows))]
const EXECUTABLE_SUFFIXES: &[&str] = &[""];

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ── System locator ───────────────────────────────────────────────────────────

/// Searches the process `PATH` (or an explicit list of directories).
#[derive(Debug, Clone, Default)]
pub struct SystemLocator {
    /// Overrides the `PATH` environment variable when set.
    search_path: Option<OsString>,
}

impl SystemLocator {
    /// A locator that searches `search_path` instead of `$PATH`.
    ///
    /// `search_path` uses the platform separator (`:` on Unix, `;` on Windows).
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        let raw = match &self.search_path {
            Some(p) => Some(p.clone()),
            None => std::env::var_os("PATH"),
        };
        raw.map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default()
    }

    fn locate_explicit(&self, path: &Path) -> Result<PathBuf, LocateError> {
        if !path.exists() {
            return Err(LocateError::NoSuchFile {
                path: path.to_path_buf(),
            });
        }
        if !is_executable(path) {
            return Err(LocateError::NotExecutable {
                path: path.to_path_buf(),
            });
        }
        absolute(path)
    }

    fn locate_on_path(&self, name: &str) -> Result<PathBuf, LocateError> {
        let dirs = self.search_dirs();
        for dir in &dirs {
            for suffix in EXECUTABLE_SUFFIXES {
                let candidate = dir.join(format!("{name}{suffix}"));
                if is_executable(&candidate) {
                    debug!("Resolved '{}' → {}", name, candidate.display());
                    return absolute(&candidate);
                }
            }
        }
        Err(LocateError::NotFound {
            name: name.to_string(),
            searched: dirs.len(),
        })
    }
}

impl BinaryLocator for SystemLocator {
    fn locate(&self, name_or_path: &str) -> Result<PathBuf, LocateError> {
        let trimmed = name_or_path.trim();
        if trimmed.is_empty() {
            return Err(LocateError::EmptyName);
        }

        let path = Path::new(trimmed);
        if path.components().count() > 1 || path.is_absolute() {
            self.locate_explicit(path)
        } else {
            self.locate_on_path(trimmed)
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, LocateError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|source| LocateError::Io {
            path: path.to_path_buf(),
            source,
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
