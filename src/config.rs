//! Configuration types shared by both extractors.
//!
//! Two layers:
//!
//! * [`Configuration`]: a loose key/value options map (`"pdftoppm.binaries"`,
//!   `"timeout"`, ...). This is what callers hand to the `create` factories;
//!   it can come from a `HashMap`, a list of pairs, or a JSON document.
//! * [`ExtractorConfig`]: the resolved, immutable result: an absolute binary
//!   path, a timeout and the tracing span invocations are logged under.
//!
//! [`ExtractorConfig::resolve`] turns the first into the second. It is the
//! one place where defaults are applied and the binary is located, so the
//! raster and text factories behave identically.

use crate::error::XpdfError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, Span};
use xpdf_locate::BinaryLocator;

/// Timeout applied when the configuration has no `timeout` key.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Key holding the timeout in seconds.
pub const TIMEOUT_KEY: &str = "timeout";

/// Loose options map accepted by the `create` factories.
///
/// Values are JSON values so numbers, strings and booleans can be mixed
/// freely, the way configuration files usually look.
///
/// # Example
/// ```rust
/// use xpdf_driver::Configuration;
///
/// let mut config = Configuration::from([("pdftoppm.binaries", "/opt/poppler/bin/pdftoppm")]);
/// config.set("timeout", 42);
/// assert_eq!(config.get_u64("timeout"), Some(42));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: Map<String, Value>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value of `key`, or `default` when absent or not a string.
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }

    /// Non-negative integer value of `key`. Numeric strings are accepted.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.values.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Parse a JSON object such as `{"pdftotext.binaries": "pdftotext", "timeout": 30}`.
    pub fn from_json(json: &str) -> Result<Self, XpdfError> {
        serde_json::from_str(json)
            .map_err(|e| XpdfError::InvalidArgument(format!("Invalid configuration JSON: {e}")))
    }
}

impl<K, V> FromIterator<(K, V)> for Configuration
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Configuration
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> From<HashMap<K, V>> for Configuration
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(map: HashMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Map<String, Value>> for Configuration {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

// ── Resolved configuration ───────────────────────────────────────────────

/// Resolved configuration of one extractor instance.
///
/// Built once by the factory and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Absolute path of the tool binary.
    binary: PathBuf,

    /// Maximum wall-clock time for a single invocation. Default: 60 s.
    timeout: Duration,

    /// Span entered around every invocation; `Span::none()` if the caller
    /// did not supply one.
    span: Span,
}

impl ExtractorConfig {
    /// Create a new builder for an already-located binary.
    pub fn builder(binary: impl Into<PathBuf>) -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            binary: binary.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            span: Span::none(),
        }
    }

    /// Resolve a loose [`Configuration`] for the tool named `tool`.
    ///
    /// The binary is read from `"<tool>.binaries"` (default: `tool` itself,
    /// resolved on `PATH`) and located eagerly, so a missing tool fails here
    /// rather than on first use.
    pub fn resolve(
        configuration: &Configuration,
        tool: &str,
        span: Option<Span>,
        locator: &dyn BinaryLocator,
    ) -> Result<Self, XpdfError> {
        let key = format!("{tool}.binaries");
        let requested = configuration.get_str(&key, tool);

        let timeout_secs = if configuration.has(TIMEOUT_KEY) {
            configuration.get_u64(TIMEOUT_KEY).ok_or_else(|| {
                XpdfError::InvalidArgument(format!(
                    "timeout must be a non-negative number of seconds, got {}",
                    configuration
                        .get(TIMEOUT_KEY)
                        .map(Value::to_string)
                        .unwrap_or_default()
                ))
            })?
        } else {
            DEFAULT_TIMEOUT_SECS
        };

        let binary = locator
            .locate(requested)
            .map_err(|source| XpdfError::BinaryNotFound {
                binary: tool.to_string(),
                source,
            })?;

        debug!(
            "Resolved {} → {} (timeout {}s)",
            tool,
            binary.display(),
            timeout_secs
        );

        let mut builder = Self::builder(binary).timeout_secs(timeout_secs);
        if let Some(span) = span {
            builder = builder.span(span);
        }
        builder.build()
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The logger handle supplied at creation.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    binary: PathBuf,
    timeout_secs: u64,
    span: Span,
}

impl ExtractorConfigBuilder {
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, XpdfError> {
        if self.timeout_secs == 0 {
            return Err(XpdfError::InvalidArgument(
                "timeout must be at least 1 second".into(),
            ));
        }
        if self.binary.as_os_str().is_empty() {
            return Err(XpdfError::InvalidArgument("binary path is empty".into()));
        }
        Ok(ExtractorConfig {
            binary: self.binary,
            timeout: Duration::from_secs(self.timeout_secs),
            span: self.span,
        })
    }
}
