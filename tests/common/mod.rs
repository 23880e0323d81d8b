//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use xpdf_driver::{BinaryLocator, CommandOutput, CommandRunner, LocateError, RunError};

/// Page size used by [`write_pdf`]: 8 × 10 in, so whole-number DPIs give
/// whole-number pixel sizes.
pub const PAGE_WIDTH_PT: u32 = 576;
pub const PAGE_HEIGHT_PT: u32 = 720;

/// Write a minimal PDF with one Helvetica text line per page.
///
/// Text may use any Latin-1 character; it is stored WinAnsi-encoded.
///
/// Offsets in the cross-reference table are computed exactly so strict
/// readers accept the file without repair.
pub fn write_pdf(path: &Path, pages: &[&str]) {
    let n = pages.len();
    let font_id = 3 + 2 * n;
    let mut objects: Vec<String> = Vec::new();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + i)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));
    for i in 0..n {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH_PT} {PAGE_HEIGHT_PT}] \
             /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {} 0 R >>",
            3 + n + i
        ));
    }
    for text in pages {
        let content = format!("BT /F1 12 Tf 72 650 Td ({}) Tj ET", pdf_string(text));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }
    objects.push(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    );

    let mut out: Vec<u8> = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );

    std::fs::write(path, out).unwrap();
}

/// Body of a PDF literal string: printable ASCII as-is, everything else
/// (and the delimiters) as octal escapes of the Latin-1 code point.
fn pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let code = u32::from(c);
        assert!(code <= 0xFF, "{c:?} is outside Latin-1");
        if (0x20..0x7F).contains(&code) && !matches!(c, '(' | ')' | '\\') {
            out.push(c);
        } else {
            out.push_str(&format!("\\{code:03o}"));
        }
    }
    out
}

/// A placeholder source document; only its existence matters to fakes.
pub fn touch_pdf(dir: &Path) -> PathBuf {
    let p = dir.join("input.pdf");
    std::fs::write(&p, b"%PDF-1.4\n").unwrap();
    p
}

/// Locator that accepts any name and maps it under `/opt/poppler/bin`.
pub struct FakeLocator;

impl BinaryLocator for FakeLocator {
    fn locate(&self, name: &str) -> Result<PathBuf, LocateError> {
        if name.contains("nowhere") {
            return Err(LocateError::NoSuchFile {
                path: PathBuf::from(name),
            });
        }
        Ok(Path::new("/opt/poppler/bin").join(name))
    }
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub binary: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
}

/// Runner that records every call and answers with a canned output.
#[derive(Clone, Default)]
pub struct Recorder {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub stdout: Vec<u8>,
    pub exit_code: i32,
    /// Files (suffixes appended to the last argument) to create on each run.
    pub outputs: Vec<String>,
    pub fail_with_timeout: bool,
}

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for Recorder {
    fn run(
        &self,
        binary: &Path,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<CommandOutput, RunError> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.calls.lock().unwrap().push(Call {
            binary: binary.to_path_buf(),
            args: args.clone(),
            timeout,
        });

        if self.fail_with_timeout {
            return Err(RunError::Timeout {
                binary: binary.to_path_buf(),
                timeout,
            });
        }

        if let Some(prefix) = args.last() {
            for suffix in &self.outputs {
                std::fs::write(format!("{prefix}{suffix}"), b"").unwrap();
            }
        }

        Ok(CommandOutput {
            stdout: self.stdout.clone(),
            stderr: Vec::new(),
            exit_code: Some(self.exit_code),
        })
    }
}
