//! Process execution: the [`CommandRunner`] seam and its default
//! implementation.
//!
//! Extractors never spawn processes themselves. They hold a
//! `Box<dyn CommandRunner>` so tests can substitute a recorder and callers can
//! plug in sandboxing, remote execution or a different timeout policy.
//!
//! [`ProcessRunner`] drives `tokio::process` on a current-thread runtime built
//! per call, so the public API stays blocking. On timeout the child is killed
//! and reaped before the error is returned.

use crate::error::RunError;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// `true` when the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stderr decoded lossily, for error messages.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Executes a binary with arguments and a timeout.
///
/// Implementations must not retry. A process that exits non-zero is still a
/// successful *run*: report it through [`CommandOutput::exit_code`] and let
/// the caller decide.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        binary: &Path,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<CommandOutput, RunError>;
}

impl fmt::Debug for dyn CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<dyn CommandRunner>")
    }
}

/// Runs the binary as a child process of the current process.
///
/// Safe to call from inside an async context: when a tokio runtime is
/// already active on this thread, the invocation moves to a scoped helper
/// thread with its own runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        binary: &Path,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<CommandOutput, RunError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return block_on_fresh_runtime(binary, args, timeout);
        }

        debug!("Inside a tokio runtime; running {} on a helper thread", binary.display());
        std::thread::scope(|scope| {
            scope
                .spawn(|| block_on_fresh_runtime(binary, args, timeout))
                .join()
                .unwrap_or_else(|_| {
                    Err(RunError::Io {
                        binary: binary.to_path_buf(),
                        source: io::Error::other("runner thread panicked"),
                    })
                })
        })
    }
}

fn block_on_fresh_runtime(
    binary: &Path,
    args: &[OsString],
    timeout: Duration,
) -> Result<CommandOutput, RunError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
        .map_err(|source| RunError::Io {
            binary: binary.to_path_buf(),
            source,
        })?;

    runtime.block_on(run_with_timeout(binary, args, timeout))
}

async fn run_with_timeout(
    binary: &Path,
    args: &[OsString],
    timeout: Duration,
) -> Result<CommandOutput, RunError> {
    let started = Instant::now();

    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RunError::Launch {
            binary: binary.to_path_buf(),
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let finished = tokio::time::timeout(timeout, async {
        tokio::try_join!(child.wait(), drain(stdout), drain(stderr))
    })
    .await;

    let (status, stdout, stderr) = match finished {
        Ok(result) => result.map_err(|source| RunError::Io {
            binary: binary.to_path_buf(),
            source,
        })?,
        Err(_) => {
            // Reap the child before returning so no output is written after.
            if let Err(e) = child.start_kill() {
                debug!("kill {} failed: {}", binary.display(), e);
            }
            if let Err(e) = child.wait().await {
                debug!("wait on killed {} failed: {}", binary.display(), e);
            }
            warn!(
                "{} exceeded {}s timeout; killed",
                binary.display(),
                timeout.as_secs()
            );
            return Err(RunError::Timeout {
                binary: binary.to_path_buf(),
                timeout,
            });
        }
    };

    debug!(
        "{} exited with {:?} in {}ms ({} bytes stdout)",
        binary.display(),
        status.code(),
        started.elapsed().as_millis(),
        stdout.len()
    );

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code: status.code(),
    })
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
