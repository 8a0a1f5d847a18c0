//! Subprocess execution with live output forwarding
//!
//! [`CommandRunner`] is the seam between sync logic and the external `git`
//! executable. [`SystemRunner`] spawns real processes; tests substitute a
//! scripted runner.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, warn};

use crate::error::{ProcessFailure, SyncError};
use crate::status::{OutputStream, StatusSink};

/// One external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Kill the process and fail with [`SyncError::Timeout`] after this long
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
            timeout: None,
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    /// Shell-like rendering for messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A process that ran to a successful exit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprocessOutcome {
    pub exit_code: i32,
    /// Always empty on success; stderr only matters when something failed
    pub stderr_lines: Vec<String>,
}

impl SubprocessOutcome {
    pub fn success() -> Self {
        Self {
            exit_code: 0,
            stderr_lines: Vec::new(),
        }
    }
}

/// Runs external commands on behalf of the sync engine
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. Non-zero exits and signals become
    /// [`SyncError::SubprocessFailed`].
    async fn run(
        &self,
        invocation: &Invocation,
        sink: &dyn StatusSink,
    ) -> Result<SubprocessOutcome, SyncError>;
}

/// Spawns real processes with tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        sink: &dyn StatusSink,
    ) -> Result<SubprocessOutcome, SyncError> {
        let command_line = invocation.display();
        debug!("Running: {}", command_line);

        let mut command = AsyncCommand::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| SyncError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let completion = async {
            let (_, stderr_lines, status) = tokio::join!(
                forward_lines(stdout, OutputStream::Stdout, sink, false),
                forward_lines(stderr, OutputStream::Stderr, sink, true),
                child.wait(),
            );
            status.map(|status| (status, stderr_lines))
        };

        let waited = match invocation.timeout {
            Some(limit) => {
                let result = tokio::time::timeout(limit, completion).await;
                match result {
                    Ok(waited) => waited,
                    Err(_) => {
                        warn!("{} timed out after {:?}, killing it", command_line, limit);
                        if let Err(e) = child.kill().await {
                            warn!("Failed to kill {}: {}", command_line, e);
                        }
                        return Err(SyncError::Timeout {
                            command: command_line,
                            limit,
                        });
                    }
                }
            }
            None => completion.await,
        };

        let (status, stderr_lines) = waited.map_err(|source| SyncError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        if status.success() {
            debug!("{} exited with 0", command_line);
            return Ok(SubprocessOutcome::success());
        }

        let (exit_code, signal) = exit_details(status);
        debug!("{} failed with exit code {}", command_line, exit_code);
        Err(ProcessFailure {
            command: command_line,
            exit_code,
            signal,
            stderr_lines,
        }
        .into())
    }
}

/// Forward a stream to the sink line by line; optionally keep the lines.
/// Output is decoded lossily since git may emit non-UTF-8 paths.
async fn forward_lines<R>(
    stream: Option<R>,
    kind: OutputStream,
    sink: &dyn StatusSink,
    keep: bool,
) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let Some(stream) = stream else {
        return kept;
    };

    let mut reader = BufReader::new(stream);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                let line = line.trim_end_matches(['\n', '\r']);
                sink.output(kind, line);
                if keep {
                    kept.push(line.to_string());
                }
            }
            Err(e) => {
                warn!("Stopped reading {:?}: {}", kind, e);
                break;
            }
        }
    }
    kept
}

#[cfg(unix)]
fn exit_details(status: ExitStatus) -> (i32, Option<String>) {
    use nix::sys::signal::Signal;
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => (code, None),
        (None, Some(signo)) => {
            let name = Signal::try_from(signo)
                .map(|signal| signal.as_str().to_string())
                .unwrap_or_else(|_| format!("signal {}", signo));
            (128 + signo, Some(name))
        }
        (None, None) => (-1, None),
    }
}

#[cfg(not(unix))]
fn exit_details(status: ExitStatus) -> (i32, Option<String>) {
    (status.code().unwrap_or(-1), None)
}
