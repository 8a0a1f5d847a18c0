//! Error types for workspace synchronization

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::remote::Protocol;

/// Everything that can stop a sync from completing
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid repository reference `{input}`: {reason}")]
    InvalidRepoReference { input: String, reason: String },

    #[error("use ssh! (you tried to use {protocol})")]
    UnsupportedProtocol { protocol: Protocol },

    #[error("workspace path must be absolute: {}", .path.display())]
    InvalidBasePath { path: PathBuf },

    #[error(transparent)]
    SubprocessFailed(#[from] ProcessFailure),

    #[error("failed to clone {remote}")]
    CloneFailed {
        remote: String,
        #[source]
        source: ProcessFailure,
    },

    #[error("`{command}` timed out after {}s", .limit.as_secs())]
    Timeout { command: String, limit: Duration },

    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("filesystem error at {}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A subprocess that exited non-zero or was killed by a signal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{command}` failed: exit code {exit_code}{}", signal_suffix(.signal))]
pub struct ProcessFailure {
    pub command: String,
    pub exit_code: i32,
    /// Signal name when the process did not exit normally
    pub signal: Option<String>,
    pub stderr_lines: Vec<String>,
}

fn signal_suffix(signal: &Option<String>) -> String {
    match signal {
        Some(name) => format!(" (terminated by {})", name),
        None => String::new(),
    }
}

impl SyncError {
    /// Stderr captured from the failing subprocess, if any
    pub fn stderr_lines(&self) -> &[String] {
        match self {
            SyncError::SubprocessFailed(failure) | SyncError::CloneFailed { source: failure, .. } => {
                failure.stderr_lines.as_slice()
            }
            _ => &[],
        }
    }

    /// Human-readable summary including the subprocess diagnostics
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        if let SyncError::CloneFailed { source, .. } = self {
            message.push_str(&format!(": {}", source));
        }
        let stderr = self.stderr_lines();
        if !stderr.is_empty() {
            message.push('\n');
            message.push_str(stderr.join("\n").trim_end());
        }
        message
    }
}
