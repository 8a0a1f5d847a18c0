//! Sync Engine - clone a remote into the workspace, or pull it if already there
//!
//! One call to [`SyncEngine::sync`] walks a single reference through
//! parse → protocol check → resolve → classify → clone/pull. Clone failures
//! are fatal. Pull failures are reported and downgraded to a warning, since a
//! stale checkout is still usable.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::SyncError;
use crate::process::{CommandRunner, Invocation, SystemRunner};
use crate::remote::{Protocol, RepoRef};
use crate::status::StatusSink;
use crate::workspace::{self, Destination, WorkspaceTarget};

/// Which branch a sync took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Cloned,
    Pulled,
}

/// Result of a completed sync
#[derive(Debug)]
pub struct SyncResult {
    pub target_path: PathBuf,
    pub name: String,
    /// `/{source}/{organization}/{name}`
    pub relative_label: String,
    pub action: SyncAction,
    /// Set when a pull failed and the existing checkout was kept as is
    pub warning: Option<SyncError>,
}

/// Settings for the git subprocesses a sync runs
#[derive(Debug, Clone)]
pub struct GitSettings {
    pub executable: String,
    pub timeout: Option<Duration>,
    pub cleanup_on_error: bool,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            executable: "git".to_string(),
            timeout: None,
            cleanup_on_error: false,
        }
    }
}

/// Drives clone-or-pull for references against a fixed workspace root
pub struct SyncEngine<R = SystemRunner> {
    workspace: PathBuf,
    git: GitSettings,
    runner: R,
}

impl SyncEngine<SystemRunner> {
    /// Engine running real git processes, configured from `config`
    pub fn from_config(config: &Config) -> Self {
        let git = GitSettings {
            executable: config.git.executable.clone(),
            timeout: config.git_timeout(),
            cleanup_on_error: config.git.cleanup_on_error,
        };
        Self::new(config.workspace_path(), git, SystemRunner)
    }
}

impl<R: CommandRunner> SyncEngine<R> {
    pub fn new(workspace: impl Into<PathBuf>, git: GitSettings, runner: R) -> Self {
        Self {
            workspace: workspace.into(),
            git,
            runner,
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Parse a reference, enforce the ssh-only policy and compute its
    /// checkout path. Nothing on disk is touched.
    pub fn locate(&self, reference: &str) -> Result<(RepoRef, WorkspaceTarget), SyncError> {
        let repo = RepoRef::parse(reference)?;
        debug!("Parsed {} as {:?}", reference, repo);

        if repo.protocol != Protocol::Ssh {
            return Err(SyncError::UnsupportedProtocol {
                protocol: repo.protocol,
            });
        }

        let target = workspace::resolve(&self.workspace, &repo)?;
        Ok((repo, target))
    }

    /// Clone `reference` into the workspace, or pull it if a checkout exists.
    /// Every fatal error is reported to `sink` before it is returned.
    pub async fn sync(
        &self,
        reference: &str,
        shallow: bool,
        sink: &dyn StatusSink,
    ) -> Result<SyncResult, SyncError> {
        match self.try_sync(reference, shallow, sink).await {
            Ok(result) => Ok(result),
            Err(e) => {
                sink.fail(&e.report());
                Err(e)
            }
        }
    }

    async fn try_sync(
        &self,
        reference: &str,
        shallow: bool,
        sink: &dyn StatusSink,
    ) -> Result<SyncResult, SyncError> {
        let reference = reference.trim();
        let (repo, target) = self.locate(reference)?;
        let destination = workspace::classify(&target.absolute_path)?;
        debug!("{} is {:?}", target.absolute_path.display(), destination);

        let (action, warning) = if destination.is_clonable() {
            sink.info(&format!("Cloning in {}", target.relative_label));
            self.clone_into(reference, &target, destination, shallow, sink)
                .await?;
            sink.succeed("Cloned");
            (SyncAction::Cloned, None)
        } else {
            sink.info(&format!("{} already exists, pulling repo", target.relative_label));
            let warning = match self.pull(&target, sink).await {
                Ok(()) => {
                    sink.succeed("Pulled");
                    None
                }
                Err(e) => {
                    warn!("Pull failed for {}: {}", target.absolute_path.display(), e);
                    sink.fail(&e.report());
                    Some(e)
                }
            };
            (SyncAction::Pulled, warning)
        };

        Ok(SyncResult {
            target_path: target.absolute_path,
            name: repo.name,
            relative_label: target.relative_label,
            action,
            warning,
        })
    }

    async fn clone_into(
        &self,
        remote: &str,
        target: &WorkspaceTarget,
        destination: Destination,
        shallow: bool,
        sink: &dyn StatusSink,
    ) -> Result<(), SyncError> {
        let path = &target.absolute_path;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SyncError::Filesystem {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let invocation = Invocation::new(&self.git.executable, clone_args(remote, path, shallow))
            .timeout(self.git.timeout);

        sink.info(&format!("Executing: {}", invocation.display()));
        sink.start("Cloning...");
        info!("Cloning {} -> {}", remote, path.display());

        match self.runner.run(&invocation, sink).await {
            Ok(_) => Ok(()),
            Err(SyncError::SubprocessFailed(failure)) => {
                self.cleanup_failed_clone(path, destination).await;
                Err(SyncError::CloneFailed {
                    remote: remote.to_string(),
                    source: failure,
                })
            }
            Err(e) => {
                self.cleanup_failed_clone(path, destination).await;
                Err(e)
            }
        }
    }

    /// Pulls are always depth-limited, whether or not the checkout was
    /// cloned shallow
    async fn pull(&self, target: &WorkspaceTarget, sink: &dyn StatusSink) -> Result<(), SyncError> {
        let invocation = Invocation::new(&self.git.executable, pull_args())
            .current_dir(&target.absolute_path)
            .timeout(self.git.timeout);

        sink.info(&format!("Executing: {}", invocation.display()));
        sink.start("Pulling...");
        info!("Pulling {}", target.absolute_path.display());

        self.runner.run(&invocation, sink).await.map(|_| ())
    }

    /// Put the destination back the way classification found it
    async fn cleanup_failed_clone(&self, path: &Path, destination: Destination) {
        if !self.git.cleanup_on_error {
            return;
        }

        if let Err(e) = tokio::fs::remove_dir_all(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to clean up {}: {}", path.display(), e);
                return;
            }
        }

        if destination == Destination::Empty {
            if let Err(e) = tokio::fs::create_dir(path).await {
                warn!("Failed to recreate {}: {}", path.display(), e);
            }
        }
        debug!("Cleaned up failed clone at {}", path.display());
    }
}

/// `clone [--depth 1] -- <remote> <target>`
pub fn clone_args(remote: &str, target: &Path, shallow: bool) -> Vec<String> {
    let mut args = vec!["clone".to_string()];
    if shallow {
        args.push("--depth".to_string());
        args.push("1".to_string());
    }
    args.push("--".to_string());
    args.push(remote.to_string());
    args.push(target.to_string_lossy().into_owned());
    args
}

/// `pull --depth 1`
pub fn pull_args() -> Vec<String> {
    vec!["pull".to_string(), "--depth".to_string(), "1".to_string()]
}
