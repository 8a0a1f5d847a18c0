//! Workspace layout: where a remote lives on disk and what is there already

use path_clean::PathClean;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::SyncError;
use crate::remote::RepoRef;

/// Local location of a remote inside the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceTarget {
    pub base_path: PathBuf,
    /// `/{source}/{organization}/{name}`
    pub relative_label: String,
    pub absolute_path: PathBuf,
}

/// What currently occupies a target path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Missing,
    Empty,
    /// Has entries, or exists but is not a directory
    NonEmpty,
}

impl Destination {
    /// Whether a fresh clone may be written here
    pub fn is_clonable(self) -> bool {
        matches!(self, Destination::Missing | Destination::Empty)
    }
}

/// Map a parsed remote onto `base/{source}/{organization}/{name}`.
/// Pure string work; the filesystem is never consulted.
pub fn resolve(base: &Path, repo: &RepoRef) -> Result<WorkspaceTarget, SyncError> {
    if !base.is_absolute() {
        return Err(SyncError::InvalidBasePath {
            path: base.to_path_buf(),
        });
    }

    let base_path = base.to_path_buf().clean();
    let mut absolute_path = base_path.join(&repo.source);
    for segment in repo.organization.split('/') {
        absolute_path.push(segment);
    }
    absolute_path.push(&repo.name);

    Ok(WorkspaceTarget {
        base_path,
        relative_label: repo.relative_label(),
        absolute_path: absolute_path.clean(),
    })
}

/// Inspect a target path without modifying anything. Symlinks are not
/// followed: a link, dangling or not, is `NonEmpty`.
pub fn classify(path: &Path) -> Result<Destination, SyncError> {
    let filesystem_error = |source: io::Error| SyncError::Filesystem {
        path: path.to_path_buf(),
        source,
    };

    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Destination::Missing),
        Err(e) => return Err(filesystem_error(e)),
    };

    if !metadata.is_dir() {
        debug!("{} exists but is not a plain directory", path.display());
        return Ok(Destination::NonEmpty);
    }

    let mut entries = std::fs::read_dir(path).map_err(filesystem_error)?;
    match entries.next() {
        None => Ok(Destination::Empty),
        Some(Ok(_)) => Ok(Destination::NonEmpty),
        Some(Err(e)) => Err(filesystem_error(e)),
    }
}

/// A checkout found under the workspace root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalRepo {
    pub path: PathBuf,
    /// Path relative to the workspace root, e.g. `github.com/acme/widgets`
    pub label: String,
}

/// Find every git checkout below the workspace root. Checkouts are not
/// descended into, so submodules and vendored repos are not reported.
pub fn discover(base: &Path) -> Result<Vec<LocalRepo>, SyncError> {
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut repos = Vec::new();
    let mut walker = WalkDir::new(base).min_depth(1).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable workspace entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        if entry.path().join(".git").exists() {
            let label = entry
                .path()
                .strip_prefix(base)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            repos.push(LocalRepo {
                path: entry.path().to_path_buf(),
                label,
            });
            walker.skip_current_dir();
        }
    }

    Ok(repos)
}
