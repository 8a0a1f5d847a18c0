//! gitspace - a local workspace that mirrors git remotes by URL
//!
//! `gitspace clone git@github.com:acme/widgets.git` lands the repository in
//! `<workspace>/github.com/acme/widgets`, cloning it the first time and
//! pulling it afterwards.
//!
//! ## Modules
//!
//! - [`remote`]: Remote reference parsing
//! - [`workspace`]: Path resolution, destination classification and checkout discovery
//! - [`process`]: Subprocess execution with live output
//! - [`sync`]: The clone-or-pull orchestrator
//! - [`status`]: Progress sinks
//! - [`config`]: Configuration management and parsing
//! - [`health`]: Diagnostics for `gitspace doctor`

pub mod config;
pub mod editor;
pub mod error;
pub mod health;
pub mod process;
pub mod remote;
pub mod status;
pub mod sync;
pub mod workspace;

pub use config::Config;
pub use error::{ProcessFailure, SyncError};
pub use health::HealthCheck;
pub use process::{CommandRunner, Invocation, SubprocessOutcome, SystemRunner};
pub use remote::{Protocol, RepoRef};
pub use status::{ConsoleSink, NoopSink, OutputStream, StatusSink};
pub use sync::{GitSettings, SyncAction, SyncEngine, SyncResult};
pub use workspace::{Destination, LocalRepo, WorkspaceTarget};
