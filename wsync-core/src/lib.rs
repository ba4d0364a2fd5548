//! wsync core - propagate synced workflow files across a repository fleet
//!
//! This crate holds the sync protocol: the per-repository branch and pull
//! request lifecycle, the fleet runner, and the version tag policy of the
//! source repository. Code host access is abstracted behind [`CodeHost`] and
//! [`PullRequestApprover`].

pub mod config;
pub mod error;
pub mod files;
pub mod fleet;
pub mod git;
pub mod host;
pub mod orchestrator;
pub mod repo;
pub mod secrets;
pub mod state;
pub mod summary;
pub mod tag_policy;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigOverrides};
pub use error::{Error, Result};
pub use files::WorkflowFileSync;
pub use fleet::{FleetReport, FleetStatus, FleetSyncRunner};
pub use git::{GitCli, VersionControl, VersionTag, LAST_SYNCED_TAG};
pub use host::{CodeHost, NewPullRequest, PullRequestApprover, PullRequestRef, RunContext};
pub use orchestrator::{RepositorySyncOrchestrator, SyncOutcome, SyncPhase, SyncSettings};
pub use repo::RepoId;
pub use secrets::{Credentials, Secrets};
pub use tag_policy::{TagAction, TagDecision, VersionTagPolicy};
