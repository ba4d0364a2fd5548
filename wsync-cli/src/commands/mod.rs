//! CLI command implementations

pub mod sync;
pub mod tag;

pub use sync::{SyncArgs, SyncRepoArgs};
pub use tag::TagArgs;

use std::path::Path;

use wsync_core::{Config, GitCli, RepoId};

/// The source repository: configured, or read from the checkout's `origin`
pub(crate) fn source_repository(
    config: &Config,
    git: &GitCli,
    source_dir: &Path,
) -> anyhow::Result<RepoId> {
    match &config.source.repository {
        Some(repository) => Ok(RepoId::parse(repository)?),
        None => Ok(git.origin_repository(source_dir)?),
    }
}
