//! Git operations for wsync
//!
//! Every operation takes the repository working directory explicitly; nothing
//! here reads or changes the process working directory.

mod cli;
mod tags;

pub use cli::GitCli;
pub use tags::{latest_version_tag, parse_ls_remote_tags, VersionTag, LAST_SYNCED_TAG};

use std::path::Path;

use crate::{RepoId, Result};

/// Local repository operations used by the sync and tagging flows
pub trait VersionControl: Send + Sync {
    /// Clone `repo` into `target_dir`, deleting any existing directory first
    fn clone_repo(&self, repo: &RepoId, target_dir: &Path) -> Result<()>;

    /// Point `origin` at `repo`, embedding credentials when available
    fn rewrite_origin(&self, workdir: &Path, repo: &RepoId) -> Result<()>;

    /// Current URL of `origin`
    fn origin_url(&self, workdir: &Path) -> Result<String>;

    /// Point `origin` at `url` as given
    fn set_origin_url(&self, workdir: &Path, url: &str) -> Result<()>;

    /// Paths differing between `reference` and the working tree, limited to
    /// `path_filter` (a path or glob). The reference must exist.
    fn files_changed_since(
        &self,
        workdir: &Path,
        reference: &str,
        path_filter: &str,
    ) -> Result<Vec<String>>;

    /// True iff there are no staged, unstaged or untracked changes
    fn working_tree_clean(&self, workdir: &Path) -> Result<bool>;

    /// Check whether a local branch exists
    fn local_branch_exists(&self, workdir: &Path, name: &str) -> Result<bool>;

    /// Force-delete a local branch
    fn delete_local_branch(&self, workdir: &Path, name: &str) -> Result<()>;

    /// Delete a branch on `origin`
    fn delete_remote_branch(&self, workdir: &Path, name: &str) -> Result<()>;

    /// Create and switch to a new branch
    fn checkout_new(&self, workdir: &Path, name: &str) -> Result<()>;

    /// Switch to an existing branch
    fn checkout_existing(&self, workdir: &Path, name: &str) -> Result<()>;

    /// Stage every change (including deletions) under `path`
    fn stage(&self, workdir: &Path, path: &str) -> Result<()>;

    /// Commit the index
    fn commit(&self, workdir: &Path, message: &str) -> Result<()>;

    /// Push a branch to `origin` and set it as upstream
    fn push_branch(&self, workdir: &Path, name: &str) -> Result<()>;

    /// Names of all tags on `origin`
    fn remote_tags(&self, workdir: &Path) -> Result<Vec<String>>;

    /// Create a tag at HEAD and push it. Fails if the tag already exists.
    fn add_tag(&self, workdir: &Path, name: &str) -> Result<()>;

    /// Force-update an existing tag to HEAD and force-push it
    fn move_tag(&self, workdir: &Path, name: &str) -> Result<()>;

    /// Check whether a tag exists on `origin`
    fn tag_exists_remotely(&self, workdir: &Path, name: &str) -> Result<bool> {
        Ok(self.remote_tags(workdir)?.iter().any(|tag| tag == name))
    }

    /// The highest `v<N>` tag on `origin`, or `None` if there is none yet
    fn latest_version_tag(&self, workdir: &Path) -> Result<Option<VersionTag>> {
        let tags = self.remote_tags(workdir)?;
        Ok(latest_version_tag(tags.iter().map(String::as_str)))
    }

    /// Create the tag if it does not exist on `origin`, move it otherwise
    fn add_or_move_tag(&self, workdir: &Path, name: &str) -> Result<()> {
        if self.tag_exists_remotely(workdir, name)? {
            self.move_tag(workdir, name)
        } else {
            self.add_tag(workdir, name)
        }
    }
}
