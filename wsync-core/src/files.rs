//! Synced workflow files
//!
//! Only files directly inside the workflow directory whose names follow the
//! `synced_<name>.yml` / `synced_<name>.yaml` convention are ever deleted,
//! copied or rewritten. Everything else in the directory is left alone.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::git::VersionTag;
use crate::Result;

/// Workflow directory relative to a repository root
pub const WORKFLOW_DIR: &str = ".github/workflows";

const SYNCED_PREFIX: &str = "synced_";

/// Check whether a file name follows the synced-file convention
pub fn is_synced_file(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(SYNCED_PREFIX) else {
        return false;
    };

    [".yml", ".yaml"]
        .iter()
        .any(|ext| rest.strip_suffix(ext).is_some_and(|stem| !stem.is_empty()))
}

/// Pathspec narrowing `git diff` to synced-file candidates of `workflow_dir`
///
/// Git pathspec wildcards also match `/` and any extension, so results still
/// go through [`is_synced_path`].
pub fn synced_pathspec(workflow_dir: &str) -> String {
    format!("{}/{}*", workflow_dir.trim_end_matches('/'), SYNCED_PREFIX)
}

/// Check whether a repository-relative path is a synced file directly inside `workflow_dir`
pub fn is_synced_path(path: &str, workflow_dir: &str) -> bool {
    path.strip_prefix(workflow_dir.trim_end_matches('/'))
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.contains('/') && is_synced_file(name))
}

/// Synced files directly inside `dir`, sorted by name
///
/// A missing directory has no synced files.
pub fn synced_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_synced_file) {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

/// Replace every occurrence of the branch reference with the version tag
pub fn rewrite_references(contents: &str, reference_token: &str, version: &VersionTag) -> String {
    if reference_token.is_empty() {
        return contents.to_string();
    }
    contents.replace(reference_token, &format!("@{}", version))
}

/// Copies synced workflow files from the source checkout into a target
#[derive(Debug, Clone)]
pub struct WorkflowFileSync {
    source_dir: PathBuf,
    reference_token: String,
}

impl WorkflowFileSync {
    /// Create a sync reading from the source workflow directory
    pub fn new(source_dir: impl Into<PathBuf>, reference_token: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
            reference_token: reference_token.into(),
        }
    }

    /// Replace the synced files in `target_dir` with the source's
    ///
    /// Existing synced files are removed first so deletions in the source
    /// propagate. Returns the names of the files written.
    pub fn apply(&self, target_dir: &Path, version: &VersionTag) -> Result<Vec<String>> {
        std::fs::create_dir_all(target_dir)?;

        for stale in synced_files(target_dir)? {
            debug!(file = %stale.display(), "Removing synced file");
            std::fs::remove_file(&stale)?;
        }

        let mut written = Vec::new();
        for source in synced_files(&self.source_dir)? {
            let Some(name) = source.file_name() else {
                continue;
            };
            let contents = std::fs::read_to_string(&source)?;
            let rewritten = rewrite_references(&contents, &self.reference_token, version);
            std::fs::write(target_dir.join(name), rewritten)?;

            let name = name.to_string_lossy().into_owned();
            debug!(file = %name, version = %version, "Copied synced file");
            written.push(name);
        }

        Ok(written)
    }
}
