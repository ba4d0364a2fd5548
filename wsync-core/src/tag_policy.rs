//! Version tag policy
//!
//! Two decisions are made here, independently of each other:
//!
//! * what happens to the version tag: create `v1` when there is none, create
//!   the next major version when synced workflow files changed since the
//!   current one, and otherwise move the current tag to HEAD;
//! * whether the fleet needs syncing, judged only against the `last-synced`
//!   marker.
//!
//! A moved version tag therefore does not imply a fleet sync, and a fleet sync
//! can be needed even when the version tag only moves.

use std::fmt;
use std::path::Path;

use tracing::info;

use crate::files::{is_synced_path, synced_pathspec};
use crate::git::{VersionControl, VersionTag};
use crate::Result;

/// What to do with the version tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    /// No version tag exists yet
    Create(VersionTag),
    /// Synced files changed since `from`
    Increment { from: VersionTag, to: VersionTag },
    /// Nothing relevant changed, the tag follows HEAD
    Move(VersionTag),
}

impl TagAction {
    /// The tag that is current once the action is applied
    pub fn tag(&self) -> VersionTag {
        match self {
            TagAction::Create(tag) | TagAction::Move(tag) => *tag,
            TagAction::Increment { to, .. } => *to,
        }
    }

    /// Whether a new tag is created rather than an existing one moved
    pub fn creates_tag(&self) -> bool {
        !matches!(self, TagAction::Move(_))
    }
}

/// Why the fleet needs syncing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReason {
    /// The marker tag has never been created
    NeverSynced { marker: String },
    /// Files changed since the marker
    Changed { marker: String, files: Vec<String> },
}

impl fmt::Display for SyncReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncReason::NeverSynced { marker } => write!(f, "no `{}` tag exists yet", marker),
            SyncReason::Changed { marker, files } => write!(
                f,
                "`{}` were different since `{}`",
                files.join("`, `"),
                marker
            ),
        }
    }
}

/// Choose the version tag action
pub fn decide_tag_action(current: Option<VersionTag>, synced_changed: bool) -> TagAction {
    match current {
        None => TagAction::Create(VersionTag::first()),
        Some(from) if synced_changed => TagAction::Increment {
            from,
            to: from.next(),
        },
        Some(tag) => TagAction::Move(tag),
    }
}

/// Decide whether the fleet needs syncing
///
/// `changed` lists the files changed since the marker; it is ignored when
/// the marker does not exist.
pub fn decide_sync(marker: &str, marker_exists: bool, changed: Vec<String>) -> Option<SyncReason> {
    if !marker_exists {
        return Some(SyncReason::NeverSynced {
            marker: marker.to_string(),
        });
    }

    if changed.is_empty() {
        return None;
    }

    Some(SyncReason::Changed {
        marker: marker.to_string(),
        files: changed,
    })
}

/// Both decisions for one run of the source repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDecision {
    pub action: TagAction,
    pub sync_reason: Option<SyncReason>,
}

impl TagDecision {
    pub fn should_sync(&self) -> bool {
        self.sync_reason.is_some()
    }
}

/// Evaluates and applies the tag policy inside a source checkout
pub struct VersionTagPolicy<'a> {
    vcs: &'a dyn VersionControl,
    workdir: &'a Path,
    workflow_dir: String,
    repos_file: String,
    marker: String,
}

impl<'a> VersionTagPolicy<'a> {
    pub fn new(
        vcs: &'a dyn VersionControl,
        workdir: &'a Path,
        workflow_dir: impl Into<String>,
        repos_file: impl Into<String>,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            vcs,
            workdir,
            workflow_dir: workflow_dir.into(),
            repos_file: repos_file.into(),
            marker: marker.into(),
        }
    }

    /// Compute the decision without touching any tag
    pub fn evaluate(&self) -> Result<TagDecision> {
        let current = self.vcs.latest_version_tag(self.workdir)?;

        let synced_changed = match current {
            Some(tag) => !self.synced_changes_since(&tag.to_string())?.is_empty(),
            None => false,
        };
        let action = decide_tag_action(current, synced_changed);

        let marker_exists = self.vcs.tag_exists_remotely(self.workdir, &self.marker)?;
        let changed = if marker_exists {
            self.changed_since_marker()?
        } else {
            Vec::new()
        };
        let sync_reason = decide_sync(&self.marker, marker_exists, changed);

        Ok(TagDecision {
            action,
            sync_reason,
        })
    }

    /// Create or move the version tag
    pub fn apply(&self, action: &TagAction) -> Result<()> {
        match action {
            TagAction::Create(tag) | TagAction::Increment { to: tag, .. } => {
                info!(tag = %tag, "Creating version tag");
                self.vcs.add_tag(self.workdir, &tag.to_string())
            }
            TagAction::Move(tag) => {
                info!(tag = %tag, "Moving version tag to HEAD");
                self.vcs.move_tag(self.workdir, &tag.to_string())
            }
        }
    }

    /// Evaluate, then apply the tag action
    pub fn run(&self) -> Result<TagDecision> {
        let decision = self.evaluate()?;
        self.apply(&decision.action)?;
        Ok(decision)
    }

    fn changed_since_marker(&self) -> Result<Vec<String>> {
        let mut changed = self.synced_changes_since(&self.marker)?;

        for file in self
            .vcs
            .files_changed_since(self.workdir, &self.marker, &self.repos_file)?
        {
            if !changed.contains(&file) {
                changed.push(file);
            }
        }

        Ok(changed)
    }

    /// Changed files that the file sync would actually copy
    fn synced_changes_since(&self, reference: &str) -> Result<Vec<String>> {
        let pathspec = synced_pathspec(&self.workflow_dir);
        let mut changed = self
            .vcs
            .files_changed_since(self.workdir, reference, &pathspec)?;
        changed.retain(|path| is_synced_path(path, &self.workflow_dir));
        Ok(changed)
    }
}
