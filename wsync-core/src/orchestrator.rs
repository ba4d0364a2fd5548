//! Per-repository sync state machine
//!
//! One run drives a single target repository through
//! `Cloning → FilesSynced → BranchPrepared → Pushed → PrCreated → PrApproved →
//! PrMerged → BranchCleaned → Done`. The first failing step moves the run to
//! `Failed` and nothing further happens for that target.
//!
//! Branch preparation always removes a leftover feature branch (local and
//! remote) from an earlier attempt, so a crashed run can simply be repeated.
//! Cleanup only happens after a confirmed merge: a branch whose PR could not be
//! created, approved or merged is left in place for inspection.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::files::WorkflowFileSync;
use crate::git::{VersionControl, VersionTag};
use crate::host::{CodeHost, NewPullRequest, PullRequestApprover, PullRequestRef};
use crate::state::{StateMachine, Workflow};
use crate::{Error, RepoId, Result};

/// Phases of a single repository sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    Cloning,
    FilesSynced,
    BranchPrepared,
    Pushed,
    PrCreated,
    PrApproved,
    PrMerged,
    BranchCleaned,
    Done,
    Failed,
}

impl SyncPhase {
    const PIPELINE: [SyncPhase; 9] = [
        SyncPhase::Cloning,
        SyncPhase::FilesSynced,
        SyncPhase::BranchPrepared,
        SyncPhase::Pushed,
        SyncPhase::PrCreated,
        SyncPhase::PrApproved,
        SyncPhase::PrMerged,
        SyncPhase::BranchCleaned,
        SyncPhase::Done,
    ];

    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncPhase::Done | SyncPhase::Failed)
    }

    /// The declared transition table
    ///
    /// Each pipeline phase leads to the next one, a clean working tree after
    /// the file sync short-circuits to `Done`, and every non-terminal phase
    /// may fail.
    pub fn transitions() -> Vec<(SyncPhase, SyncPhase)> {
        let mut transitions: Vec<_> = Self::PIPELINE
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .collect();

        transitions.push((SyncPhase::FilesSynced, SyncPhase::Done));
        transitions.extend(
            Self::PIPELINE
                .iter()
                .filter(|phase| !phase.is_terminal())
                .map(|phase| (*phase, SyncPhase::Failed)),
        );

        transitions
    }

    /// A fresh state machine starting at `Cloning`
    pub fn machine() -> StateMachine<SyncPhase> {
        StateMachine::new(SyncPhase::Cloning).add_transitions(Self::transitions())
    }
}

/// Result of syncing one target repository
///
/// Created once when the run ends and never modified afterwards.
#[derive(Debug)]
pub struct SyncOutcome {
    repo: RepoId,
    error: Option<Error>,
    elapsed: Duration,
    pull_request: Option<PullRequestRef>,
    last_phase: SyncPhase,
}

impl SyncOutcome {
    /// Record the end of a run
    pub fn new(
        repo: RepoId,
        error: Option<Error>,
        elapsed: Duration,
        pull_request: Option<PullRequestRef>,
        last_phase: SyncPhase,
    ) -> Self {
        Self {
            repo,
            error,
            elapsed,
            pull_request,
            last_phase,
        }
    }

    /// The target repository
    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// The failure, if the run failed
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Time since the start of the fleet run when this target finished
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The pull request opened for this target, if any
    pub fn pull_request(&self) -> Option<&PullRequestRef> {
        self.pull_request.as_ref()
    }

    /// The last phase reached before the run ended or failed
    pub fn last_phase(&self) -> SyncPhase {
        self.last_phase
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Succeeded without opening a pull request
    pub fn is_unchanged(&self) -> bool {
        self.error.is_none() && self.pull_request.is_none()
    }
}

/// Settings shared by every target of a run
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Workflow directory relative to each repository root
    pub workflow_dir: String,
    pub feature_branch: String,
    pub pr_title: String,
    pub pr_body: String,
    pub commit_message: String,
    /// Branch reference rewritten to the version tag in synced files
    pub reference_token: String,
    /// Each target is cloned to `<clone_root>/<owner>/<name>`
    pub clone_root: PathBuf,
}

/// Drives one target repository through the sync state machine
pub struct RepositorySyncOrchestrator<'a> {
    vcs: &'a dyn VersionControl,
    host: &'a dyn CodeHost,
    approver: &'a dyn PullRequestApprover,
    files: &'a WorkflowFileSync,
    settings: &'a SyncSettings,
    version: VersionTag,
}

impl<'a> RepositorySyncOrchestrator<'a> {
    pub fn new(
        vcs: &'a dyn VersionControl,
        host: &'a dyn CodeHost,
        approver: &'a dyn PullRequestApprover,
        files: &'a WorkflowFileSync,
        settings: &'a SyncSettings,
        version: VersionTag,
    ) -> Self {
        Self {
            vcs,
            host,
            approver,
            files,
            settings,
            version,
        }
    }

    /// Isolated clone directory of a target
    pub fn clone_dir(&self, repo: &RepoId) -> PathBuf {
        self.settings
            .clone_root
            .join(repo.owner())
            .join(repo.name())
    }

    /// Sync one target; `started` is the start of the enclosing fleet run
    pub async fn sync(&self, repo: &RepoId, started: Instant) -> SyncOutcome {
        let mut machine = SyncPhase::machine();
        let mut pull_request = None;

        info!(repo = %repo, version = %self.version, "Syncing workflows");

        let result = self.drive(repo, &mut machine, &mut pull_request).await;
        let last_phase = *machine.current_phase();

        let error = match result {
            Ok(()) => None,
            Err(e) => {
                warn!(repo = %repo, phase = ?last_phase, error = %e, "Sync failed");
                if let Err(transition) = machine.transition_to(SyncPhase::Failed) {
                    warn!(error = %transition, "Could not record failure");
                }
                Some(e)
            }
        };

        SyncOutcome::new(
            repo.clone(),
            error,
            started.elapsed(),
            pull_request,
            last_phase,
        )
    }

    async fn drive(
        &self,
        repo: &RepoId,
        machine: &mut StateMachine<SyncPhase>,
        pull_request: &mut Option<PullRequestRef>,
    ) -> Result<()> {
        let dir = self.clone_dir(repo);
        let branch = &self.settings.feature_branch;

        self.vcs.clone_repo(repo, &dir)?;
        let written = self
            .files
            .apply(&dir.join(&self.settings.workflow_dir), &self.version)?;
        info!(repo = %repo, files = ?written, "Synced workflow files");
        machine.transition_to(SyncPhase::FilesSynced)?;

        self.vcs.stage(&dir, &self.settings.workflow_dir)?;
        if self.vcs.working_tree_clean(&dir)? {
            info!(repo = %repo, "No changes to commit, already up to date");
            machine.transition_to(SyncPhase::Done)?;
            return Ok(());
        }

        let base = self.prepare_branch(repo, &dir).await?;
        machine.transition_to(SyncPhase::BranchPrepared)?;

        self.vcs.commit(&dir, &self.settings.commit_message)?;
        self.vcs.push_branch(&dir, branch)?;
        machine.transition_to(SyncPhase::Pushed)?;

        let request = NewPullRequest {
            head: branch.clone(),
            base: base.clone(),
            title: self.settings.pr_title.clone(),
            body: self.settings.pr_body.clone(),
        };
        let created = self.host.create_pull_request(repo, &request).await?;
        info!(repo = %repo, number = created.number, url = %created.url, "Created pull request");
        *pull_request = Some(created.clone());
        machine.transition_to(SyncPhase::PrCreated)?;

        self.approver.approve_pull_request(repo, &created).await?;
        machine.transition_to(SyncPhase::PrApproved)?;

        let merged = self.host.merge_pull_request(repo, &created).await?;
        *pull_request = Some(merged);
        machine.transition_to(SyncPhase::PrMerged)?;

        self.vcs.checkout_existing(&dir, &base)?;
        self.remove_feature_branch(repo, &dir).await?;
        machine.transition_to(SyncPhase::BranchCleaned)?;

        machine.transition_to(SyncPhase::Done)?;
        Ok(())
    }

    /// Switch to the default branch, drop any leftover feature branch and
    /// create a fresh one. Returns the default branch name.
    async fn prepare_branch(&self, repo: &RepoId, dir: &Path) -> Result<String> {
        let base = self.host.default_branch(repo).await?;

        self.vcs.checkout_existing(dir, &base)?;
        self.remove_feature_branch(repo, dir).await?;
        self.vcs.checkout_new(dir, &self.settings.feature_branch)?;

        Ok(base)
    }

    async fn remove_feature_branch(&self, repo: &RepoId, dir: &Path) -> Result<()> {
        let branch = &self.settings.feature_branch;

        if self.vcs.local_branch_exists(dir, branch)? {
            info!(repo = %repo, branch = %branch, "Deleting local feature branch");
            self.vcs.delete_local_branch(dir, branch)?;
        }

        if self.host.remote_branch_exists(repo, branch).await? {
            info!(repo = %repo, branch = %branch, "Deleting remote feature branch");
            self.vcs.delete_remote_branch(dir, branch)?;
        }

        Ok(())
    }
}
