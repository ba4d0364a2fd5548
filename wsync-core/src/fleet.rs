//! Fleet-wide sync
//!
//! Runs the per-repository orchestrator over every target in order and
//! advances the `last-synced` marker only when no target failed.

use std::path::Path;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::files::WorkflowFileSync;
use crate::git::{VersionControl, VersionTag};
use crate::host::{CodeHost, PullRequestApprover};
use crate::orchestrator::{RepositorySyncOrchestrator, SyncOutcome, SyncSettings};
use crate::{Error, RepoId, Result};

/// Overall status of a fleet run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetStatus {
    /// Every target succeeded
    AllSynced,
    /// At least one target succeeded and at least one failed
    PartiallySynced,
    /// No target succeeded
    NoneSynced,
}

/// Aggregated outcomes of a fleet run
#[derive(Debug)]
pub struct FleetReport {
    pub version: VersionTag,
    pub outcomes: Vec<SyncOutcome>,
    /// Whether the marker tag was moved to HEAD of the source
    pub marker_advanced: bool,
    /// Failure while advancing the marker after all targets succeeded
    pub marker_error: Option<Error>,
}

impl FleetReport {
    /// True iff no target failed and the marker, if requested, was advanced
    pub fn is_success(&self) -> bool {
        self.marker_error.is_none() && self.outcomes.iter().all(SyncOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn status(&self) -> FleetStatus {
        let failed = self.failures().count();
        if failed == 0 {
            FleetStatus::AllSynced
        } else if failed < self.outcomes.len() {
            FleetStatus::PartiallySynced
        } else {
            FleetStatus::NoneSynced
        }
    }
}

/// Syncs a list of targets from one source checkout
pub struct FleetSyncRunner<'a> {
    vcs: &'a dyn VersionControl,
    host: &'a dyn CodeHost,
    approver: &'a dyn PullRequestApprover,
    settings: &'a SyncSettings,
    source_dir: &'a Path,
    source_repo: &'a RepoId,
    marker: Option<String>,
}

impl<'a> FleetSyncRunner<'a> {
    pub fn new(
        vcs: &'a dyn VersionControl,
        host: &'a dyn CodeHost,
        approver: &'a dyn PullRequestApprover,
        settings: &'a SyncSettings,
        source_dir: &'a Path,
        source_repo: &'a RepoId,
    ) -> Self {
        Self {
            vcs,
            host,
            approver,
            settings,
            source_dir,
            source_repo,
            marker: None,
        }
    }

    /// Advance `marker` on the source after a fully successful run
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Sync every target in order
    ///
    /// Errors are returned only for failures before any target is touched:
    /// the source remote cannot be configured or has no version tag. Per-target
    /// failures are recorded in the report.
    ///
    /// The source checkout's `origin` is pointed at the authenticated remote for
    /// the run and put back to its previous URL afterwards.
    pub async fn run(&self, targets: &[RepoId]) -> Result<FleetReport> {
        let original = self.vcs.origin_url(self.source_dir)?;
        self.vcs.rewrite_origin(self.source_dir, self.source_repo)?;

        let result = self.run_targets(targets).await;

        if let Err(e) = self.vcs.set_origin_url(self.source_dir, &original) {
            warn!(error = %e, "Failed to restore origin of the source checkout");
        }
        result
    }

    async fn run_targets(&self, targets: &[RepoId]) -> Result<FleetReport> {
        let version = self
            .vcs
            .latest_version_tag(self.source_dir)?
            .ok_or_else(|| {
                Error::NotFound(format!("no version tag on {}", self.source_repo))
            })?;

        let files = WorkflowFileSync::new(
            self.source_dir.join(&self.settings.workflow_dir),
            self.settings.reference_token.clone(),
        );
        let orchestrator = RepositorySyncOrchestrator::new(
            self.vcs,
            self.host,
            self.approver,
            &files,
            self.settings,
            version,
        );

        info!(targets = targets.len(), version = %version, "Starting fleet sync");

        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = orchestrator.sync(target, started).await;
            if let Some(e) = outcome.error() {
                error!(repo = %target, error = %e, "Failed to sync");
            }
            outcomes.push(outcome);
        }

        let mut report = FleetReport {
            version,
            outcomes,
            marker_advanced: false,
            marker_error: None,
        };

        match &self.marker {
            Some(marker) if report.status() == FleetStatus::AllSynced => {
                match self.vcs.add_or_move_tag(self.source_dir, marker) {
                    Ok(()) => {
                        info!(tag = %marker, "Advanced sync marker");
                        report.marker_advanced = true;
                    }
                    Err(e) => {
                        error!(tag = %marker, error = %e, "Failed to advance sync marker");
                        report.marker_error = Some(e);
                    }
                }
            }
            Some(marker) => {
                warn!(tag = %marker, "Not all targets synced, leaving marker in place");
            }
            None => {}
        }

        Ok(report)
    }
}
