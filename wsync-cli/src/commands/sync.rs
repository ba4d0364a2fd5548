//! Sync commands - push synced workflows to target repositories

use std::path::Path;

use anyhow::{bail, Context};
use clap::Args;
use tracing::info;
use wsync_core::host::{pull_request_body, RunContext};
use wsync_core::repo::load_targets;
use wsync_core::summary::{render_fleet_summary, render_repo_summary};
use wsync_core::{Config, FleetReport, FleetSyncRunner, GitCli, RepoId, Secrets};
use wsync_github::{GitHubApprover, GitHubClient};

use crate::ci;

/// Sync every repository listed in the repos file
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// JSON list of target repositories, relative to the source checkout
    #[arg(long)]
    pub repos_file: Option<String>,
}

/// Sync a single repository without touching the sync marker
#[derive(Args, Debug)]
pub struct SyncRepoArgs {
    /// Target repository as owner/name
    pub repo: String,
}

impl SyncArgs {
    pub async fn execute(&self, config: &Config, source_dir: &Path) -> anyhow::Result<()> {
        let repos_file = source_dir.join(&config.source.repos_file);
        let targets = load_targets(&repos_file)
            .with_context(|| format!("Could not read {}", repos_file.display()))?;

        let report = run(config, source_dir, &targets, true).await?;
        ci::emit_summary(&render_fleet_summary(&report, &config.git.remote_base))?;

        if !report.is_success() {
            bail!("one or more repositories were not synced successfully");
        }
        Ok(())
    }
}

impl SyncRepoArgs {
    pub async fn execute(&self, config: &Config, source_dir: &Path) -> anyhow::Result<()> {
        let target = RepoId::parse(&self.repo)?;

        let report = run(config, source_dir, &[target], false).await?;
        for outcome in &report.outcomes {
            ci::emit_summary(&render_repo_summary(outcome, &config.git.remote_base))?;
        }

        if !report.is_success() {
            bail!("{} was not synced successfully", self.repo);
        }
        Ok(())
    }
}

async fn run(
    config: &Config,
    source_dir: &Path,
    targets: &[RepoId],
    advance_marker: bool,
) -> anyhow::Result<FleetReport> {
    let credentials = Secrets::load()?.credentials()?;

    let git = GitCli::new(&config.git).with_token(credentials.author.clone());
    let host = GitHubClient::new(credentials.author, &config.git.api_base)?;
    let approver = GitHubApprover::new(credentials.approver, &config.git.api_base)?;

    let source = super::source_repository(config, &git, source_dir)?;
    let settings = config.sync_settings(pull_request_body(RunContext::from_env().as_ref()))?;

    info!(
        source = %source,
        targets = targets.len(),
        clone_root = %settings.clone_root.display(),
        "Syncing workflows"
    );

    let mut runner = FleetSyncRunner::new(&git, &host, &approver, &settings, source_dir, &source);
    if advance_marker {
        runner = runner.with_marker(config.tags.last_synced.clone());
    }

    Ok(runner.run(targets).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wsync_core::Error;

    fn input_format(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<Error>(), Some(Error::InputFormat(_)))
    }

    /// A directory that is neither a git checkout nor holds credentials, so
    /// any step past target parsing fails with a different error
    fn bare_source(repos_json: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("repos.json"), repos_json).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_malformed_target_fails_before_any_remote_step() {
        let source = bare_source(r#"["acme/service-a", "service-b"]"#);
        let args = SyncArgs { repos_file: None };

        let err = args
            .execute(&Config::default(), source.path())
            .await
            .unwrap_err();

        assert!(input_format(&err), "unexpected error: {:#}", err);
        assert!(format!("{:#}", err).contains("service-b"));
    }

    #[tokio::test]
    async fn test_non_list_repos_file_is_input_error() {
        let source = bare_source(r#"{"repos": ["acme/service-a"]}"#);
        let args = SyncArgs { repos_file: None };

        let err = args
            .execute(&Config::default(), source.path())
            .await
            .unwrap_err();

        assert!(input_format(&err), "unexpected error: {:#}", err);
    }

    #[tokio::test]
    async fn test_malformed_single_target_is_input_error() {
        let source = bare_source("[]");
        let args = SyncRepoArgs {
            repo: "acme/service-a/extra".to_string(),
        };

        let err = args
            .execute(&Config::default(), source.path())
            .await
            .unwrap_err();

        assert!(input_format(&err), "unexpected error: {:#}", err);
    }
}
