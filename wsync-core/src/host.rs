//! Code host capabilities
//!
//! The author and approver identities are separate capabilities: one
//! implementation of [`CodeHost`] acts as the author of branches and pull
//! requests, a distinct [`PullRequestApprover`] approves them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{RepoId, Result};

/// A pull request created during a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Web URL of the PR
    pub url: String,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// Whether the PR has been merged
    pub merged: bool,
}

/// Parameters for opening a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
}

/// Remote repository operations performed as the author identity
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// The repository's configured default branch
    ///
    /// Fails with `NotFound` if the repository does not exist.
    async fn default_branch(&self, repo: &RepoId) -> Result<String>;

    /// Whether `branch` exists on the host. A missing branch is `Ok(false)`.
    async fn remote_branch_exists(&self, repo: &RepoId, branch: &str) -> Result<bool>;

    /// Open a pull request
    async fn create_pull_request(
        &self,
        repo: &RepoId,
        request: &NewPullRequest,
    ) -> Result<PullRequestRef>;

    /// Merge a pull request, returning its merged state
    async fn merge_pull_request(
        &self,
        repo: &RepoId,
        pull_request: &PullRequestRef,
    ) -> Result<PullRequestRef>;
}

/// Pull request approval performed as a second, distinct identity
#[async_trait]
pub trait PullRequestApprover: Send + Sync {
    /// Submit an approving review
    async fn approve_pull_request(&self, repo: &RepoId, pull_request: &PullRequestRef)
        -> Result<()>;
}

/// CI run that triggered the sync, used in pull request bodies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub server_url: String,
    pub repository: String,
    pub run_id: String,
    pub workflow: Option<String>,
    pub run_number: Option<String>,
}

impl RunContext {
    /// Read the run from GitHub Actions environment variables
    ///
    /// Returns `None` outside of a workflow run.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Some(Self {
            server_url: non_empty("GITHUB_SERVER_URL")
                .unwrap_or_else(|| "https://github.com".to_string()),
            repository: non_empty("GITHUB_REPOSITORY")?,
            run_id: non_empty("GITHUB_RUN_ID")?,
            workflow: non_empty("GITHUB_WORKFLOW"),
            run_number: non_empty("GITHUB_RUN_NUMBER"),
        })
    }

    /// Web URL of the run
    pub fn run_url(&self) -> String {
        format!(
            "{}/{}/actions/runs/{}",
            self.server_url.trim_end_matches('/'),
            self.repository,
            self.run_id
        )
    }

    /// Web URL of the repository running the workflow
    pub fn repository_url(&self) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            self.repository
        )
    }
}

/// Body text for sync pull requests
pub fn pull_request_body(run: Option<&RunContext>) -> String {
    match run {
        Some(run) => {
            let name = run.workflow.as_deref().unwrap_or("sync");
            let number = run
                .run_number
                .as_deref()
                .map(|n| format!(" #{}", n))
                .unwrap_or_default();
            format!(
                "*Automatically generated from [workflow run **{}**{}]({}) in [{}]({}).*",
                name,
                number,
                run.run_url(),
                run.repository,
                run.repository_url()
            )
        }
        None => "*Automatically generated by wsync.*".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_run_context_requires_repository_and_run_id() {
        assert!(RunContext::from_lookup(lookup(&[("GITHUB_RUN_ID", "1")])).is_none());
        assert!(RunContext::from_lookup(lookup(&[("GITHUB_REPOSITORY", "acme/common")])).is_none());
    }

    #[test]
    fn test_pull_request_body_with_run() {
        let run = RunContext::from_lookup(lookup(&[
            ("GITHUB_REPOSITORY", "acme/common"),
            ("GITHUB_RUN_ID", "42"),
            ("GITHUB_WORKFLOW", "Sync"),
            ("GITHUB_RUN_NUMBER", "7"),
        ]))
        .unwrap();

        assert_eq!(run.run_url(), "https://github.com/acme/common/actions/runs/42");
        let body = pull_request_body(Some(&run));
        assert_eq!(
            body,
            "*Automatically generated from [workflow run **Sync** #7](https://github.com/acme/common/actions/runs/42) in [acme/common](https://github.com/acme/common).*"
        );
    }

    #[test]
    fn test_pull_request_body_without_run() {
        assert_eq!(pull_request_body(None), "*Automatically generated by wsync.*");
    }
}
