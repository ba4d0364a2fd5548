//! Pull request approval with the second identity
//!
//! Uses a plain REST call so the approving token never shares a client with
//! the author token.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};
use wsync_core::host::{PullRequestApprover, PullRequestRef};
use wsync_core::RepoId;

use crate::{Error, Result};

/// GitHub access as the approver identity
pub struct GitHubApprover {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl GitHubApprover {
    /// Create an approver for the REST API rooted at `api_base`
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::Auth("Approver token is empty".to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            token,
            api_base: api_base.into(),
        })
    }

    fn review_url(&self, repo: &RepoId, number: u64) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}/reviews",
            self.api_base.trim_end_matches('/'),
            repo.owner(),
            repo.name(),
            number
        )
    }

    async fn approve(&self, repo: &RepoId, number: u64) -> Result<()> {
        let url = self.review_url(repo, number);
        debug!(url = %url, "Submitting approving review");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "wsync")
            .json(&json!({ "event": "APPROVE" }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            return Err(Error::Status { status, body });
        }

        Ok(())
    }
}

#[async_trait]
impl PullRequestApprover for GitHubApprover {
    async fn approve_pull_request(
        &self,
        repo: &RepoId,
        pull_request: &PullRequestRef,
    ) -> wsync_core::Result<()> {
        self.approve(repo, pull_request.number).await?;
        info!(repo = %repo, number = pull_request.number, "Approved pull request");
        Ok(())
    }
}

impl std::fmt::Debug for GitHubApprover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubApprover")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API_BASE: &str = "https://api.github.com";

    #[test]
    fn test_review_url() {
        let approver = GitHubApprover::new("ghp_approver", API_BASE).unwrap();
        let repo = RepoId::parse("acme/service-a").unwrap();
        assert_eq!(
            approver.review_url(&repo, 12),
            "https://api.github.com/repos/acme/service-a/pulls/12/reviews"
        );

        let enterprise =
            GitHubApprover::new("ghp_approver", "https://ghe.example.com/api/v3/").unwrap();
        assert_eq!(
            enterprise.review_url(&repo, 3),
            "https://ghe.example.com/api/v3/repos/acme/service-a/pulls/3/reviews"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let approver = GitHubApprover::new("ghp_approver", API_BASE).unwrap();
        assert!(!format!("{:?}", approver).contains("ghp_approver"));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(GitHubApprover::new("", API_BASE).is_err());
    }
}
