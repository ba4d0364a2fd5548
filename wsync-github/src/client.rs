//! GitHub API client using octocrab

use async_trait::async_trait;
use octocrab::Octocrab;
use tracing::{debug, info};
use wsync_core::host::{CodeHost, NewPullRequest, PullRequestRef};
use wsync_core::RepoId;

use crate::pr::pull_request_ref;
use crate::{Error, Result};

/// GitHub access as the author identity
///
/// Reads repository metadata, opens pull requests and merges them. Approval
/// goes through [`crate::GitHubApprover`] with a second token.
pub struct GitHubClient {
    client: Octocrab,
}

impl GitHubClient {
    /// Create a client authenticated with a personal access token
    ///
    /// `api_base` is the REST API root, `https://api.github.com` for github.com.
    pub fn new(token: impl Into<String>, api_base: &str) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::Auth("GitHub token is empty".to_string()));
        }

        let client = Octocrab::builder()
            .personal_token(token)
            .base_uri(api_base)
            .map_err(|e| Error::Config(format!("API base '{}': {}", api_base, e)))?
            .build()
            .map_err(|e| Error::Auth(format!("Failed to create GitHub client: {}", e)))?;

        Ok(Self { client })
    }

    async fn get_default_branch(&self, repo: &RepoId) -> Result<String> {
        debug!(repo = %repo, "Fetching default branch");

        let repository = self
            .client
            .repos(repo.owner(), repo.name())
            .get()
            .await?;

        repository
            .default_branch
            .ok_or_else(|| Error::Other(format!("{} has no default branch", repo)))
    }

    async fn branch_exists(&self, repo: &RepoId, branch: &str) -> Result<bool> {
        let route = format!("/repos/{}/{}/branches/{}", repo.owner(), repo.name(), branch);

        match self
            .client
            .get::<serde_json::Value, _, ()>(route, None::<&()>)
            .await
        {
            Ok(_) => Ok(true),
            Err(octocrab::Error::GitHub { source, .. }) if source.status_code.as_u16() == 404 => {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn open_pull_request(
        &self,
        repo: &RepoId,
        request: &NewPullRequest,
    ) -> Result<PullRequestRef> {
        let pr = self
            .client
            .pulls(repo.owner(), repo.name())
            .create(&request.title, &request.head, &request.base)
            .body(request.body.clone())
            .maintainer_can_modify(true)
            .send()
            .await?;

        Ok(pull_request_ref(pr))
    }

    async fn merge(&self, repo: &RepoId, pull_request: &PullRequestRef) -> Result<PullRequestRef> {
        let merge = self
            .client
            .pulls(repo.owner(), repo.name())
            .merge(pull_request.number)
            .send()
            .await?;

        if !merge.merged {
            return Err(Error::NotMerged {
                number: pull_request.number,
                message: merge.message.unwrap_or_default(),
            });
        }

        Ok(PullRequestRef {
            merged: true,
            ..pull_request.clone()
        })
    }
}

#[async_trait]
impl CodeHost for GitHubClient {
    async fn default_branch(&self, repo: &RepoId) -> wsync_core::Result<String> {
        Ok(self.get_default_branch(repo).await?)
    }

    async fn remote_branch_exists(&self, repo: &RepoId, branch: &str) -> wsync_core::Result<bool> {
        Ok(self.branch_exists(repo, branch).await?)
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        request: &NewPullRequest,
    ) -> wsync_core::Result<PullRequestRef> {
        let pr = self.open_pull_request(repo, request).await?;
        info!(repo = %repo, number = pr.number, "Opened pull request");
        Ok(pr)
    }

    async fn merge_pull_request(
        &self,
        repo: &RepoId,
        pull_request: &PullRequestRef,
    ) -> wsync_core::Result<PullRequestRef> {
        let merged = self.merge(repo, pull_request).await?;
        info!(repo = %repo, number = merged.number, "Merged pull request");
        Ok(merged)
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_token_rejected() {
        assert!(matches!(
            GitHubClient::new("", "https://api.github.com"),
            Err(Error::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_api_base_rejected() {
        assert!(matches!(
            GitHubClient::new("ghp_author", "not a uri"),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_enterprise_api_base_accepted() {
        assert!(GitHubClient::new("ghp_author", "https://ghe.example.com/api/v3").is_ok());
    }
}
