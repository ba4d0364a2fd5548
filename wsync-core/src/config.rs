//! Configuration management for wsync
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (WSYNC_*)
//! 3. Config file (~/.config/wsync/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::files::WORKFLOW_DIR;
use crate::git::LAST_SYNCED_TAG;
use crate::orchestrator::SyncSettings;
use crate::{Error, Result};

/// Source repository settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// `owner/name` of the source repository; detected from `origin` when unset
    pub repository: Option<String>,

    /// Workflow directory, relative to the repository root
    pub workflow_dir: String,

    /// JSON list of target repositories, relative to the source checkout
    pub repos_file: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repository: None,
            workflow_dir: WORKFLOW_DIR.to_string(),
            repos_file: "repos.json".to_string(),
        }
    }
}

/// Per-target synchronization settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Feature branch carrying the workflow update
    pub feature_branch: String,

    /// Pull request title
    pub pr_title: String,

    /// Commit message for the workflow update
    pub commit_message: String,

    /// Branch reference rewritten to the version tag in synced files
    pub reference_token: String,

    /// Where target repositories are cloned (defaults to ~/.cache/wsync/repos)
    pub clone_root: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            feature_branch: "sync-workflows".to_string(),
            pr_title: "(sync): update workflows".to_string(),
            commit_message: "sync workflows".to_string(),
            reference_token: "@main".to_string(),
            clone_root: None,
        }
    }
}

impl SyncConfig {
    /// Resolve the clone root, falling back to the user cache directory
    pub fn clone_root(&self) -> Result<PathBuf> {
        match &self.clone_root {
            Some(dir) => Ok(dir.clone()),
            None => default_clone_root(),
        }
    }
}

/// Get the default clone root
///
/// Returns `~/.cache/wsync/repos`
pub fn default_clone_root() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))?;

    Ok(cache_dir.join("wsync").join("repos"))
}

/// Git remote and commit identity settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// Base URL that `owner/name` is appended to when cloning
    pub remote_base: String,

    /// Root of the REST API used for pull requests and reviews
    pub api_base: String,

    /// Commit author name
    pub user_name: String,

    /// Commit author email
    pub user_email: String,

    /// User name paired with the token in remote URLs
    pub credential_user: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote_base: "https://github.com".to_string(),
            api_base: "https://api.github.com".to_string(),
            user_name: "wsync-bot".to_string(),
            user_email: "wsync-bot@users.noreply.github.com".to_string(),
            credential_user: "x-access-token".to_string(),
        }
    }
}

/// Tag settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TagConfig {
    /// Marker tag recording the last fleet-wide sync
    pub last_synced: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            last_synced: LAST_SYNCED_TAG.to_string(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_repository: Option<String>,
    pub repos_file: Option<String>,
    pub clone_root: Option<PathBuf>,
    pub remote_base: Option<String>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub sync: SyncConfig,
    pub git: GitConfig,
    pub tags: TagConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/wsync/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("wsync").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - WSYNC_SOURCE_REPOSITORY: `owner/name` of the source repository
    /// - WSYNC_REPOS_FILE: target repository list
    /// - WSYNC_CLONE_ROOT: directory for target clones
    /// - WSYNC_FEATURE_BRANCH: feature branch name
    /// - WSYNC_API_BASE: REST API root, e.g. for GitHub Enterprise
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(repository) = std::env::var("WSYNC_SOURCE_REPOSITORY") {
            self.source.repository = Some(repository);
        }

        if let Ok(repos_file) = std::env::var("WSYNC_REPOS_FILE") {
            self.source.repos_file = repos_file;
        }

        if let Ok(clone_root) = std::env::var("WSYNC_CLONE_ROOT") {
            self.sync.clone_root = Some(PathBuf::from(clone_root));
        }

        if let Ok(branch) = std::env::var("WSYNC_FEATURE_BRANCH") {
            self.sync.feature_branch = branch;
        }

        if let Ok(api_base) = std::env::var("WSYNC_API_BASE") {
            self.git.api_base = api_base;
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(repository) = overrides.source_repository {
            self.source.repository = Some(repository);
        }

        if let Some(repos_file) = overrides.repos_file {
            self.source.repos_file = repos_file;
        }

        if let Some(clone_root) = overrides.clone_root {
            self.sync.clone_root = Some(clone_root);
        }

        if let Some(remote_base) = overrides.remote_base {
            self.git.remote_base = remote_base;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let base = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base.with_env_overrides().with_cli_overrides(overrides))
    }

    /// Build the per-target settings used by the orchestrator
    pub fn sync_settings(&self, pr_body: impl Into<String>) -> Result<SyncSettings> {
        Ok(SyncSettings {
            workflow_dir: self.source.workflow_dir.clone(),
            feature_branch: self.sync.feature_branch.clone(),
            pr_title: self.sync.pr_title.clone(),
            pr_body: pr_body.into(),
            commit_message: self.sync.commit_message.clone(),
            reference_token: self.sync.reference_token.clone(),
            clone_root: self.sync.clone_root()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.workflow_dir, ".github/workflows");
        assert_eq!(config.source.repos_file, "repos.json");
        assert_eq!(config.sync.feature_branch, "sync-workflows");
        assert_eq!(config.sync.pr_title, "(sync): update workflows");
        assert_eq!(config.sync.reference_token, "@main");
        assert_eq!(config.tags.last_synced, "last-synced");
        assert_eq!(config.git.remote_base, "https://github.com");
        assert_eq!(config.git.api_base, "https://api.github.com");
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_cli_overrides(ConfigOverrides {
            source_repository: Some("acme/common".to_string()),
            repos_file: Some("targets.json".to_string()),
            clone_root: Some(PathBuf::from("/tmp/clones")),
            remote_base: None,
        });

        assert_eq!(config.source.repository.as_deref(), Some("acme/common"));
        assert_eq!(config.source.repos_file, "targets.json");
        assert_eq!(config.sync.clone_root().unwrap(), PathBuf::from("/tmp/clones"));
        assert_eq!(config.git.remote_base, "https://github.com");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[source]
repository = "acme/common"

[sync]
feature_branch = "chore/sync"
clone_root = "/var/tmp/wsync"

[git]
user_name = "release-bot"
api_base = "https://ghe.example.com/api/v3"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.source.repository.as_deref(), Some("acme/common"));
        assert_eq!(config.sync.feature_branch, "chore/sync");
        assert_eq!(config.git.user_name, "release-bot");
        assert_eq!(config.git.api_base, "https://ghe.example.com/api/v3");
        // untouched fields keep their defaults
        assert_eq!(config.sync.pr_title, "(sync): update workflows");
        assert_eq!(config.git.remote_base, "https://github.com");
    }

    #[test]
    fn test_sync_settings() {
        let config = Config::default().with_cli_overrides(ConfigOverrides {
            clone_root: Some(PathBuf::from("/tmp/clones")),
            ..Default::default()
        });

        let settings = config.sync_settings("body").unwrap();
        assert_eq!(settings.feature_branch, "sync-workflows");
        assert_eq!(settings.pr_body, "body");
        assert_eq!(settings.clone_root, PathBuf::from("/tmp/clones"));
    }
}
