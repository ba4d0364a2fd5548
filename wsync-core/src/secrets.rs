//! Secrets management for wsync
//!
//! Secrets are stored separately from configuration to avoid accidental sharing.
//! The secrets file is located at `~/.config/wsync/secrets.toml` and must have
//! restrictive permissions (0600 on Unix).
//!
//! Two identities are required: the author token opens pull requests and pushes
//! branches, the approver token approves them. Hosts reject self-approval, so the
//! two must differ.
//!
//! Loading priority:
//! 1. Environment variables (WSYNC_GITHUB_TOKEN, WSYNC_APPROVER_TOKEN)
//! 2. Secrets file (~/.config/wsync/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Environment variable holding the author token
pub const AUTHOR_TOKEN_ENV: &str = "WSYNC_GITHUB_TOKEN";

/// Environment variable holding the approver token
pub const APPROVER_TOKEN_ENV: &str = "WSYNC_APPROVER_TOKEN";

/// Secrets structure
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// GitHub configuration
    pub github: GitHubSecrets,
}

/// GitHub-related secrets
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubSecrets {
    /// Token of the identity that pushes branches and opens pull requests
    pub token: Option<String>,

    /// Token of the identity that approves pull requests
    pub approver_token: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("token", &self.github.token.as_ref().map(|_| "<set>"))
            .field(
                "approver_token",
                &self.github.approver_token.as_ref().map(|_| "<set>"),
            )
            .finish()
    }
}

/// The author and approver tokens, validated to be present and distinct
#[derive(Clone)]
pub struct Credentials {
    pub author: String,
    pub approver: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        let secrets_path = Self::default_secrets_path();

        if let Some(path) = secrets_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load secrets from a specific file with permission checking
    pub fn load_from_file(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }

            debug!(path = %path.display(), mode = format!("{:o}", mode & 0o777), "Secrets file permissions OK");
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        for token in [
            &mut secrets.github.token,
            &mut secrets.github.approver_token,
        ]
        .into_iter()
        .flatten()
        {
            *token = token.trim().to_string();
        }

        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/wsync/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("wsync").join("secrets.toml"))
    }

    /// Author token, `WSYNC_GITHUB_TOKEN` taking priority over the secrets file
    pub fn author_token(&self) -> Option<String> {
        token_from(AUTHOR_TOKEN_ENV, self.github.token.as_deref())
    }

    /// Approver token, `WSYNC_APPROVER_TOKEN` taking priority over the secrets file
    pub fn approver_token(&self) -> Option<String> {
        token_from(APPROVER_TOKEN_ENV, self.github.approver_token.as_deref())
    }

    /// Both tokens, required to be present and distinct
    pub fn credentials(&self) -> Result<Credentials> {
        let author = self.author_token().ok_or_else(|| {
            Error::Config(format!(
                "Author token not found. Set {} or add token to ~/.config/wsync/secrets.toml",
                AUTHOR_TOKEN_ENV
            ))
        })?;

        let approver = self.approver_token().ok_or_else(|| {
            Error::Config(format!(
                "Approver token not found. Set {} or add approver_token to ~/.config/wsync/secrets.toml",
                APPROVER_TOKEN_ENV
            ))
        })?;

        Credentials::new(author, approver)
    }
}

impl Credentials {
    /// Pair two tokens, rejecting a shared identity
    pub fn new(author: String, approver: String) -> Result<Self> {
        if author == approver {
            return Err(Error::Config(
                "Author and approver tokens are identical; pull requests cannot be self-approved"
                    .to_string(),
            ));
        }

        Ok(Self { author, approver })
    }
}

fn token_from(var: &str, file_token: Option<&str>) -> Option<String> {
    if let Ok(token) = std::env::var(var) {
        let token = token.trim().to_string();
        if !token.is_empty() {
            debug!(var, "Using token from environment variable");
            return Some(token);
        }
    }

    if let Some(token) = file_token {
        if !token.is_empty() {
            debug!("Using token from secrets file");
            return Some(token.to_string());
        }
    }

    None
}
