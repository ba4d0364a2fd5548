//! Repository identifiers and the target repository list

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An `owner/name` pair identifying a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// Build an identifier from its parts
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();

        if owner.is_empty() || name.is_empty() || owner.contains('/') || name.contains('/') {
            return Err(Error::InputFormat(format!(
                "Invalid repository identifier '{}/{}'. Expected owner/name",
                owner, name
            )));
        }

        Ok(Self { owner, name })
    }

    /// Parse the strict `owner/name` form
    ///
    /// Exactly one separator is allowed and both parts must be non-empty.
    pub fn parse(input: &str) -> Result<Self> {
        match input.split_once('/') {
            Some((owner, name)) if !name.contains('/') => Self::new(owner, name).map_err(|_| {
                Error::InputFormat(format!(
                    "Invalid repository identifier '{}'. Expected owner/name",
                    input
                ))
            }),
            _ => Err(Error::InputFormat(format!(
                "Invalid repository identifier '{}'. Expected owner/name",
                input
            ))),
        }
    }

    /// Derive an identifier from a remote URL
    ///
    /// Supports:
    /// - `owner/repo`
    /// - `https://github.com/owner/repo(.git)`, with or without embedded credentials
    /// - `git@github.com:owner/repo.git`
    pub fn from_remote_url(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.starts_with("https://") || input.starts_with("http://") {
            let url = url::Url::parse(input)
                .map_err(|e| Error::InputFormat(format!("Invalid remote URL {}: {}", input, e)))?;
            let path = url.path().trim_start_matches('/').trim_end_matches(".git");
            return Self::from_path(path, input);
        }

        if let Some(rest) = input.strip_prefix("git@") {
            if let Some((_, path)) = rest.split_once(':') {
                return Self::from_path(path.trim_end_matches(".git"), input);
            }
        }

        if !input.contains("://") {
            return Self::parse(input.trim_end_matches(".git"));
        }

        Err(Error::InputFormat(format!(
            "Unrecognized remote URL: {}",
            input
        )))
    }

    fn from_path(path: &str, input: &str) -> Result<Self> {
        let mut parts = path.split('/');
        match (parts.next(), parts.next()) {
            (Some(owner), Some(name)) => Self::new(owner, name),
            _ => Err(Error::InputFormat(format!(
                "Remote URL {} does not name a repository",
                input
            ))),
        }
    }

    /// Repository owner (user or organization)
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `owner/name` form
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepoId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RepoId> for String {
    fn from(id: RepoId) -> Self {
        id.full_name()
    }
}

/// Load the target repository list from a JSON file
///
/// The file must hold a JSON array of `"owner/name"` strings. Every entry is
/// validated before anything is returned, so a single malformed identifier
/// rejects the whole list.
pub fn load_targets(path: &Path) -> Result<Vec<RepoId>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::InputFormat(format!("Could not read {}: {}", path.display(), e))
    })?;

    parse_targets(&contents).map_err(|e| match e {
        Error::InputFormat(msg) => Error::InputFormat(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Parse a JSON array of repository identifiers
pub fn parse_targets(json: &str) -> Result<Vec<RepoId>> {
    let entries: Vec<String> = serde_json::from_str(json).map_err(|e| {
        Error::InputFormat(format!(
            "expected a JSON formatted list of strings: {}",
            e
        ))
    })?;

    entries.iter().map(|entry| RepoId::parse(entry)).collect()
}
