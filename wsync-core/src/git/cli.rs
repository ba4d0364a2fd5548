//! `git` subprocess client

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Command;

use git2::{BranchType, Repository, StatusOptions};
use tracing::debug;

use super::{parse_ls_remote_tags, VersionControl};
use crate::config::GitConfig;
use crate::{Error, RepoId, Result};

/// Placeholder written in place of credentials in logs and errors
const REDACTED: &str = "<token>";

/// Version control client backed by the `git` binary
///
/// Mutating and remote operations shell out to `git`; read-only inspection of
/// the working tree goes through `git2`.
pub struct GitCli {
    config: GitConfig,
    token: Option<String>,
}

impl std::fmt::Debug for GitCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitCli")
            .field("remote_base", &self.config.remote_base)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl GitCli {
    /// Create a client without credentials
    pub fn new(config: &GitConfig) -> Self {
        Self {
            config: config.clone(),
            token: None,
        }
    }

    /// Embed this token in remote URLs for clone, push and fetch
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    /// Remote URL for a repository, with credentials for http(s) remotes
    pub fn remote_url(&self, repo: &RepoId) -> String {
        let plain = format!(
            "{}/{}.git",
            self.config.remote_base.trim_end_matches('/'),
            repo
        );

        let Some(token) = &self.token else {
            return plain;
        };

        match url::Url::parse(&plain) {
            Ok(mut url) if matches!(url.scheme(), "https" | "http") => {
                if url.set_username(&self.config.credential_user).is_ok()
                    && url.set_password(Some(token.as_str())).is_ok()
                {
                    url.to_string()
                } else {
                    plain
                }
            }
            _ => plain,
        }
    }

    /// Identify the repository behind the `origin` remote of a checkout
    pub fn origin_repository(&self, workdir: &Path) -> Result<RepoId> {
        RepoId::from_remote_url(&self.origin_url(workdir)?)
    }

    /// Replace known credentials with a placeholder
    fn redact(&self, text: &str) -> String {
        match &self.token {
            Some(token) => text.replace(token.as_str(), REDACTED),
            None => text.to_string(),
        }
    }

    /// Run a git command and return its stdout
    fn run<I, S>(&self, workdir: Option<&Path>, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let command_line = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        let shown = self.redact(&command_line);

        debug!(workdir = ?workdir, "> git {}", shown);

        let mut cmd = Command::new("git");
        cmd.arg("-c")
            .arg(format!("user.name={}", self.config.user_name))
            .arg("-c")
            .arg(format!("user.email={}", self.config.user_email))
            .args(&args);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .map_err(|e| Error::Git(format!("Failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!(
                "git {} failed: {}",
                shown,
                self.redact(stderr.trim())
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a git command that talks to a remote
    fn run_remote<I, S>(&self, workdir: Option<&Path>, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.run(workdir, args).map_err(|e| match e {
            Error::Git(msg) => Error::Transport(msg),
            other => other,
        })
    }
}

fn open(workdir: &Path) -> Result<Repository> {
    Repository::open(workdir).map_err(|e| {
        if e.code() == git2::ErrorCode::NotFound {
            Error::NotFound(format!("Not a git repository: {}", workdir.display()))
        } else {
            Error::from(e)
        }
    })
}

impl VersionControl for GitCli {
    fn clone_repo(&self, repo: &RepoId, target_dir: &Path) -> Result<()> {
        if target_dir.exists() {
            debug!(dir = %target_dir.display(), "Removing previous clone");
            std::fs::remove_dir_all(target_dir)?;
        }

        if let Some(parent) = target_dir.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = self.remote_url(repo);
        let args: [&OsStr; 3] = ["clone".as_ref(), url.as_ref(), target_dir.as_os_str()];

        match self.run_remote(None, args) {
            Ok(_) => {}
            Err(Error::Transport(msg))
                if msg.contains("not found") || msg.contains("does not exist") =>
            {
                return Err(Error::NotFound(format!("Repository {}: {}", repo, msg)));
            }
            Err(e) => return Err(e),
        }

        self.rewrite_origin(target_dir, repo)
    }

    fn rewrite_origin(&self, workdir: &Path, repo: &RepoId) -> Result<()> {
        self.set_origin_url(workdir, &self.remote_url(repo))
    }

    fn origin_url(&self, workdir: &Path) -> Result<String> {
        let repo = open(workdir)?;
        let remote = repo.find_remote("origin").map_err(|e| {
            Error::Config(format!(
                "No 'origin' remote in {}: {}",
                workdir.display(),
                e.message()
            ))
        })?;
        let url = remote
            .url()
            .ok_or_else(|| Error::Config("Remote 'origin' has no URL".to_string()))?
            .to_string();
        Ok(url)
    }

    fn set_origin_url(&self, workdir: &Path, url: &str) -> Result<()> {
        self.run(Some(workdir), ["remote", "set-url", "origin", url])?;
        Ok(())
    }

    fn files_changed_since(
        &self,
        workdir: &Path,
        reference: &str,
        path_filter: &str,
    ) -> Result<Vec<String>> {
        let out = self.run(
            Some(workdir),
            ["diff", "--name-only", reference, "--", path_filter],
        )?;

        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    fn working_tree_clean(&self, workdir: &Path) -> Result<bool> {
        let repo = open(workdir)?;
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = repo.statuses(Some(&mut options))?;
        Ok(statuses.is_empty())
    }

    fn local_branch_exists(&self, workdir: &Path, name: &str) -> Result<bool> {
        let repo = open(workdir)?;
        let exists = match repo.find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        };
        exists
    }

    fn delete_local_branch(&self, workdir: &Path, name: &str) -> Result<()> {
        self.run(Some(workdir), ["branch", "-D", name])?;
        Ok(())
    }

    fn delete_remote_branch(&self, workdir: &Path, name: &str) -> Result<()> {
        self.run_remote(Some(workdir), ["push", "origin", "--delete", name])?;
        Ok(())
    }

    fn checkout_new(&self, workdir: &Path, name: &str) -> Result<()> {
        self.run(Some(workdir), ["checkout", "-b", name])?;
        Ok(())
    }

    fn checkout_existing(&self, workdir: &Path, name: &str) -> Result<()> {
        self.run(Some(workdir), ["checkout", name])?;
        Ok(())
    }

    fn stage(&self, workdir: &Path, path: &str) -> Result<()> {
        self.run(Some(workdir), ["add", "--all", "--", path])?;
        Ok(())
    }

    fn commit(&self, workdir: &Path, message: &str) -> Result<()> {
        self.run(Some(workdir), ["commit", "-m", message])?;
        Ok(())
    }

    fn push_branch(&self, workdir: &Path, name: &str) -> Result<()> {
        self.run_remote(Some(workdir), ["push", "-u", "origin", name])?;
        Ok(())
    }

    fn remote_tags(&self, workdir: &Path) -> Result<Vec<String>> {
        let out = self.run_remote(Some(workdir), ["ls-remote", "--tags", "origin"])?;
        Ok(parse_ls_remote_tags(&out))
    }

    fn add_tag(&self, workdir: &Path, name: &str) -> Result<()> {
        self.run(Some(workdir), ["tag", name])?;
        let refspec = format!("refs/tags/{}", name);
        self.run_remote(Some(workdir), ["push", "origin", refspec.as_str()])?;
        Ok(())
    }

    fn move_tag(&self, workdir: &Path, name: &str) -> Result<()> {
        let message = format!("Update tag `{}` to latest commit", name);
        self.run(Some(workdir), ["tag", "-fa", name, "-m", message.as_str()])?;
        let refspec = format!("refs/tags/{}", name);
        self.run_remote(
            Some(workdir),
            ["push", "origin", refspec.as_str(), "--force"],
        )?;
        Ok(())
    }
}
