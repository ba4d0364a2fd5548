//! In-memory fakes for the version control and code host capabilities

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::host::{CodeHost, NewPullRequest, PullRequestApprover, PullRequestRef};
use crate::{Error, RepoId, Result, SyncSettings, VersionControl};

pub const SOURCE_WORKFLOW: &str = "uses: acme/common/.github/workflows/build.yml@main\n";
/// `origin` of the source checkout before a run
pub const SOURCE_ORIGIN: &str = "git@github.com:acme/common.git";
pub const SYNCED_WORKFLOW_V5: &str = "uses: acme/common/.github/workflows/build.yml@v5\n";

pub fn repo(name: &str) -> RepoId {
    RepoId::parse(name).unwrap()
}

/// State of the hosted repositories shared by the fake git client and host
#[derive(Debug, Default)]
pub struct Remote {
    pub branches: HashSet<(RepoId, String)>,
    pub pull_requests: Vec<(RepoId, NewPullRequest)>,
    pub approvals: Vec<(RepoId, u64)>,
    pub merged: Vec<(RepoId, u64)>,
}

pub type SharedRemote = Arc<Mutex<Remote>>;

/// Fake `VersionControl` that materializes fixture files on clone
#[derive(Default)]
pub struct FakeVcs {
    pub remote: SharedRemote,
    /// Files of each hosted repository, by relative path
    pub fixtures: HashMap<RepoId, Vec<(String, String)>>,
    /// Feature branches left behind locally by an earlier attempt
    pub stale_local: HashSet<(RepoId, String)>,
    pub fail_clone: HashSet<RepoId>,
    /// Tags on the source remote
    pub tags: Mutex<Vec<String>>,
    /// `files_changed_since` results keyed by (reference, filter)
    pub changed: HashMap<(String, String), Vec<String>>,
    pub calls: Mutex<Vec<String>>,
    clones: Mutex<HashMap<PathBuf, RepoId>>,
    snapshots: Mutex<HashMap<PathBuf, BTreeMap<String, String>>>,
    local_branches: Mutex<HashMap<PathBuf, HashSet<String>>>,
}

impl FakeVcs {
    pub fn new(remote: SharedRemote) -> Self {
        Self {
            remote,
            ..Self::default()
        }
    }

    pub fn with_fixture(mut self, repo: &RepoId, files: &[(&str, &str)]) -> Self {
        self.fixtures.insert(
            repo.clone(),
            files
                .iter()
                .map(|(path, contents)| (path.to_string(), contents.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_tags(self, tags: &[&str]) -> Self {
        *self.tags.lock().unwrap() = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_changed(mut self, reference: &str, filter: &str, files: &[&str]) -> Self {
        self.changed.insert(
            (reference.to_string(), filter.to_string()),
            files.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn repo_at(&self, workdir: &Path) -> Result<RepoId> {
        self.clones
            .lock()
            .unwrap()
            .get(workdir)
            .cloned()
            .ok_or_else(|| Error::Git(format!("not a clone: {}", workdir.display())))
    }
}

fn read_tree(root: &Path) -> BTreeMap<String, String> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
                out.insert(rel, std::fs::read_to_string(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

impl VersionControl for FakeVcs {
    fn clone_repo(&self, repo: &RepoId, target_dir: &Path) -> Result<()> {
        self.record(format!("clone {}", repo));

        if self.fail_clone.contains(repo) {
            return Err(Error::Transport(format!("could not read from {}", repo)));
        }

        if target_dir.exists() {
            std::fs::remove_dir_all(target_dir)?;
        }
        std::fs::create_dir_all(target_dir)?;

        for (path, contents) in self.fixtures.get(repo).into_iter().flatten() {
            let file = target_dir.join(path);
            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(file, contents)?;
        }

        let mut branches: HashSet<String> = HashSet::from(["main".to_string()]);
        branches.extend(
            self.stale_local
                .iter()
                .filter(|(r, _)| r == repo)
                .map(|(_, b)| b.clone()),
        );

        self.clones
            .lock()
            .unwrap()
            .insert(target_dir.to_path_buf(), repo.clone());
        self.snapshots
            .lock()
            .unwrap()
            .insert(target_dir.to_path_buf(), read_tree(target_dir));
        self.local_branches
            .lock()
            .unwrap()
            .insert(target_dir.to_path_buf(), branches);
        Ok(())
    }

    fn rewrite_origin(&self, _workdir: &Path, repo: &RepoId) -> Result<()> {
        self.record(format!("rewrite_origin {}", repo));
        Ok(())
    }

    fn origin_url(&self, _workdir: &Path) -> Result<String> {
        Ok(SOURCE_ORIGIN.to_string())
    }

    fn set_origin_url(&self, _workdir: &Path, url: &str) -> Result<()> {
        self.record(format!("set_origin_url {}", url));
        Ok(())
    }

    fn files_changed_since(
        &self,
        _workdir: &Path,
        reference: &str,
        path_filter: &str,
    ) -> Result<Vec<String>> {
        self.record(format!("diff {} {}", reference, path_filter));
        Ok(self
            .changed
            .get(&(reference.to_string(), path_filter.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn working_tree_clean(&self, workdir: &Path) -> Result<bool> {
        let snapshots = self.snapshots.lock().unwrap();
        let snapshot = snapshots
            .get(workdir)
            .ok_or_else(|| Error::Git(format!("not a clone: {}", workdir.display())))?;
        Ok(*snapshot == read_tree(workdir))
    }

    fn local_branch_exists(&self, workdir: &Path, name: &str) -> Result<bool> {
        Ok(self
            .local_branches
            .lock()
            .unwrap()
            .get(workdir)
            .is_some_and(|branches| branches.contains(name)))
    }

    fn delete_local_branch(&self, workdir: &Path, name: &str) -> Result<()> {
        self.record(format!("delete_local {}", name));
        let mut local = self.local_branches.lock().unwrap();
        let removed = local
            .get_mut(workdir)
            .is_some_and(|branches| branches.remove(name));
        if !removed {
            return Err(Error::Git(format!("branch '{}' not found", name)));
        }
        Ok(())
    }

    fn delete_remote_branch(&self, workdir: &Path, name: &str) -> Result<()> {
        self.record(format!("delete_remote {}", name));
        let repo = self.repo_at(workdir)?;
        self.remote
            .lock()
            .unwrap()
            .branches
            .remove(&(repo, name.to_string()));
        Ok(())
    }

    fn checkout_new(&self, workdir: &Path, name: &str) -> Result<()> {
        self.record(format!("checkout_new {}", name));
        let mut local = self.local_branches.lock().unwrap();
        let branches = local.entry(workdir.to_path_buf()).or_default();
        if !branches.insert(name.to_string()) {
            return Err(Error::Git(format!("branch '{}' already exists", name)));
        }
        Ok(())
    }

    fn checkout_existing(&self, _workdir: &Path, name: &str) -> Result<()> {
        self.record(format!("checkout {}", name));
        Ok(())
    }

    fn stage(&self, _workdir: &Path, path: &str) -> Result<()> {
        self.record(format!("stage {}", path));
        Ok(())
    }

    fn commit(&self, workdir: &Path, message: &str) -> Result<()> {
        self.record(format!("commit {}", message));
        self.snapshots
            .lock()
            .unwrap()
            .insert(workdir.to_path_buf(), read_tree(workdir));
        Ok(())
    }

    fn push_branch(&self, workdir: &Path, name: &str) -> Result<()> {
        self.record(format!("push {}", name));
        let repo = self.repo_at(workdir)?;
        self.remote
            .lock()
            .unwrap()
            .branches
            .insert((repo, name.to_string()));
        Ok(())
    }

    fn remote_tags(&self, _workdir: &Path) -> Result<Vec<String>> {
        Ok(self.tags.lock().unwrap().clone())
    }

    fn add_tag(&self, _workdir: &Path, name: &str) -> Result<()> {
        self.record(format!("add_tag {}", name));
        let mut tags = self.tags.lock().unwrap();
        if tags.iter().any(|t| t == name) {
            return Err(Error::Git(format!("tag '{}' already exists", name)));
        }
        tags.push(name.to_string());
        Ok(())
    }

    fn move_tag(&self, _workdir: &Path, name: &str) -> Result<()> {
        self.record(format!("move_tag {}", name));
        Ok(())
    }
}

/// Fake author identity
#[derive(Default)]
pub struct FakeHost {
    pub remote: SharedRemote,
    pub fail_create: HashSet<RepoId>,
    pub fail_merge: HashSet<RepoId>,
}

impl FakeHost {
    pub fn new(remote: SharedRemote) -> Self {
        Self {
            remote,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CodeHost for FakeHost {
    async fn default_branch(&self, _repo: &RepoId) -> Result<String> {
        Ok("main".to_string())
    }

    async fn remote_branch_exists(&self, repo: &RepoId, branch: &str) -> Result<bool> {
        Ok(self
            .remote
            .lock()
            .unwrap()
            .branches
            .contains(&(repo.clone(), branch.to_string())))
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        request: &NewPullRequest,
    ) -> Result<PullRequestRef> {
        if self.fail_create.contains(repo) {
            return Err(Error::Api {
                status: 422,
                body: "Validation Failed".to_string(),
            });
        }

        let mut remote = self.remote.lock().unwrap();
        remote.pull_requests.push((repo.clone(), request.clone()));
        let number = remote.pull_requests.len() as u64;

        Ok(PullRequestRef {
            number,
            title: request.title.clone(),
            url: format!("https://github.com/{}/pull/{}", repo, number),
            head: request.head.clone(),
            base: request.base.clone(),
            merged: false,
        })
    }

    async fn merge_pull_request(
        &self,
        repo: &RepoId,
        pull_request: &PullRequestRef,
    ) -> Result<PullRequestRef> {
        if self.fail_merge.contains(repo) {
            return Err(Error::Api {
                status: 405,
                body: "Required status check is pending".to_string(),
            });
        }

        self.remote
            .lock()
            .unwrap()
            .merged
            .push((repo.clone(), pull_request.number));

        Ok(PullRequestRef {
            merged: true,
            ..pull_request.clone()
        })
    }
}

/// Fake approver identity
#[derive(Default)]
pub struct FakeApprover {
    pub remote: SharedRemote,
    pub fail: bool,
}

impl FakeApprover {
    pub fn new(remote: SharedRemote) -> Self {
        Self {
            remote,
            fail: false,
        }
    }
}

#[async_trait]
impl PullRequestApprover for FakeApprover {
    async fn approve_pull_request(
        &self,
        repo: &RepoId,
        pull_request: &PullRequestRef,
    ) -> Result<()> {
        if self.fail {
            return Err(Error::Api {
                status: 422,
                body: "Can not approve your own pull request".to_string(),
            });
        }

        self.remote
            .lock()
            .unwrap()
            .approvals
            .push((repo.clone(), pull_request.number));
        Ok(())
    }
}

/// A source checkout holding one synced workflow and one local-only workflow
pub fn source_checkout(root: &Path) -> PathBuf {
    let workflows = root.join(".github/workflows");
    std::fs::create_dir_all(&workflows).unwrap();
    std::fs::write(workflows.join("synced_ci.yml"), SOURCE_WORKFLOW).unwrap();
    std::fs::write(workflows.join("release.yml"), "name: release\n").unwrap();
    root.to_path_buf()
}

pub fn settings(clone_root: &Path) -> SyncSettings {
    SyncSettings {
        workflow_dir: ".github/workflows".to_string(),
        feature_branch: "sync-workflows".to_string(),
        pr_title: "(sync): update workflows".to_string(),
        pr_body: "*Automatically generated by wsync.*".to_string(),
        commit_message: "sync workflows".to_string(),
        reference_token: "@main".to_string(),
        clone_root: clone_root.to_path_buf(),
    }
}
