use crate::domain::branch::strip_remote;
use crate::error::{Result, VersionerError};
use crate::history::{candidate_branches, HistoryConfig, HistoryProvider};
use git2::{BranchType, Oid, Repository};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// History provider backed by an on-disk repository
pub struct LocalHistory {
    repo: Mutex<Repository>,
    config: HistoryConfig,
}

impl LocalHistory {
    /// Open or discover a git repository at `path`
    pub fn open<P: AsRef<Path>>(path: P, config: HistoryConfig) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VersionerError::config(format!(
                "Attempted to use path {} but it doesn't exist",
                path.display()
            )));
        }

        let repo = Repository::discover(path)?;
        debug!(path = %path.display(), "opened local repository");

        Ok(Self::from_git2(repo, config))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Repository, config: HistoryConfig) -> Self {
        LocalHistory {
            repo: Mutex::new(repo),
            config,
        }
    }

    fn repo(&self) -> MutexGuard<'_, Repository> {
        self.repo.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve a branch name or revspec to a commit.
    ///
    /// Branch names resolve to `refs/remotes/<remote>/<name>` when present,
    /// then to `refs/heads/<name>`; anything else goes through revparse.
    fn resolve(&self, repo: &Repository, spec: &str) -> Result<Oid> {
        if spec != "HEAD" {
            let name = strip_remote(spec, &self.config.remote);
            let candidates = [
                format!("refs/remotes/{}/{}", self.config.remote, name),
                format!("refs/heads/{}", name),
            ];
            for reference_name in &candidates {
                if let Ok(reference) = repo.find_reference(reference_name) {
                    return Ok(reference.peel_to_commit()?.id());
                }
            }
        }

        repo.revparse_single(spec)
            .and_then(|object| object.peel_to_commit())
            .map(|commit| commit.id())
            .map_err(|e| VersionerError::branch(format!("Cannot resolve '{}': {}", spec, e)))
    }

    /// Branches on the configured remote, as `<remote>/<name>`
    fn remote_branch_names(&self, repo: &Repository) -> Result<Vec<String>> {
        let remote_prefix = format!("{}/", self.config.remote);
        let mut names = Vec::new();

        for branch in repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                if name.starts_with(&remote_prefix) && !name.ends_with("/HEAD") {
                    names.push(name.to_string());
                }
            }
        }

        Ok(names)
    }

    /// Remote branches followed by local branches
    fn branch_names(&self, repo: &Repository) -> Result<Vec<String>> {
        let mut names = self.remote_branch_names(repo)?;

        for branch in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }

    /// Name of the checked-out branch when HEAD is attached and points at `oid`
    fn checked_out_branch_at(&self, repo: &Repository, oid: Oid) -> Option<String> {
        let head = repo.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        let tip = head.peel_to_commit().ok()?.id();
        if tip != oid {
            return None;
        }
        head.shorthand().map(|name| name.to_string())
    }
}

impl HistoryProvider for LocalHistory {
    fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Only branches pushed to the configured remote count, so a release
    /// branch that exists only locally is never cataloged.
    fn get_all_branches(&self) -> Result<Vec<String>> {
        let repo = self.repo();
        self.remote_branch_names(&repo)
    }

    fn get_branch_for_commit(&self, commit: &str) -> Result<String> {
        let repo = self.repo();
        let oid = self.resolve(&repo, commit)?;

        if let Some(branch) = self.checked_out_branch_at(&repo, oid) {
            debug!(%branch, "commit is the tip of the checked-out branch");
            return Ok(branch);
        }

        let names = self.branch_names(&repo)?;
        let matcher = self.config.release_matcher()?;

        for candidate in candidate_branches(&names, &self.config, &matcher) {
            let tip = self.resolve(&repo, &candidate)?;
            if tip == oid || repo.graph_descendant_of(tip, oid)? {
                debug!(branch = %candidate, "commit is contained in branch");
                return Ok(candidate);
            }
        }

        for name in &names {
            if self.resolve(&repo, name)? == oid {
                debug!(branch = %name, "commit is the tip of a non-release branch");
                return Ok(strip_remote(name, &self.config.remote).to_string());
            }
        }

        debug!(commit = %oid, "commit does not appear on any branch");
        Ok(oid.to_string())
    }

    fn get_merge_base(&self, a: &str, b: &str) -> Result<String> {
        let repo = self.repo();
        let a = self.resolve(&repo, a)?;
        let b = self.resolve(&repo, b)?;
        Ok(repo.merge_base(a, b)?.to_string())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let repo = self.repo();
        let ancestor = self.resolve(&repo, ancestor)?;
        let descendant = self.resolve(&repo, descendant)?;
        Ok(ancestor == descendant || repo.graph_descendant_of(descendant, ancestor)?)
    }

    fn get_distance(&self, from: &str, to: &str) -> Result<u32> {
        let repo = self.repo();
        let from = self.resolve(&repo, from)?;
        let to = self.resolve(&repo, to)?;

        let mut revwalk = repo.revwalk()?;
        revwalk.push(to)?;
        revwalk.hide(from)?;

        let mut count: u32 = 0;
        for oid in revwalk {
            oid?;
            count += 1;
        }
        Ok(count)
    }

    fn get_first_commit(&self) -> Result<String> {
        let repo = self.repo();
        let tip = self.resolve(&repo, &self.config.default_branch)?;

        let mut commit = repo.find_commit(tip)?;
        while let Some(parent) = commit.parent_ids().next() {
            commit = repo.find_commit(parent)?;
        }
        Ok(commit.id().to_string())
    }

    fn get_head_sha(&self) -> Result<String> {
        let repo = self.repo();
        let head = repo.head()?.peel_to_commit()?;
        Ok(head.id().to_string())
    }
}
