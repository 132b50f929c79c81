//! Version resolution engine
//!
//! Maps a commit to `major.minor.patch` from where it sits in the branch
//! topology. The commit's branch is classified first and each class has its
//! own patch rule:
//!
//! - **Default branch**: the next, not yet branched minor after the most
//!   recent release branch whose branch point is a strict ancestor of the
//!   commit; patch counts default-branch commits since that branch point.
//!   Commits that predate every release branch are `0.0.<commits since root>`.
//! - **Release branch**: the branch's own minor; patch counts default-branch
//!   commits between the previous release's branch point and this one, plus
//!   the commits made on the release branch since it was cut.
//! - **Anything else**: the minor of the release branch sharing the commit's
//!   branch point (or the next unbranched minor) with the unreleasable patch
//!   65535.
//!
//! ```text
//! a -> b -> c -> d -> h -> i -> j -> l -> m      (main)
//!           |                   |
//!           c -> e -> f         j -> k           (release branches)
//!                |
//!                e -> g                          (topic branch)
//! ```
//!
//! `g` shares the branch point `c` with the release branch ending in `f`, so
//! it takes that release's minor.

use std::sync::Mutex;

use tracing::{debug, info};

use crate::build_number;
use crate::catalog::{ReleaseBranch, ReleaseCatalog};
use crate::domain::branch::{is_default_branch, BranchClass, ReleaseBranchMatcher};
use crate::domain::commit::{same_commit, short_id};
use crate::domain::version::Version;
use crate::error::{Result, VersionerError};
use crate::history::HistoryProvider;

/// Resolves versions and build numbers against one history provider.
///
/// The default branch and release-branch pattern come from the provider's
/// configuration and stay fixed for the engine's lifetime. The version of
/// the head commit is computed at most once per engine.
pub struct VersionEngine<H> {
    history: H,
    default_branch: String,
    matcher: ReleaseBranchMatcher,
    head_version: Mutex<Option<Version>>,
}

impl<H: HistoryProvider> VersionEngine<H> {
    pub fn new(history: H) -> Result<Self> {
        let config = history.config().clone();
        let matcher = config.release_matcher()?;

        Ok(VersionEngine {
            history,
            default_branch: config.default_branch,
            matcher,
            head_version: Mutex::new(None),
        })
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Version of `commit`, or of the head commit when `None`
    pub fn resolve(&self, commit: Option<&str>) -> Result<Version> {
        match commit {
            Some(commit) => self.resolve_commit(commit),
            None => self.resolve_head(),
        }
    }

    /// Version of the head commit, memoized.
    ///
    /// The lock is held while computing, so concurrent callers wait for the
    /// first computation instead of repeating it. A failed computation is not
    /// cached.
    pub fn resolve_head(&self) -> Result<Version> {
        let mut cached = self
            .head_version
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(version) = *cached {
            return Ok(version);
        }

        let head = self.head()?;
        info!(head = %short_id(&head), "determined head commit");
        let version = self.resolve_commit(&head)?;
        *cached = Some(version);
        Ok(version)
    }

    /// Version of an arbitrary commit (never cached)
    pub fn resolve_commit(&self, commit: &str) -> Result<Version> {
        let catalog = self.catalog()?;
        let (branch, class) = self.classify(commit, &catalog)?;
        self.resolve_classified(commit, &branch, class, &catalog)
    }

    /// Build number of `commit`, or of the head commit when `None`.
    ///
    /// `"0"` for any commit not on a release branch.
    pub fn build_number(&self, commit: Option<&str>) -> Result<String> {
        let target = match commit {
            Some(commit) => commit.to_string(),
            None => self.head()?,
        };
        let catalog = self.catalog()?;
        let (branch, class) = self.classify(&target, &catalog)?;

        if !matches!(class, BranchClass::Release(_)) {
            debug!(%branch, "not on a release branch, build number is not releasable");
            return Ok(build_number::UNRELEASABLE_BUILD.to_string());
        }

        let version = match commit {
            Some(_) => self.resolve_classified(&target, &branch, class, &catalog)?,
            None => self.resolve_head()?,
        };
        Ok(build_number::build_number(class, version))
    }

    /// Release branches currently known to the provider
    pub fn catalog(&self) -> Result<ReleaseCatalog> {
        ReleaseCatalog::discover(&self.history, &self.matcher)
            .map_err(|e| VersionerError::query("get_all_branches", "", e))
    }

    /// Branch of `commit` and its class.
    ///
    /// Fails when the branch looks like a release branch but is missing from
    /// the catalog, e.g. because it was never pushed.
    pub fn classify(&self, commit: &str, catalog: &ReleaseCatalog) -> Result<(String, BranchClass)> {
        let branch = self.query("get_branch_for_commit", &[commit], |h| {
            h.get_branch_for_commit(commit)
        })?;
        info!(%branch, commit = %short_id(commit), "determined branch");

        let class = if is_default_branch(&branch, &self.default_branch, self.matcher.remote()) {
            BranchClass::Default
        } else if self.matcher.is_match(&branch) {
            match catalog.position(&branch, &self.matcher) {
                Some(index) => BranchClass::Release(index),
                None => return Err(VersionerError::ReleaseBranchNotFound { branch }),
            }
        } else {
            BranchClass::Other
        };

        Ok((branch, class))
    }

    fn resolve_classified(
        &self,
        commit: &str,
        branch: &str,
        class: BranchClass,
        catalog: &ReleaseCatalog,
    ) -> Result<Version> {
        let version = match class {
            BranchClass::Default => self.resolve_on_default(commit, catalog)?,
            BranchClass::Release(index) => self.resolve_on_release(commit, index, catalog)?,
            BranchClass::Other => self.resolve_elsewhere(commit, catalog)?,
        };
        info!(
            %branch,
            %version,
            releasable = !version.is_unreleasable(),
            "resolved version"
        );
        Ok(version)
    }

    fn resolve_on_default(&self, commit: &str, catalog: &ReleaseCatalog) -> Result<Version> {
        let mut latest: Option<&ReleaseBranch> = None;

        for release in catalog {
            let branch_point = self.merge_base(&release.branch, &self.default_branch)?;
            // sitting exactly on the cut point still belongs to the previous line
            let is_ancestor = !same_commit(&branch_point, commit)
                && self.query("is_ancestor", &[branch_point.as_str(), commit], |h| {
                    h.is_ancestor(&branch_point, commit)
                })?;
            if !is_ancestor {
                break;
            }
            latest = Some(release);
        }

        match latest {
            Some(release) => {
                let branch_point = self.merge_base(&self.default_branch, &release.branch)?;
                let patch = self.distance(&branch_point, commit)?;
                debug!(
                    release = %release.branch,
                    patch,
                    "on the default branch, versioned as the next unreleased minor"
                );
                Ok(release.version.next_minor()?.with_patch(patch))
            }
            None => {
                let first = self.query("get_first_commit", &[], |h| h.get_first_commit())?;
                let patch = self.distance(&first, commit)?;
                debug!(patch, "no release branch precedes this commit");
                Ok(Version::new(0, 0, patch))
            }
        }
    }

    fn resolve_on_release(
        &self,
        commit: &str,
        index: usize,
        catalog: &ReleaseCatalog,
    ) -> Result<Version> {
        let release = catalog.get(index).ok_or_else(|| VersionerError::ReleaseBranchNotFound {
            branch: format!("#{}", index),
        })?;

        let patch = match index.checked_sub(1).and_then(|previous| catalog.get(previous)) {
            None => {
                let first = self.query("get_first_commit", &[], |h| h.get_first_commit())?;
                self.distance(&first, commit)?
            }
            Some(previous) => {
                let previous_point = self.merge_base(&self.default_branch, &previous.branch)?;
                let branch_point = self.merge_base(&self.default_branch, &release.branch)?;
                let between_releases = self.distance(&previous_point, &branch_point)?;
                let since_branch = self.distance(&branch_point, commit)?;
                debug!(
                    previous = %previous.branch,
                    between_releases,
                    since_branch,
                    "on an active release branch"
                );
                between_releases.checked_add(since_branch).ok_or_else(|| {
                    VersionerError::version(format!(
                        "patch for {} on {} overflows",
                        short_id(commit),
                        release.branch
                    ))
                })?
            }
        };

        Ok(release.version.with_patch(patch))
    }

    fn resolve_elsewhere(&self, commit: &str, catalog: &ReleaseCatalog) -> Result<Version> {
        let mut nearest = None;

        if !catalog.is_empty() {
            let commit_point = self.merge_base(&self.default_branch, commit)?;
            for release in catalog {
                let branch_point = self.merge_base(&self.default_branch, &release.branch)?;
                if same_commit(&branch_point, &commit_point) {
                    nearest = Some(release);
                    break;
                }
            }
        }

        let base = match nearest {
            Some(release) => {
                debug!(release = %release.branch, "determined the nearest release branch");
                release.version
            }
            None => {
                debug!("no release branch shares this branch point, using the next minor");
                catalog.next_unbranched()?
            }
        };
        Ok(base.with_patch(Version::UNRELEASABLE_PATCH))
    }

    fn head(&self) -> Result<String> {
        self.query("get_head_sha", &[], |h| h.get_head_sha())
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        self.query("get_merge_base", &[a, b], |h| h.get_merge_base(a, b))
    }

    fn distance(&self, from: &str, to: &str) -> Result<u32> {
        self.query("get_distance", &[from, to], |h| h.get_distance(from, to))
    }

    /// Run a provider query, naming it and its arguments on failure
    fn query<T>(
        &self,
        name: &'static str,
        args: &[&str],
        run: impl FnOnce(&H) -> Result<T>,
    ) -> Result<T> {
        run(&self.history).map_err(|e| VersionerError::query(name, args.join(", "), e))
    }
}
