//! Commit history abstraction layer
//!
//! This module provides a trait-based abstraction over the topology queries
//! the version engine needs, so the same resolution rules run against a
//! local repository, a hosted repository, or an in-memory graph in tests.
//!
//! # Overview
//!
//! The primary abstraction is the [HistoryProvider] trait. The concrete
//! implementations are:
//!
//! - [local::LocalHistory]: an on-disk repository opened with `git2`
//! - [github::GitHubHistory]: a GitHub repository queried over the REST API
//! - [mock::MockHistory]: an in-memory commit graph for testing
//!
//! # Branch names
//!
//! Callers pass plain branch names (`main`, `release-4.1.x`); a name may also
//! carry the configured remote prefix (`origin/main`). Providers normalize
//! both forms the same way: the local provider resolves every branch to its
//! remote-tracking ref first and falls back to the local branch, the GitHub
//! provider drops the prefix.
//!
//! ```rust
//! # use deterministic_versions::history::HistoryProvider;
//! # fn example<H: HistoryProvider>(history: &H) -> deterministic_versions::Result<()> {
//! let head = history.get_head_sha()?;
//! let branch_point = history.get_merge_base("main", "release-4.1.x")?;
//! let commits_since = history.get_distance(&branch_point, &head)?;
//! # let _ = commits_since;
//! # Ok(())
//! # }
//! ```

pub mod github;
pub mod local;
pub mod mock;

pub use github::{GitHubHistory, GitHubOptions};
pub use local::LocalHistory;
pub use mock::MockHistory;

use crate::domain::branch::{is_default_branch, ReleaseBranchMatcher};
use crate::error::Result;

/// Default name of the mainline branch
pub const DEFAULT_BRANCH: &str = "main";

/// Default name of the remote whose tracking branches are authoritative
pub const DEFAULT_REMOTE: &str = "origin";

/// Configuration shared by every history provider.
///
/// Fixed at construction and immutable for the provider's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Name of the default branch, without remote prefix
    pub default_branch: String,
    /// Remote whose `<remote>/` prefix is normalized away
    pub remote: String,
}

impl HistoryConfig {
    pub fn new(default_branch: impl Into<String>, remote: impl Into<String>) -> Self {
        HistoryConfig {
            default_branch: default_branch.into(),
            remote: remote.into(),
        }
    }

    /// Matcher for release branch names under this remote
    pub fn release_matcher(&self) -> Result<ReleaseBranchMatcher> {
        ReleaseBranchMatcher::new(self.remote.clone())
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig::new(DEFAULT_BRANCH, DEFAULT_REMOTE)
    }
}

/// Topology queries over a repository's commit graph.
///
/// ## Thread Safety
///
/// All implementors must be `Send + Sync` so one engine can be shared across
/// threads.
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. A branch or commit that
/// cannot be resolved is reported as [crate::error::VersionerError::Branch];
/// transport failures keep their own variants. Implementations never retry.
pub trait HistoryProvider: Send + Sync {
    /// Provider configuration (default branch and remote)
    fn config(&self) -> &HistoryConfig;

    /// All branch names available on the remote.
    ///
    /// Names may carry the remote prefix. Branches that exist only in a
    /// local checkout are not included.
    fn get_all_branches(&self) -> Result<Vec<String>>;

    /// The branch a commit belongs to.
    ///
    /// When several branches contain the commit the choice is deterministic:
    /// the default branch first, then the earliest release branch. A commit
    /// on no such branch is reported under a branch whose tip it is, or as
    /// its own id.
    fn get_branch_for_commit(&self, commit: &str) -> Result<String>;

    /// Most recent common ancestor of two branches or commits
    fn get_merge_base(&self, a: &str, b: &str) -> Result<String>;

    /// Whether `ancestor` is in the history of `descendant` (a commit is its
    /// own ancestor)
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Number of commits reachable from `to` but not from `from`
    fn get_distance(&self, from: &str, to: &str) -> Result<u32>;

    /// Root commit of the default branch's history
    fn get_first_commit(&self) -> Result<String>;

    /// Commit currently checked out (or the tip of the tracked ref)
    fn get_head_sha(&self) -> Result<String>;
}

impl<H: HistoryProvider + ?Sized> HistoryProvider for Box<H> {
    fn config(&self) -> &HistoryConfig {
        (**self).config()
    }

    fn get_all_branches(&self) -> Result<Vec<String>> {
        (**self).get_all_branches()
    }

    fn get_branch_for_commit(&self, commit: &str) -> Result<String> {
        (**self).get_branch_for_commit(commit)
    }

    fn get_merge_base(&self, a: &str, b: &str) -> Result<String> {
        (**self).get_merge_base(a, b)
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        (**self).is_ancestor(ancestor, descendant)
    }

    fn get_distance(&self, from: &str, to: &str) -> Result<u32> {
        (**self).get_distance(from, to)
    }

    fn get_first_commit(&self) -> Result<String> {
        (**self).get_first_commit()
    }

    fn get_head_sha(&self) -> Result<String> {
        (**self).get_head_sha()
    }
}

/// Order the branches that may own a commit.
///
/// Keeps only the default branch and release branches, strips the remote
/// prefix, drops duplicates, and sorts the default branch first followed by
/// release branches in ascending (major, minor) order.
pub fn candidate_branches<I, S>(
    names: I,
    config: &HistoryConfig,
    matcher: &ReleaseBranchMatcher,
) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ranked: Vec<((u8, u32, u32), String)> = Vec::new();

    for name in names {
        let name = matcher.strip_remote(name.as_ref());
        let rank = if is_default_branch(name, &config.default_branch, &config.remote) {
            (0, 0, 0)
        } else if let Some((major, minor)) = matcher.parse(name) {
            (1, major, minor)
        } else {
            continue;
        };

        if !ranked.iter().any(|(_, existing)| existing == name) {
            ranked.push((rank, name.to_string()));
        }
    }

    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, name)| name).collect()
}
