//! Release-branch catalog
//!
//! Discovers the `release-<major>.<minor>.x` branches of a repository and
//! orders them by version. The order defines which release branch is
//! "previous" and which is "last" for version resolution.

use crate::domain::branch::ReleaseBranchMatcher;
use crate::domain::version::Version;
use crate::error::Result;
use crate::history::HistoryProvider;
use tracing::debug;

/// A release line and the version it was cut for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseBranch {
    /// Branch name without remote prefix
    pub branch: String,
    /// `(major, minor, 0)`
    pub version: Version,
}

/// Release branches sorted ascending by (major, minor), one per release line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseCatalog {
    branches: Vec<ReleaseBranch>,
}

impl ReleaseCatalog {
    /// Build the catalog from every branch the provider knows about
    pub fn discover<H: HistoryProvider + ?Sized>(
        history: &H,
        matcher: &ReleaseBranchMatcher,
    ) -> Result<Self> {
        let names = history.get_all_branches()?;
        let catalog = Self::from_branch_names(&names, matcher);
        debug!(
            release_branches = ?catalog.iter().map(|r| r.branch.as_str()).collect::<Vec<_>>(),
            "discovered release branches"
        );
        Ok(catalog)
    }

    /// Build the catalog from raw branch names.
    ///
    /// Non-matching names are ignored. The first name seen for a (major,
    /// minor) pair wins, so a branch listed both locally and under the
    /// remote appears once. Input order does not affect the result beyond
    /// that choice.
    pub fn from_branch_names<I, S>(names: I, matcher: &ReleaseBranchMatcher) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut branches: Vec<ReleaseBranch> = Vec::new();

        for name in names {
            let name = matcher.strip_remote(name.as_ref());
            let Some((major, minor)) = matcher.parse(name) else {
                continue;
            };
            let version = Version::new(major, minor, 0);
            if branches.iter().any(|existing| existing.version == version) {
                continue;
            }
            branches.push(ReleaseBranch {
                branch: name.to_string(),
                version,
            });
        }

        // stable, so equal keys keep discovery order
        branches.sort_by_key(|release| release.version);
        ReleaseCatalog { branches }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReleaseBranch> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ReleaseBranch> {
        self.branches.get(index)
    }

    pub fn last(&self) -> Option<&ReleaseBranch> {
        self.branches.last()
    }

    /// Index of a branch, with or without the remote prefix
    pub fn position(&self, name: &str, matcher: &ReleaseBranchMatcher) -> Option<usize> {
        let name = matcher.strip_remote(name);
        self.branches.iter().position(|release| release.branch == name)
    }

    /// The minor line after the last release branch, which has not been
    /// branched yet. `0.0.0` when there are no release branches.
    pub fn next_unbranched(&self) -> Result<Version> {
        match self.last() {
            Some(release) => release.version.next_minor(),
            None => Ok(Version::default()),
        }
    }
}

impl<'a> IntoIterator for &'a ReleaseCatalog {
    type Item = &'a ReleaseBranch;
    type IntoIter = std::slice::Iter<'a, ReleaseBranch>;

    fn into_iter(self) -> Self::IntoIter {
        self.branches.iter()
    }
}
