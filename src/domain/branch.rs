use crate::error::{Result, VersionerError};
use regex::Regex;

/// Branch context of a commit being versioned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchClass {
    /// The configured default branch (e.g. "main")
    Default,
    /// An active release branch, by index into the release catalog
    Release(usize),
    /// Feature/topic branch, detached commit, or anything else
    Other,
}

/// Recognizes `release-<major>.<minor>.x`, optionally behind a remote prefix
#[derive(Debug, Clone)]
pub struct ReleaseBranchMatcher {
    regex: Regex,
    remote: String,
}

impl ReleaseBranchMatcher {
    /// Build a matcher that also accepts names prefixed with `<remote>/`
    pub fn new(remote: impl Into<String>) -> Result<Self> {
        let remote = remote.into();
        let pattern = format!(
            r"^(?:{}/)?release-([0-9]+)\.([0-9]+)\.x$",
            regex::escape(&remote)
        );
        let regex = Regex::new(&pattern).map_err(|e| {
            VersionerError::config(format!("Invalid remote name '{}': {}", remote, e))
        })?;

        Ok(ReleaseBranchMatcher { regex, remote })
    }

    /// The remote whose prefix is normalized away
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Whether the name is a release branch
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Parse (major, minor) out of a release branch name.
    ///
    /// Returns `None` for non-release names and for numbers that do not fit
    /// in a `u32`.
    pub fn parse(&self, name: &str) -> Option<(u32, u32)> {
        let captures = self.regex.captures(name)?;
        let major = captures.get(1)?.as_str().parse::<u32>().ok()?;
        let minor = captures.get(2)?.as_str().parse::<u32>().ok()?;
        Some((major, minor))
    }

    /// Drop a leading `<remote>/` from a branch name
    pub fn strip_remote<'a>(&self, name: &'a str) -> &'a str {
        strip_remote(name, &self.remote)
    }
}

/// Drop a leading `<remote>/` from a branch name
pub fn strip_remote<'a>(name: &'a str, remote: &str) -> &'a str {
    name.strip_prefix(remote)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name)
}

/// Whether `name` is the default branch, with or without the remote prefix
pub fn is_default_branch(name: &str, default_branch: &str, remote: &str) -> bool {
    strip_remote(name, remote) == default_branch
}
