//! history::github
//!
//! History provider for a repository hosted on GitHub, using the REST API.
//!
//! # Queries
//!
//! - branches: `GET /repos/{owner}/{repo}/branches`, paginated
//! - merge-base, ancestry and distance: `GET /repos/{owner}/{repo}/compare/{base}...{head}`
//!   (`merge_base_commit`, `status`, `ahead_by`)
//! - head: `GET /repos/{owner}/{repo}/commits/{ref}`
//! - first commit: the last page of `GET /repos/{owner}/{repo}/commits?per_page=1`,
//!   located through the `Link` header
//!
//! # Failures
//!
//! Requests use a fixed timeout and are never retried. Authentication
//! failures, rate limiting and missing objects map onto
//! [`VersionerError`] variants; a 404 is reported as a branch error naming
//! the ref that could not be found.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, LINK};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::domain::branch::strip_remote;
use crate::domain::commit::same_commit;
use crate::error::{Result, VersionerError};
use crate::history::{candidate_branches, HistoryConfig, HistoryProvider};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "deterministic-versions";

/// Largest page size the API accepts.
const PER_PAGE: usize = 100;

/// Connection settings for [`GitHubHistory`].
#[derive(Clone)]
pub struct GitHubOptions {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// API base URL (configurable for GitHub Enterprise and tests)
    pub api_base: String,
    /// Bearer token; anonymous requests when absent
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Ref treated as HEAD; the default branch when absent
    pub head_ref: Option<String>,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubOptions")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .field("has_token", &self.token.is_some())
            .field("timeout", &self.timeout)
            .field("head_ref", &self.head_ref)
            .finish()
    }
}

impl GitHubOptions {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        GitHubOptions {
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
            head_ref: None,
        }
    }

    /// Parse an `OWNER/REPO` slug
    pub fn from_slug(slug: &str) -> Result<Self> {
        match slug.trim().split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(Self::new(owner, repo.trim_end_matches(".git")))
            }
            _ => Err(VersionerError::config(format!(
                "Invalid GitHub repository '{}', expected OWNER/REPO",
                slug
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubBranch {
    name: String,
    commit: GitHubCommitRef,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubComparison {
    status: CompareStatus,
    ahead_by: u32,
    merge_base_commit: GitHubCommitRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CompareStatus {
    Ahead,
    Behind,
    Identical,
    Diverged,
}

impl CompareStatus {
    /// Whether the compare base is in the history of the compare head
    fn base_is_ancestor(self) -> bool {
        matches!(self, CompareStatus::Ahead | CompareStatus::Identical)
    }
}

/// History provider backed by the GitHub REST API
pub struct GitHubHistory {
    client: Client,
    options: GitHubOptions,
    config: HistoryConfig,
}

impl std::fmt::Debug for GitHubHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubHistory")
            .field("options", &self.options)
            .field("config", &self.config)
            .finish()
    }
}

impl GitHubHistory {
    pub fn new(options: GitHubOptions, config: HistoryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(USER_AGENT_VALUE)
            .build()?;

        Ok(GitHubHistory {
            client,
            options,
            config,
        })
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.options.api_base.trim_end_matches('/'),
            self.options.owner,
            self.options.repo,
            path
        )
    }

    /// Branch names are used without the remote prefix.
    fn ref_name<'a>(&self, name: &'a str) -> &'a str {
        strip_remote(name, &self.config.remote)
    }

    fn get(&self, url: &str) -> Result<Response> {
        debug!(%url, "GET");
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.options.token {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(error_for_status(response, status, url))
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        Ok(self.get(url)?.json()?)
    }

    fn list_branches(&self) -> Result<Vec<GitHubBranch>> {
        let mut branches = Vec::new();
        let mut page = 1;
        loop {
            let url = self.repo_url(&format!("branches?per_page={}&page={}", PER_PAGE, page));
            let page_branches: Vec<GitHubBranch> = self.get_json(&url)?;
            let count = page_branches.len();
            branches.extend(page_branches);

            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(branches)
    }

    fn compare(&self, base: &str, head: &str) -> Result<GitHubComparison> {
        let url = self.repo_url(&format!(
            "compare/{}...{}",
            self.ref_name(base),
            self.ref_name(head)
        ));
        self.get_json(&url)
    }

    fn commit_sha(&self, reference: &str) -> Result<String> {
        let url = self.repo_url(&format!("commits/{}", self.ref_name(reference)));
        let commit: GitHubCommitRef = self.get_json(&url)?;
        Ok(commit.sha)
    }
}

/// Map an unsuccessful response onto an error naming the request.
fn error_for_status(response: Response, status: StatusCode, url: &str) -> VersionerError {
    let rate_limited = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        == Some("0");
    let message = response
        .json::<GitHubErrorBody>()
        .map(|body| body.message)
        .unwrap_or_else(|_| status.to_string());

    match status {
        StatusCode::UNAUTHORIZED => {
            VersionerError::remote(format!("authentication failed for {}: {}", url, message))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            VersionerError::remote(format!("rate limited by GitHub at {}: {}", url, message))
        }
        StatusCode::FORBIDDEN if rate_limited => {
            VersionerError::remote(format!("rate limited by GitHub at {}: {}", url, message))
        }
        StatusCode::FORBIDDEN => {
            VersionerError::remote(format!("permission denied for {}: {}", url, message))
        }
        StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            VersionerError::branch(format!("not found: {} ({})", url, message))
        }
        _ => VersionerError::remote(format!(
            "GitHub API error {} at {}: {}",
            status.as_u16(),
            url,
            message
        )),
    }
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: String,
}

/// Extract the `rel="last"` target from a `Link` header.
fn parse_last_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_last = pieces.any(|param| param.trim() == r#"rel="last""#);
        if !is_last {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(|t| t.to_string())
    })
}

impl HistoryProvider for GitHubHistory {
    fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn get_all_branches(&self) -> Result<Vec<String>> {
        Ok(self
            .list_branches()?
            .into_iter()
            .map(|branch| branch.name)
            .collect())
    }

    fn get_branch_for_commit(&self, commit: &str) -> Result<String> {
        let branches = self.list_branches()?;
        let matcher = self.config.release_matcher()?;
        let names = branches.iter().map(|branch| branch.name.as_str());

        for candidate in candidate_branches(names, &self.config, &matcher) {
            if self.compare(commit, &candidate)?.status.base_is_ancestor() {
                debug!(branch = %candidate, "commit is contained in branch");
                return Ok(candidate);
            }
        }

        if let Some(branch) = branches
            .iter()
            .find(|branch| same_commit(&branch.commit.sha, commit))
        {
            return Ok(branch.name.clone());
        }

        debug!(%commit, "commit does not appear on any branch");
        Ok(commit.to_string())
    }

    fn get_merge_base(&self, a: &str, b: &str) -> Result<String> {
        Ok(self.compare(a, b)?.merge_base_commit.sha)
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        if same_commit(ancestor, descendant) {
            return Ok(true);
        }
        Ok(self.compare(ancestor, descendant)?.status.base_is_ancestor())
    }

    fn get_distance(&self, from: &str, to: &str) -> Result<u32> {
        Ok(self.compare(from, to)?.ahead_by)
    }

    fn get_first_commit(&self) -> Result<String> {
        let url = self.repo_url(&format!(
            "commits?sha={}&per_page=1",
            self.config.default_branch
        ));
        let response = self.get(&url)?;
        let last_page = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_last_link);

        let commits: Vec<GitHubCommitRef> = match last_page {
            Some(last) => self.get_json(&last)?,
            None => response.json()?,
        };

        commits
            .into_iter()
            .next()
            .map(|commit| commit.sha)
            .ok_or_else(|| {
                VersionerError::branch(format!(
                    "Branch '{}' has no commits",
                    self.config.default_branch
                ))
            })
    }

    fn get_head_sha(&self) -> Result<String> {
        let head_ref = self
            .options
            .head_ref
            .as_deref()
            .unwrap_or(&self.config.default_branch);
        self.commit_sha(head_ref)
    }
}
