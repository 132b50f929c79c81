use crate::error::{Result, VersionerError};
use crate::history::github::{GitHubOptions, DEFAULT_API_BASE};
use crate::history::{HistoryConfig, DEFAULT_BRANCH, DEFAULT_REMOTE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "versioner.toml";

/// Name of the configuration file looked up in the user config directory.
pub const USER_CONFIG_FILE_NAME: &str = "deterministic-versions.toml";

/// Represents the complete configuration for deterministic-versions.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Mainline branch name, without remote prefix
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Remote whose tracking branches are authoritative
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Query a GitHub repository instead of a local checkout
    #[serde(default)]
    pub github: Option<GitHubConfig>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_string()
}

/// Settings for the GitHub history provider.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitHubConfig {
    pub owner: String,

    pub repo: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl GitHubConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        GitHubConfig {
            owner: owner.into(),
            repo: repo.into(),
            api_base: default_api_base(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Connection options, reading the token from the configured variable
    pub fn options(&self) -> GitHubOptions {
        let mut options = GitHubOptions::new(self.owner.clone(), self.repo.clone());
        options.api_base = self.api_base.clone();
        options.token = std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.is_empty());
        options.timeout = Duration::from_secs(self.timeout_secs);
        options
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_branch: default_branch(),
            remote: default_remote(),
            github: None,
        }
    }
}

impl Config {
    /// Provider configuration derived from this config
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig::new(self.default_branch.clone(), self.remote.clone())
    }

    fn validate(self) -> Result<Self> {
        if self.default_branch.trim().is_empty() {
            return Err(VersionerError::config("default_branch must not be empty"));
        }
        if self.remote.trim().is_empty() {
            return Err(VersionerError::config("remote must not be empty"));
        }
        Ok(self)
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `versioner.toml` in current directory
/// 3. `deterministic-versions.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    match config_file(config_path) {
        Some(path) => load_from(&path),
        None => Ok(Config::default()),
    }
}

fn config_file(config_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = config_path {
        return Some(PathBuf::from(path));
    }

    let local = Path::new(".").join(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(USER_CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

fn load_from(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&config_str).map_err(|e| {
        VersionerError::config(format!("Cannot parse {}: {}", path.display(), e))
    })?;
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.remote, "origin");
        assert!(config.github.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("default_branch = \"master\"").unwrap();
        assert_eq!(config.default_branch, "master");
        assert_eq!(config.remote, "origin");
    }

    #[test]
    fn test_github_table_defaults() {
        let config: Config = toml::from_str(
            r#"
[github]
owner = "acme"
repo = "desktop"
"#,
        )
        .unwrap();
        let github = config.github.unwrap();
        assert_eq!(github, GitHubConfig::new("acme", "desktop"));
        assert_eq!(github.options().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_history_config() {
        let config = Config {
            default_branch: "develop".to_string(),
            remote: "upstream".to_string(),
            github: None,
        };
        assert_eq!(
            config.history_config(),
            HistoryConfig::new("develop", "upstream")
        );
    }

    #[test]
    fn test_validate_rejects_empty_branch() {
        let config = Config {
            default_branch: " ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
