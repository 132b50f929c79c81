//! Command-line front end
//!
//! Parses arguments, merges them over the configuration file, picks the
//! history provider and prints the resolved version or build number.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{load_config, Config, GitHubConfig};
use crate::engine::VersionEngine;
use crate::history::{GitHubHistory, GitHubOptions, HistoryProvider, LocalHistory};

#[derive(Debug, clap::Parser)]
#[command(
    name = "deterministic-versions",
    about = "Deterministic git-based versioning for applications"
)]
pub struct Args {
    #[arg(
        short,
        long,
        help = "Print the version of this tool (not of the target repository)"
    )]
    pub version: bool,

    #[arg(short, long, help = "Path to the local git repository")]
    pub repo_path: Option<PathBuf>,

    #[arg(short, long, help = "Name of the default branch of the repository")]
    pub default_branch: Option<String>,

    #[arg(long, help = "Remote whose tracking branches are authoritative")]
    pub remote: Option<String>,

    #[arg(
        long,
        value_name = "OWNER/REPO",
        conflicts_with = "repo_path",
        help = "Query a GitHub repository instead of a local checkout"
    )]
    pub github: Option<String>,

    #[arg(long, help = "Commit to version instead of the current head")]
    pub commit: Option<String>,

    #[arg(short, long, help = "Print the numeric build number instead of the version")]
    pub build_number: bool,

    #[arg(short, long, help = "If specified, writes the result to the specified file")]
    pub output_file: Option<PathBuf>,

    #[arg(short, long, help = "Custom configuration file path")]
    pub config: Option<String>,

    #[arg(short, long, help = "Run the program without any output")]
    pub silent: bool,

    #[arg(long, conflicts_with = "silent", help = "Print diagnostic trace messages")]
    pub verbose: bool,
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` applies unless `--silent` or `--verbose` is given.
pub fn init_logging(args: &Args) {
    let filter = if args.silent {
        EnvFilter::new("off")
    } else if args.verbose {
        EnvFilter::new("deterministic_versions=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// Resolve the requested version or build number and write the output file.
pub fn run(args: &Args) -> Result<String> {
    let config = effective_config(args)?;
    let history_config = config.history_config();

    let output = match &config.github {
        Some(github) if args.repo_path.is_none() => {
            let history = GitHubHistory::new(github.options(), history_config)
                .context("Failed to create GitHub client")?;
            compute(history, args)?
        }
        _ => {
            let path = args.repo_path.clone().unwrap_or_else(|| PathBuf::from("."));
            let history = LocalHistory::open(&path, history_config)
                .with_context(|| format!("Failed to open repository at {}", path.display()))?;
            compute(history, args)?
        }
    };

    if let Some(path) = &args.output_file {
        fs::write(path, &output)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(output)
}

/// Configuration file values with command-line overrides applied
pub fn effective_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref()).context("Error loading config")?;

    if let Some(branch) = &args.default_branch {
        config.default_branch = branch.clone();
    }
    if let Some(remote) = &args.remote {
        config.remote = remote.clone();
    }
    if let Some(slug) = &args.github {
        let options = GitHubOptions::from_slug(slug)?;
        let github = match config.github.take() {
            Some(existing) => GitHubConfig {
                owner: options.owner,
                repo: options.repo,
                ..existing
            },
            None => GitHubConfig::new(options.owner, options.repo),
        };
        config.github = Some(github);
    }

    Ok(config)
}

fn compute<H: HistoryProvider>(history: H, args: &Args) -> Result<String> {
    let engine = VersionEngine::new(history)?;
    let commit = args.commit.as_deref();

    let output = if args.build_number {
        engine.build_number(commit)?
    } else {
        engine.resolve(commit)?.to_string()
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_short_flags() {
        let args = Args::try_parse_from([
            "deterministic-versions",
            "-r",
            "../desktop",
            "-d",
            "master",
            "-o",
            "version.txt",
            "-s",
        ])
        .unwrap();
        assert_eq!(args.repo_path, Some(PathBuf::from("../desktop")));
        assert_eq!(args.default_branch.as_deref(), Some("master"));
        assert_eq!(args.output_file, Some(PathBuf::from("version.txt")));
        assert!(args.silent);
        assert!(!args.build_number);
    }

    #[test]
    fn test_github_conflicts_with_repo_path() {
        let result = Args::try_parse_from([
            "deterministic-versions",
            "--github",
            "o/r",
            "--repo-path",
            ".",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_silent_conflicts_with_verbose() {
        let result = Args::try_parse_from(["deterministic-versions", "-s", "--verbose"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_short_v_is_version() {
        let args = Args::try_parse_from(["deterministic-versions", "-v"]).unwrap();
        assert!(args.version);
        assert!(!args.verbose);
    }

    #[test]
    fn test_overrides_apply_over_defaults() {
        let args = Args::try_parse_from([
            "deterministic-versions",
            "--default-branch",
            "develop",
            "--remote",
            "upstream",
            "--github",
            "acme/desktop",
            "--config",
            "/nonexistent/but/explicit.toml",
        ])
        .unwrap();
        // an explicit config path that does not exist is an error
        assert!(effective_config(&args).is_err());

        let args = Args {
            config: None,
            ..args
        };
        let config = effective_config(&args).unwrap();
        assert_eq!(config.default_branch, "develop");
        assert_eq!(config.remote, "upstream");
        let github = config.github.unwrap();
        assert_eq!(github.owner, "acme");
        assert_eq!(github.repo, "desktop");
    }
}
