use thiserror::Error;

/// Unified error type for version resolution
#[derive(Error, Debug)]
pub enum VersionerError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Branch error: {0}")]
    Branch(String),

    #[error(
        "Failed to find remote branch for release branch '{branch}', ensure it is pushed to the remote"
    )]
    ReleaseBranchNotFound { branch: String },

    #[error("History query {query}({args}) failed: {source}")]
    Query {
        query: &'static str,
        args: String,
        #[source]
        source: Box<VersionerError>,
    },

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in deterministic-versions
pub type Result<T> = std::result::Result<T, VersionerError>;

impl VersionerError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        VersionerError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        VersionerError::Version(msg.into())
    }

    /// Create a branch/commit resolution error with context
    pub fn branch(msg: impl Into<String>) -> Self {
        VersionerError::Branch(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        VersionerError::Remote(msg.into())
    }

    /// Wrap a provider failure with the query name and its arguments
    pub fn query(query: &'static str, args: impl Into<String>, source: VersionerError) -> Self {
        VersionerError::Query {
            query,
            args: args.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VersionerError::config("test config issue");
        assert_eq!(err.to_string(), "Configuration error: test config issue");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: VersionerError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_query_error_names_query_and_args() {
        let err = VersionerError::query(
            "merge_base",
            "origin/main, release-4.1.x",
            VersionerError::branch("Cannot resolve 'release-4.1.x'"),
        );
        let msg = err.to_string();
        assert!(msg.contains("merge_base(origin/main, release-4.1.x)"));
        assert!(msg.contains("Cannot resolve 'release-4.1.x'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_release_branch_not_found_names_branch() {
        let err = VersionerError::ReleaseBranchNotFound {
            branch: "release-9.9.x".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("release-9.9.x"));
        assert!(msg.contains("pushed to the remote"));
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (VersionerError::config("x"), "Configuration error"),
            (VersionerError::version("x"), "Version parsing error"),
            (VersionerError::branch("x"), "Branch error"),
            (VersionerError::remote("x"), "Remote operation failed"),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }
}
