use std::path::PathBuf;

/// Errors that can occur across the tremor crates.
///
/// Library crates return this type directly; the binary converts it to a
/// `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use tremor_core::TremorError;
///
/// let err = TremorError::Config("threshold must be in (0, 1]".into());
/// assert!(err.to_string().contains("threshold"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TremorError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(tremor::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(tremor::config))]
    Config(String),

    /// The version-control log invocation failed or could not be started.
    #[error("git error running `{command}`: {message}")]
    #[diagnostic(
        code(tremor::git),
        help("run tremor from inside a git repository, or pass --path to one")
    )]
    Git {
        /// The command line that was attempted.
        command: String,
        /// Captured error output.
        message: String,
    },

    /// The log parsed cleanly but produced nothing to analyze.
    #[error("no commits found")]
    #[diagnostic(
        code(tremor::no_commits),
        help("check the branch, date range, author, and path filters")
    )]
    NoCommits,

    /// Input text could not be parsed.
    #[error("parse error: {0}")]
    #[diagnostic(code(tremor::parse))]
    Parse(String),

    /// A glob or regex pattern in the configuration is invalid.
    #[error("invalid pattern: {0}")]
    #[diagnostic(code(tremor::pattern))]
    Pattern(String),

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(tremor::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(tremor::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(tremor::not_found))]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TremorError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn git_error_names_the_command() {
        let err = TremorError::Git {
            command: "git log --numstat".into(),
            message: "fatal: not a git repository".into(),
        };
        let text = err.to_string();
        assert!(text.contains("git log --numstat"));
        assert!(text.contains("not a git repository"));
    }

    #[test]
    fn no_commits_message() {
        assert_eq!(TremorError::NoCommits.to_string(), "no commits found");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = TremorError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert!(err.to_string().contains("/tmp/missing.toml"));
    }
}
