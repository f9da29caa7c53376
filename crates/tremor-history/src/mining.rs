//! Commit log extraction.
//!
//! Runs `git log --numstat` with a control-byte delimited format string and
//! hands the buffered output to [`parse_log`].

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::Repository;
use tremor_core::{HistoryConfig, TremorError};

use crate::parser::{parse_log, Commit};

/// Format string placing a record separator before each commit and a field
/// separator between its ten header columns.
pub const LOG_FORMAT: &str =
    "--format=%x1e%H%x1f%h%x1f%an%x1f%ae%x1f%aI%x1f%cn%x1f%ce%x1f%s%x1f%b%x1f%P";

/// Filters applied to the log invocation.
///
/// # Examples
///
/// ```
/// use tremor_history::mining::LogOptions;
///
/// let opts = LogOptions::default();
/// assert!(opts.branch.is_none());
/// assert!(opts.max_count.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Branch or revision to walk (default: HEAD).
    pub branch: Option<String>,
    /// Passed to `--since`.
    pub since: Option<String>,
    /// Passed to `--until`.
    pub until: Option<String>,
    /// One `--author` per entry; git matches any of them.
    pub authors: Vec<String>,
    /// Restrict to commits touching these paths.
    pub paths: Vec<String>,
    /// Passed to `--max-count`.
    pub max_count: Option<usize>,
    /// Skip merge commits.
    pub no_merges: bool,
}

impl From<&HistoryConfig> for LogOptions {
    fn from(config: &HistoryConfig) -> Self {
        Self {
            branch: config.branch.clone(),
            since: config.since.clone(),
            until: config.until.clone(),
            authors: config.authors.clone(),
            paths: config.paths.clone(),
            max_count: config.max_count,
            no_merges: config.no_merges,
        }
    }
}

/// Build the argument list for the log invocation (without the `git` program).
///
/// # Examples
///
/// ```
/// use tremor_history::mining::{log_args, LogOptions};
///
/// let opts = LogOptions {
///     since: Some("90 days ago".into()),
///     paths: vec!["src".into()],
///     ..LogOptions::default()
/// };
/// let args = log_args(&opts);
/// assert!(args.contains(&"--numstat".to_string()));
/// assert!(args.contains(&"--since=90 days ago".to_string()));
/// assert_eq!(args[args.len() - 2], "--");
/// ```
pub fn log_args(options: &LogOptions) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-c".into(),
        "core.quotepath=off".into(),
        "log".into(),
        "--numstat".into(),
        "-M".into(),
        "--date-order".into(),
        "--no-color".into(),
        LOG_FORMAT.into(),
    ];

    if let Some(since) = &options.since {
        args.push(format!("--since={since}"));
    }
    if let Some(until) = &options.until {
        args.push(format!("--until={until}"));
    }
    for author in &options.authors {
        args.push(format!("--author={author}"));
    }
    if let Some(max) = options.max_count {
        args.push(format!("--max-count={max}"));
    }
    if options.no_merges {
        args.push("--no-merges".into());
    }
    if let Some(branch) = &options.branch {
        args.push(branch.clone());
    }
    if !options.paths.is_empty() {
        args.push("--".into());
        args.extend(options.paths.iter().cloned());
    }

    args
}

/// Run the log invocation in the repository containing `repo_path` and
/// return its complete output.
///
/// # Errors
///
/// Returns [`TremorError::Git`] if `repo_path` is not inside a repository,
/// `git` cannot be started, or it exits unsuccessfully. The error carries
/// the attempted command and captured stderr.
pub fn run_git_log(repo_path: &Path, options: &LogOptions) -> Result<String, TremorError> {
    let workdir = discover_workdir(repo_path)?;
    let args = log_args(options);
    let command = format!("git {}", args.join(" "));

    tracing::debug!(workdir = %workdir.display(), "running {command}");

    let output = Command::new("git")
        .args(&args)
        .current_dir(&workdir)
        .output()
        .map_err(|e| TremorError::Git {
            command: command.clone(),
            message: format!("failed to start git: {e}"),
        })?;

    if !output.status.success() {
        return Err(TremorError::Git {
            command,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run the log invocation and parse its output.
///
/// Returns commits in the order the log lists them (newest first by default).
///
/// # Errors
///
/// Returns [`TremorError::Git`] if the invocation fails, or
/// [`TremorError::NoCommits`] if nothing parses.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tremor_history::mining::{mine_history, LogOptions};
///
/// let commits = mine_history(Path::new("."), &LogOptions::default()).unwrap();
/// for c in &commits {
///     println!("{} {} ({})", c.short_hash, c.subject, c.author.name);
/// }
/// ```
pub fn mine_history(repo_path: &Path, options: &LogOptions) -> Result<Vec<Commit>, TremorError> {
    let raw = run_git_log(repo_path, options)?;
    parse_log(&raw)
}

fn discover_workdir(repo_path: &Path) -> Result<PathBuf, TremorError> {
    let repo = Repository::discover(repo_path).map_err(|e| TremorError::Git {
        command: format!("discover {}", repo_path.display()),
        message: e.message().to_string(),
    })?;

    let dir = repo.workdir().unwrap_or_else(|| repo.path());
    Ok(dir.to_path_buf())
}
