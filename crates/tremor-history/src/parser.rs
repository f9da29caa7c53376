//! Commit log parsing.
//!
//! Turns the raw output of `git log --numstat` run with a control-byte
//! delimited format string into ordered [`Commit`] records.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tremor_core::{Identity, TremorError};

/// Byte placed before every commit record.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Byte placed between header columns of a record.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Number of header columns every record must carry.
const HEADER_COLUMNS: usize = 10;

/// One commit as recorded by the version-control tool.
///
/// # Examples
///
/// ```
/// use tremor_history::parser::parse_log;
///
/// let raw = "\u{1e}abc123\u{1f}abc\u{1f}Alice\u{1f}alice@example.com\u{1f}\
///            2024-03-01T10:00:00+00:00\u{1f}Alice\u{1f}alice@example.com\u{1f}\
///            fix: auth\u{1f}\u{1f}p1 p2\n\n4\t1\tsrc/auth.ts\n";
/// let commits = parse_log(raw).unwrap();
/// assert!(commits[0].is_merge());
/// assert_eq!(commits[0].files[0].additions, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Full commit hash.
    pub hash: String,
    /// Abbreviated commit hash.
    pub short_hash: String,
    /// Who wrote the change.
    pub author: Identity,
    /// Who applied the change.
    pub committer: Identity,
    /// Author date.
    pub timestamp: DateTime<FixedOffset>,
    /// First line of the message.
    pub subject: String,
    /// Remainder of the message, trimmed.
    pub body: String,
    /// Parent hashes, first parent first.
    pub parents: Vec<String>,
    /// Files touched, in log order.
    pub files: Vec<FileChange>,
}

impl Commit {
    /// Whether the commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Subject and body joined by a blank line, or the subject alone.
    pub fn message(&self) -> String {
        if self.body.is_empty() {
            self.subject.clone()
        } else {
            format!("{}\n\n{}", self.subject, self.body)
        }
    }
}

/// A single file touched by a commit.
///
/// Binary files carry no line counts: `additions` and `deletions` are zero
/// and `binary` is set, so use [`FileChange::lines_changed`] to tell them
/// apart from a genuine zero-line change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// Path after the commit, relative to the repository root.
    pub path: String,
    /// Path before the commit, present only for renames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    /// Lines added (zero for binary files).
    pub additions: u64,
    /// Lines removed (zero for binary files).
    pub deletions: u64,
    /// Line counts are unknown.
    pub binary: bool,
    /// Kind of change.
    pub status: ChangeStatus,
}

impl FileChange {
    /// Total lines added plus removed, or `None` for binary files.
    ///
    /// # Examples
    ///
    /// ```
    /// use tremor_history::parser::{ChangeStatus, FileChange};
    ///
    /// let change = FileChange {
    ///     path: "logo.png".into(),
    ///     old_path: None,
    ///     additions: 0,
    ///     deletions: 0,
    ///     binary: true,
    ///     status: ChangeStatus::Modified,
    /// };
    /// assert_eq!(change.lines_changed(), None);
    /// ```
    pub fn lines_changed(&self) -> Option<u64> {
        if self.binary {
            None
        } else {
            Some(self.additions + self.deletions)
        }
    }
}

/// Kind of change recorded for a file.
///
/// The numstat listing cannot distinguish additions or deletions from
/// modifications, so only renames are singled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// Content changed in place (or the file was added or removed).
    Modified,
    /// File moved from `old_path`.
    Renamed,
}

fn numstat_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+|-)\t(\d+|-)\t(.+)$").expect("numstat pattern is valid")
    })
}

/// Parse a complete log dump into commits, preserving input order.
///
/// Malformed records are dropped and logged at debug level.
///
/// # Errors
///
/// Returns [`TremorError::NoCommits`] if no record parses.
///
/// # Examples
///
/// ```
/// use tremor_history::parser::parse_log;
/// use tremor_core::TremorError;
///
/// assert!(matches!(parse_log(""), Err(TremorError::NoCommits)));
/// ```
pub fn parse_log(raw: &str) -> Result<Vec<Commit>, TremorError> {
    let mut commits = Vec::new();
    let mut dropped = 0usize;

    for fragment in raw.split(RECORD_SEPARATOR) {
        if fragment.trim().is_empty() {
            continue;
        }
        match parse_entry(fragment) {
            Ok(commit) => commits.push(commit),
            Err(err) => {
                dropped += 1;
                tracing::debug!("dropping log record: {err}");
            }
        }
    }

    if commits.is_empty() {
        return Err(TremorError::NoCommits);
    }

    tracing::info!(commits = commits.len(), dropped, "parsed commit log");
    Ok(commits)
}

/// Parse one record (the text between two record separators).
///
/// # Errors
///
/// Returns [`TremorError::Parse`] if the header has fewer than ten columns
/// or the author date is not ISO-8601.
pub fn parse_entry(fragment: &str) -> Result<Commit, TremorError> {
    let lines: Vec<&str> = fragment.lines().collect();
    let pattern = numstat_pattern();
    let header_end = lines
        .iter()
        .position(|line| pattern.is_match(line))
        .unwrap_or(lines.len());

    let header = lines[..header_end].join("\n");
    let columns: Vec<&str> = header.split(FIELD_SEPARATOR).collect();
    if columns.len() < HEADER_COLUMNS {
        return Err(TremorError::Parse(format!(
            "expected {HEADER_COLUMNS} header columns, found {}",
            columns.len()
        )));
    }

    let hash = columns[0].trim();
    let date = columns[4].trim();
    let timestamp = DateTime::parse_from_rfc3339(date).map_err(|e| {
        tracing::warn!(commit = hash, "unparsable author date {date:?}: {e}");
        TremorError::Parse(format!("invalid author date {date:?} on {hash}: {e}"))
    })?;

    let parents = columns[9]
        .split_whitespace()
        .map(String::from)
        .collect::<Vec<_>>();

    let files = lines[header_end..]
        .iter()
        .filter_map(|line| parse_numstat_line(line))
        .collect();

    Ok(Commit {
        hash: hash.to_string(),
        short_hash: columns[1].trim().to_string(),
        author: Identity::new(columns[2].trim(), columns[3].trim()),
        committer: Identity::new(columns[5].trim(), columns[6].trim()),
        timestamp,
        subject: columns[7].trim().to_string(),
        body: columns[8].trim().to_string(),
        parents,
        files,
    })
}

/// Parse one `added<TAB>deleted<TAB>path` line.
///
/// Returns `None` for lines that are not numstat rows.
///
/// # Examples
///
/// ```
/// use tremor_history::parser::{parse_numstat_line, ChangeStatus};
///
/// let change = parse_numstat_line("3\t0\told/name.ts => new/name.ts").unwrap();
/// assert_eq!(change.path, "new/name.ts");
/// assert_eq!(change.old_path.as_deref(), Some("old/name.ts"));
/// assert_eq!(change.status, ChangeStatus::Renamed);
///
/// let binary = parse_numstat_line("-\t-\tassets/logo.png").unwrap();
/// assert!(binary.binary);
/// ```
pub fn parse_numstat_line(line: &str) -> Option<FileChange> {
    let caps = numstat_pattern().captures(line)?;
    let added = &caps[1];
    let deleted = &caps[2];
    let binary = added == "-" || deleted == "-";

    let (additions, deletions) = if binary {
        (0, 0)
    } else {
        (added.parse().ok()?, deleted.parse().ok()?)
    };

    let (path, old_path) = decode_rename(&caps[3]);
    let status = if old_path.is_some() {
        ChangeStatus::Renamed
    } else {
        ChangeStatus::Modified
    };

    Some(FileChange {
        path,
        old_path,
        additions,
        deletions,
        binary,
        status,
    })
}

/// Split a numstat path column into `(new_path, old_path)`.
///
/// Supports `old => new` and `prefix/{old => new}/suffix`. A path with more
/// than one brace group is returned unchanged as a non-rename.
fn decode_rename(raw: &str) -> (String, Option<String>) {
    if !raw.contains(" => ") {
        return (raw.to_string(), None);
    }

    let opens = raw.matches('{').count();
    let closes = raw.matches('}').count();

    match (opens, closes) {
        (0, 0) => match raw.split_once(" => ") {
            Some((old, new)) => (new.to_string(), Some(old.to_string())),
            None => (raw.to_string(), None),
        },
        (1, 1) => {
            let (Some(start), Some(end)) = (raw.find('{'), raw.find('}')) else {
                return (raw.to_string(), None);
            };
            if start > end {
                return (raw.to_string(), None);
            }
            let Some((old, new)) = raw[start + 1..end].split_once(" => ") else {
                return (raw.to_string(), None);
            };
            let prefix = &raw[..start];
            let suffix = &raw[end + 1..];
            let old_path = join_segments(prefix, old, suffix);
            let new_path = join_segments(prefix, new, suffix);
            (new_path, Some(old_path))
        }
        _ => (raw.to_string(), None),
    }
}

/// Join a brace-rename prefix, segment, and suffix, collapsing the doubled
/// separators left by an empty segment.
fn join_segments(prefix: &str, segment: &str, suffix: &str) -> String {
    let mut joined = format!("{prefix}{segment}{suffix}");
    while joined.contains("//") {
        joined = joined.replace("//", "/");
    }
    joined.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: &str = "\u{1f}";

    fn header(
        hash: &str,
        email: &str,
        date: &str,
        subject: &str,
        body: &str,
        parents: &str,
    ) -> String {
        [
            hash,
            &hash[..hash.len().min(7)],
            "Alice",
            email,
            date,
            "Committer",
            "committer@example.com",
            subject,
            body,
            parents,
        ]
        .join(FS)
    }

    /// Render a commit back into the record layout the log invocation produces.
    fn render(commit: &Commit) -> String {
        let fields = [
            commit.hash.clone(),
            commit.short_hash.clone(),
            commit.author.name.clone(),
            commit.author.email.clone(),
            commit.timestamp.to_rfc3339(),
            commit.committer.name.clone(),
            commit.committer.email.clone(),
            commit.subject.clone(),
            commit.body.clone(),
            commit.parents.join(" "),
        ];
        let mut out = format!("{RECORD_SEPARATOR}{}\n\n", fields.join(FS));
        for file in &commit.files {
            let counts = if file.binary {
                "-\t-".to_string()
            } else {
                format!("{}\t{}", file.additions, file.deletions)
            };
            let path = match &file.old_path {
                Some(old) => format!("{old} => {}", file.path),
                None => file.path.clone(),
            };
            out.push_str(&format!("{counts}\t{path}\n"));
        }
        out
    }

    #[test]
    fn parses_header_and_numstat() {
        let raw = format!(
            "{RECORD_SEPARATOR}{}\n\n10\t2\tsrc/main.ts\n0\t0\tsrc/empty.ts\n",
            header(
                "0123456789abcdef",
                "alice@example.com",
                "2024-01-15T09:30:00+02:00",
                "feat: add main",
                "",
                "fedcba9876543210"
            )
        );
        let commits = parse_log(&raw).unwrap();
        assert_eq!(commits.len(), 1);

        let commit = &commits[0];
        assert_eq!(commit.hash, "0123456789abcdef");
        assert_eq!(commit.short_hash, "0123456");
        assert_eq!(commit.author.email, "alice@example.com");
        assert_eq!(commit.committer.name, "Committer");
        assert_eq!(commit.message(), "feat: add main");
        assert_eq!(commit.parents, vec!["fedcba9876543210"]);
        assert!(!commit.is_merge());
        assert_eq!(commit.files.len(), 2);
        assert_eq!(commit.files[0].additions, 10);
        assert_eq!(commit.files[0].deletions, 2);
        assert_eq!(commit.files[1].lines_changed(), Some(0));
        assert!(!commit.files[1].binary);
    }

    #[test]
    fn multi_line_body_is_kept() {
        let body = "First paragraph.\n\n- bullet one\n- bullet two\n";
        let raw = format!(
            "{RECORD_SEPARATOR}{}\n\n1\t1\ta.ts\n",
            header("aaaaaaaaaa", "a@x.io", "2024-01-01T00:00:00Z", "subject", body, "p")
        );
        let commit = &parse_log(&raw).unwrap()[0];
        assert_eq!(commit.body, "First paragraph.\n\n- bullet one\n- bullet two");
        assert_eq!(
            commit.message(),
            "subject\n\nFirst paragraph.\n\n- bullet one\n- bullet two"
        );
        assert_eq!(commit.files.len(), 1);
    }

    #[test]
    fn binary_files_have_no_counts() {
        let change = parse_numstat_line("-\t-\tassets/logo.png").unwrap();
        assert!(change.binary);
        assert_eq!(change.additions, 0);
        assert_eq!(change.deletions, 0);
        assert_eq!(change.lines_changed(), None);
        assert_eq!(change.status, ChangeStatus::Modified);
    }

    #[test]
    fn whole_path_rename() {
        let change = parse_numstat_line("3\t0\told/name.ts => new/name.ts").unwrap();
        assert_eq!(
            change,
            FileChange {
                path: "new/name.ts".into(),
                old_path: Some("old/name.ts".into()),
                additions: 3,
                deletions: 0,
                binary: false,
                status: ChangeStatus::Renamed,
            }
        );
    }

    #[test]
    fn brace_rename_with_prefix_and_suffix() {
        let change = parse_numstat_line("5\t2\tsrc/{utils => helpers}/format.ts").unwrap();
        assert_eq!(change.path, "src/helpers/format.ts");
        assert_eq!(change.old_path.as_deref(), Some("src/utils/format.ts"));
        assert_eq!(change.status, ChangeStatus::Renamed);
    }

    #[test]
    fn brace_rename_with_empty_side_collapses_separators() {
        let change = parse_numstat_line("0\t0\tsrc/{ => lib}/index.ts").unwrap();
        assert_eq!(change.path, "src/lib/index.ts");
        assert_eq!(change.old_path.as_deref(), Some("src/index.ts"));

        let change = parse_numstat_line("0\t0\t{legacy => }/app.ts").unwrap();
        assert_eq!(change.path, "app.ts");
        assert_eq!(change.old_path.as_deref(), Some("legacy/app.ts"));
    }

    #[test]
    fn multiple_brace_groups_fall_back_to_plain_path() {
        let raw = "src/{a => b}/x/{c => d}.ts";
        let change = parse_numstat_line(&format!("1\t1\t{raw}")).unwrap();
        assert_eq!(change.path, raw);
        assert!(change.old_path.is_none());
        assert_eq!(change.status, ChangeStatus::Modified);
    }

    #[test]
    fn non_numstat_lines_are_ignored() {
        assert!(parse_numstat_line("").is_none());
        assert!(parse_numstat_line("just text").is_none());
        assert!(parse_numstat_line("3\t\tpath").is_none());
    }

    #[test]
    fn malformed_records_are_dropped() {
        let good = header("bbbbbbbbbb", "b@x.io", "2024-02-02T12:00:00Z", "ok", "", "");
        let raw = format!(
            "{RECORD_SEPARATOR}only{FIELD_SEPARATOR}three{FIELD_SEPARATOR}columns\n\n1\t0\tx.ts\n\
             {RECORD_SEPARATOR}{good}\n\n2\t0\ty.ts\n"
        );
        let commits = parse_log(&raw).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, "bbbbbbbbbb");
        assert!(commits[0].parents.is_empty());
    }

    #[test]
    fn unparsable_date_drops_the_record() {
        let raw = format!(
            "{RECORD_SEPARATOR}{}\n",
            header("cccccccccc", "c@x.io", "yesterday", "s", "", "")
        );
        assert!(matches!(parse_log(&raw), Err(TremorError::NoCommits)));
    }

    #[test]
    fn only_malformed_records_is_no_commits() {
        let raw = format!("{RECORD_SEPARATOR}garbage\n{RECORD_SEPARATOR}\n");
        assert!(matches!(parse_log(&raw), Err(TremorError::NoCommits)));
    }

    #[test]
    fn commit_without_files_parses() {
        let raw = format!(
            "{RECORD_SEPARATOR}{}\n",
            header("dddddddddd", "d@x.io", "2024-02-02T12:00:00Z", "Merge branch", "", "p1 p2")
        );
        let commits = parse_log(&raw).unwrap();
        assert!(commits[0].files.is_empty());
        assert!(commits[0].is_merge());
    }

    #[test]
    fn input_order_is_preserved() {
        let raw: String = ["1111111111", "2222222222", "3333333333"]
            .iter()
            .map(|h| {
                format!(
                    "{RECORD_SEPARATOR}{}\n\n1\t0\tf.ts\n",
                    header(h, "a@x.io", "2024-01-01T00:00:00Z", "s", "", "")
                )
            })
            .collect();
        let hashes: Vec<String> = parse_log(&raw).unwrap().into_iter().map(|c| c.hash).collect();
        assert_eq!(hashes, vec!["1111111111", "2222222222", "3333333333"]);
    }

    #[test]
    fn rendered_commit_parses_back_identically() {
        let original = Commit {
            hash: "9f8e7d6c5b4a39281706f5e4d3c2b1a098765432".into(),
            short_hash: "9f8e7d6".into(),
            author: Identity::new("Dana Scully", "Dana@FBI.gov"),
            committer: Identity::new("Fox Mulder", "fox@fbi.gov"),
            timestamp: DateTime::parse_from_rfc3339("2023-11-05T17:45:12-05:00").unwrap(),
            subject: "refactor: move parsers".into(),
            body: "Moves the parsers.\n\nCloses #12.".into(),
            parents: vec!["aaaa".into(), "bbbb".into()],
            files: vec![
                FileChange {
                    path: "src/parse/log.ts".into(),
                    old_path: Some("lib/log.ts".into()),
                    additions: 12,
                    deletions: 4,
                    binary: false,
                    status: ChangeStatus::Renamed,
                },
                FileChange {
                    path: "docs/diagram.png".into(),
                    old_path: None,
                    additions: 0,
                    deletions: 0,
                    binary: true,
                    status: ChangeStatus::Modified,
                },
                FileChange {
                    path: "README.md".into(),
                    old_path: None,
                    additions: 0,
                    deletions: 0,
                    binary: false,
                    status: ChangeStatus::Modified,
                },
            ],
        };

        let parsed = parse_log(&render(&original)).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0], original);
        assert_eq!(parsed[0].timestamp, original.timestamp);
        assert_eq!(parsed[0].message(), original.message());
    }
}
