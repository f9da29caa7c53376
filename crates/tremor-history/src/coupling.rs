//! Temporal coupling detection.
//!
//! Identifies pairs of files (and directories) that frequently change
//! together in commits, which may indicate hidden dependencies or
//! architectural coupling.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tremor_core::CouplingConfig;

use crate::directory_of;
use crate::parser::Commit;

/// A pair of paths that frequently change together.
///
/// # Examples
///
/// ```
/// use tremor_history::coupling::CoupledPair;
///
/// let pair = CoupledPair {
///     path_a: "src/auth.ts".into(),
///     path_b: "src/session.ts".into(),
///     co_changes: 15,
///     changes_a: 20,
///     changes_b: 18,
///     strength: 83.3,
///     likely_coupled: true,
///     hidden_dependency: false,
/// };
/// assert!(pair.strength > 50.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoupledPair {
    /// First path in the pair (lexicographically smaller).
    pub path_a: String,
    /// Second path in the pair.
    pub path_b: String,
    /// Number of commits touching both paths.
    pub co_changes: u32,
    /// Total commits touching `path_a`.
    pub changes_a: u32,
    /// Total commits touching `path_b`.
    pub changes_b: u32,
    /// `co_changes / min(changes_a, changes_b) * 100`.
    pub strength: f64,
    pub likely_coupled: bool,
    /// Strongly coupled files living in different directories.
    pub hidden_dependency: bool,
}

/// Output of [`analyze_coupling`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingReport {
    /// File pairs, strongest first.
    pub files: Vec<CoupledPair>,
    /// Directory pairs, strongest first.
    pub directories: Vec<CoupledPair>,
    /// Number of file pairs flagged as hidden dependencies.
    pub hidden_dependencies: usize,
}

/// Coupling strength as a percentage in `[0, 100]`.
///
/// Measures how often the less frequently changed path's changes are
/// accompanied by the other. Symmetric in its arguments.
///
/// # Examples
///
/// ```
/// use tremor_history::coupling::coupling_strength;
///
/// assert_eq!(coupling_strength(4, 5, 4), 100.0);
/// assert_eq!(coupling_strength(2, 10, 4), 50.0);
/// assert_eq!(coupling_strength(3, 0, 7), 0.0);
/// ```
pub fn coupling_strength(co_changes: u32, changes_a: u32, changes_b: u32) -> f64 {
    let min = changes_a.min(changes_b);
    if min == 0 {
        return 0.0;
    }
    (f64::from(co_changes) / f64::from(min) * 100.0).min(100.0)
}

/// Detect temporal coupling between files and between directories.
///
/// Commits touching more than `max_files_per_commit` distinct files are
/// skipped when that limit is set.
///
/// # Examples
///
/// ```
/// use tremor_core::CouplingConfig;
/// use tremor_history::coupling::analyze_coupling;
///
/// let report = analyze_coupling(&[], &CouplingConfig::default());
/// assert!(report.files.is_empty());
/// assert_eq!(report.hidden_dependencies, 0);
/// ```
pub fn analyze_coupling(commits: &[Commit], config: &CouplingConfig) -> CouplingReport {
    let mut file_matrix = CoChangeMatrix::default();
    let mut dir_matrix = CoChangeMatrix::default();
    let mut skipped = 0usize;

    for commit in commits {
        let files: BTreeSet<&str> = commit.files.iter().map(|f| f.path.as_str()).collect();
        if config
            .max_files_per_commit
            .is_some_and(|max| files.len() > max)
        {
            skipped += 1;
            continue;
        }
        let dirs: BTreeSet<&str> = files.iter().map(|path| directory_of(path)).collect();
        file_matrix.record(&files);
        dir_matrix.record(&dirs);
    }

    if skipped > 0 {
        tracing::debug!(skipped, "skipped oversized commits for coupling");
    }

    let files = file_matrix.pairs(config.min_co_changes, config, true);
    let directories = dir_matrix.pairs(config.min_directory_co_changes, config, false);
    let hidden_dependencies = files.iter().filter(|p| p.hidden_dependency).count();

    CouplingReport {
        files,
        directories,
        hidden_dependencies,
    }
}

#[derive(Default)]
struct CoChangeMatrix {
    touches: HashMap<String, u32>,
    co_changes: HashMap<(String, String), u32>,
}

impl CoChangeMatrix {
    /// Count one commit; `paths` is sorted so every pair is canonical.
    fn record(&mut self, paths: &BTreeSet<&str>) {
        let paths: Vec<&str> = paths.iter().copied().collect();
        for path in &paths {
            *self.touches.entry((*path).to_string()).or_default() += 1;
        }
        for i in 0..paths.len() {
            for j in (i + 1)..paths.len() {
                let key = (paths[i].to_string(), paths[j].to_string());
                *self.co_changes.entry(key).or_default() += 1;
            }
        }
    }

    fn pairs(&self, min_co_changes: u32, config: &CouplingConfig, files: bool) -> Vec<CoupledPair> {
        let mut pairs: Vec<CoupledPair> = self
            .co_changes
            .iter()
            .filter(|(_, &count)| count >= min_co_changes)
            .map(|((a, b), &co_changes)| {
                let changes_a = self.touches.get(a).copied().unwrap_or(0);
                let changes_b = self.touches.get(b).copied().unwrap_or(0);
                let strength = coupling_strength(co_changes, changes_a, changes_b);
                let hidden_dependency = files
                    && strength > config.hidden_threshold
                    && directory_of(a) != directory_of(b);
                CoupledPair {
                    path_a: a.clone(),
                    path_b: b.clone(),
                    co_changes,
                    changes_a,
                    changes_b,
                    strength,
                    likely_coupled: strength > config.likely_threshold,
                    hidden_dependency,
                }
            })
            .collect();

        pairs.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.co_changes.cmp(&a.co_changes))
                .then_with(|| a.path_a.cmp(&b.path_a))
                .then_with(|| a.path_b.cmp(&b.path_b))
        });
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ChangeStatus, FileChange};
    use chrono::{FixedOffset, TimeZone};
    use tremor_core::Identity;

    fn make_commit(id: i64, files: &[&str]) -> Commit {
        Commit {
            hash: format!("hash_{id}"),
            short_hash: format!("h{id}"),
            author: Identity::new("dev", "dev@example.com"),
            committer: Identity::new("dev", "dev@example.com"),
            timestamp: FixedOffset::east_opt(0)
                .unwrap()
                .timestamp_opt(id, 0)
                .unwrap(),
            subject: "change".into(),
            body: String::new(),
            parents: vec![],
            files: files
                .iter()
                .map(|p| FileChange {
                    path: (*p).into(),
                    old_path: None,
                    additions: 1,
                    deletions: 0,
                    binary: false,
                    status: ChangeStatus::Modified,
                })
                .collect(),
        }
    }

    #[test]
    fn less_frequent_file_fully_accompanied_is_full_strength() {
        let mut commits = Vec::new();
        for i in 0..4 {
            commits.push(make_commit(i, &["api/client.ts", "ui/view.ts"]));
        }
        commits.push(make_commit(10, &["api/client.ts"]));

        let report = analyze_coupling(&commits, &CouplingConfig::default());
        assert_eq!(report.files.len(), 1);
        let pair = &report.files[0];
        assert_eq!(pair.path_a, "api/client.ts");
        assert_eq!(pair.path_b, "ui/view.ts");
        assert_eq!(pair.co_changes, 4);
        assert_eq!(pair.changes_a, 5);
        assert_eq!(pair.changes_b, 4);
        assert_eq!(pair.strength, 100.0);
        assert!(pair.likely_coupled);
        assert!(pair.hidden_dependency);
        assert_eq!(report.hidden_dependencies, 1);
    }

    #[test]
    fn same_directory_pair_is_not_hidden() {
        let commits: Vec<Commit> = (0..3)
            .map(|i| make_commit(i, &["src/a.ts", "src/b.ts"]))
            .collect();
        let report = analyze_coupling(&commits, &CouplingConfig::default());
        let pair = &report.files[0];
        assert!(pair.likely_coupled);
        assert!(!pair.hidden_dependency);
    }

    #[test]
    fn strength_is_symmetric_and_bounded() {
        for co in 0..12u32 {
            for a in 0..12u32 {
                for b in 0..12u32 {
                    let s = coupling_strength(co, a, b);
                    assert_eq!(s, coupling_strength(co, b, a));
                    assert!((0.0..=100.0).contains(&s));
                }
            }
        }
    }

    #[test]
    fn pairs_below_minimum_are_noise() {
        let commits = vec![
            make_commit(1, &["a.ts", "b.ts"]),
            make_commit(2, &["a.ts", "b.ts"]),
        ];
        let report = analyze_coupling(&commits, &CouplingConfig::default());
        assert!(report.files.is_empty());
    }

    #[test]
    fn duplicate_paths_in_a_commit_count_once() {
        let commits: Vec<Commit> = (0..3)
            .map(|i| make_commit(i, &["a.ts", "b.ts", "a.ts"]))
            .collect();
        let report = analyze_coupling(&commits, &CouplingConfig::default());
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].changes_a, 3);
        assert_eq!(report.files[0].co_changes, 3);
    }

    #[test]
    fn directory_pairs_use_their_own_minimum() {
        let mut commits: Vec<Commit> = (0..4)
            .map(|i| make_commit(i, &["core/x.ts", "web/y.ts"]))
            .collect();
        let report = analyze_coupling(&commits, &CouplingConfig::default());
        assert_eq!(report.files.len(), 1);
        assert!(report.directories.is_empty());

        commits.push(make_commit(9, &["core/z.ts", "web/w.ts"]));
        let report = analyze_coupling(&commits, &CouplingConfig::default());
        assert_eq!(report.directories.len(), 1);
        let dirs = &report.directories[0];
        assert_eq!((dirs.path_a.as_str(), dirs.path_b.as_str()), ("core", "web"));
        assert_eq!(dirs.co_changes, 5);
        assert!(!dirs.hidden_dependency);
    }

    #[test]
    fn oversized_commits_are_skipped_when_limited() {
        let commits: Vec<Commit> = (0..3)
            .map(|i| make_commit(i, &["a.ts", "b.ts", "c.ts"]))
            .collect();
        let config = CouplingConfig {
            max_files_per_commit: Some(2),
            ..CouplingConfig::default()
        };
        assert!(analyze_coupling(&commits, &config).files.is_empty());
        assert_eq!(
            analyze_coupling(&commits, &CouplingConfig::default())
                .files
                .len(),
            3
        );
    }

    #[test]
    fn pairs_sort_by_strength_then_co_changes() {
        let mut commits = Vec::new();
        for i in 0..6 {
            commits.push(make_commit(i, &["hot/a.ts", "hot/b.ts"]));
        }
        for i in 10..13 {
            commits.push(make_commit(i, &["cold/c.ts", "cold/d.ts"]));
        }
        for i in 20..26 {
            commits.push(make_commit(i, &["cold/e.ts"]));
        }
        for i in 30..33 {
            commits.push(make_commit(i, &["cold/e.ts", "cold/f.ts"]));
        }
        let report = analyze_coupling(&commits, &CouplingConfig::default());
        let order: Vec<(&str, &str)> = report
            .files
            .iter()
            .map(|p| (p.path_a.as_str(), p.path_b.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("hot/a.ts", "hot/b.ts"),
                ("cold/c.ts", "cold/d.ts"),
                ("cold/e.ts", "cold/f.ts"),
            ]
        );
    }
}
