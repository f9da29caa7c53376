//! Knowledge concentration (bus factor) analysis.
//!
//! For a scope (the repository, a directory, or a file) the bus factor is
//! the smallest number of authors whose combined commits reach a threshold
//! share of all commits in that scope.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tremor_core::{BusFactorConfig, Identity, RiskLevel};

use crate::directory_of;
use crate::parser::Commit;

/// Per-author commit counter that remembers first-seen order.
///
/// Ranking sorts by count descending with a stable sort, so authors with
/// equal counts stay in the order they were first recorded.
///
/// # Examples
///
/// ```
/// use tremor_core::Identity;
/// use tremor_history::bus_factor::ContributorCounts;
///
/// let mut counts = ContributorCounts::default();
/// counts.record(&Identity::new("Bob", "bob@x.io"));
/// counts.record(&Identity::new("Alice", "alice@x.io"));
/// counts.record(&Identity::new("Alice", "ALICE@x.io"));
/// let ranked = counts.ranked();
/// assert_eq!(ranked[0].author, "alice@x.io");
/// assert_eq!(ranked[0].commits, 2);
/// assert_eq!(counts.total(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContributorCounts {
    index: HashMap<String, usize>,
    entries: Vec<ContributorCount>,
}

/// One author's tally inside a [`ContributorCounts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorCount {
    /// Normalized author key (lower-cased email).
    pub author: String,
    /// Display name first seen for this author.
    pub name: String,
    /// Commits counted.
    pub commits: u32,
}

impl ContributorCounts {
    /// Count one commit for `identity`.
    pub fn record(&mut self, identity: &Identity) {
        let key = identity.key();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].commits += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(ContributorCount {
                    author: key,
                    name: identity.name.clone(),
                    commits: 1,
                });
            }
        }
    }

    /// Total commits recorded.
    pub fn total(&self) -> u32 {
        self.entries.iter().map(|e| e.commits).sum()
    }

    /// Number of distinct authors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Authors by commit count descending, ties in first-seen order.
    pub fn ranked(&self) -> Vec<ContributorCount> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.commits.cmp(&a.commits));
        ranked
    }
}

/// Smallest `k` such that the top `k` counts reach `threshold` of the total.
///
/// `counts` need not be sorted. Zero authors give 0, one author gives 1.
///
/// # Examples
///
/// ```
/// use tremor_history::bus_factor::bus_factor;
///
/// assert_eq!(bus_factor(&[], 0.5), 0);
/// assert_eq!(bus_factor(&[7], 0.5), 1);
/// assert_eq!(bus_factor(&[3, 3, 3, 3], 0.5), 2);
/// assert_eq!(bus_factor(&[1, 8, 1], 0.5), 1);
/// ```
pub fn bus_factor(counts: &[u32], threshold: f64) -> u32 {
    match counts.len() {
        0 => return 0,
        1 => return 1,
        _ => {}
    }

    let total: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    if total == 0 {
        return 0;
    }

    let mut sorted = counts.to_vec();
    sorted.sort_by(|a, b| b.cmp(a));

    let target = threshold * total as f64;
    let mut accumulated = 0u64;
    for (i, count) in sorted.iter().enumerate() {
        accumulated += u64::from(*count);
        if accumulated as f64 >= target {
            return (i + 1) as u32;
        }
    }

    sorted.len() as u32
}

/// What a bus factor is computed over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum Scope {
    /// Every commit.
    Repository,
    /// Commits touching any file at or below this directory.
    Directory(String),
    /// Commits touching this file.
    File(String),
}

impl Scope {
    /// Whether a file path falls inside this scope.
    ///
    /// # Examples
    ///
    /// ```
    /// use tremor_history::bus_factor::Scope;
    ///
    /// let scope = Scope::Directory("src".into());
    /// assert!(scope.contains("src/a/b.ts"));
    /// assert!(!scope.contains("srcx/a.ts"));
    /// assert!(Scope::Directory(".".into()).contains("README.md"));
    /// ```
    pub fn contains(&self, path: &str) -> bool {
        match self {
            Scope::Repository => true,
            Scope::File(file) => path == file,
            Scope::Directory(dir) if dir == "." => directory_of(path) == ".",
            Scope::Directory(dir) => {
                path.len() > dir.len() && path.starts_with(dir.as_str()) && path[dir.len()..].starts_with('/')
            }
        }
    }
}

/// A contributor's share of a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorShare {
    /// Normalized author key.
    pub author: String,
    /// Display name.
    pub name: String,
    /// Commits in scope.
    pub commits: u32,
    /// Percentage of the scope's commits (0–100).
    pub share: f64,
}

/// Bus factor of one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeBusFactor {
    pub scope: Scope,
    pub bus_factor: u32,
    /// Commits touching the scope, each counted once.
    pub total_commits: u32,
    /// Contributors by commit count descending.
    pub contributors: Vec<ContributorShare>,
    /// `Critical` for bus factor ≤ 1, `Medium` for ≤ 2; `None` otherwise or
    /// when the scope has fewer than `min_commits` commits.
    pub risk: Option<RiskLevel>,
}

/// Bus factor across the repository, its directories, and its files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusFactorReport {
    pub repository: ScopeBusFactor,
    /// Every directory containing a touched file (recursive scopes).
    pub directories: Vec<ScopeBusFactor>,
    /// Every touched file.
    pub files: Vec<ScopeBusFactor>,
    /// Files flagged critical.
    pub critical_files: usize,
    /// Files flagged medium.
    pub medium_files: usize,
}

/// Compute the bus factor of a single scope.
///
/// A scope nothing touched yields bus factor 0 and no flag.
///
/// # Examples
///
/// ```
/// use tremor_core::BusFactorConfig;
/// use tremor_history::bus_factor::{analyze_scope, Scope};
///
/// let result = analyze_scope(&[], &Scope::Repository, &BusFactorConfig::default());
/// assert_eq!(result.bus_factor, 0);
/// assert!(result.risk.is_none());
/// ```
pub fn analyze_scope(commits: &[Commit], scope: &Scope, config: &BusFactorConfig) -> ScopeBusFactor {
    let mut counts = ContributorCounts::default();
    for commit in commits {
        let touches = match scope {
            Scope::Repository => true,
            _ => commit.files.iter().any(|f| scope.contains(&f.path)),
        };
        if touches {
            counts.record(&commit.author);
        }
    }
    summarize(scope.clone(), &counts, config)
}

/// Compute bus factors for the repository and every touched directory and file
/// in a single pass.
///
/// Directories and files are ordered most fragile first: ascending bus
/// factor, then descending commit count, then path.
pub fn analyze_bus_factor(commits: &[Commit], config: &BusFactorConfig) -> BusFactorReport {
    let mut repository = ContributorCounts::default();
    let mut files: BTreeMap<String, ContributorCounts> = BTreeMap::new();
    let mut directories: BTreeMap<String, ContributorCounts> = BTreeMap::new();

    for commit in commits {
        repository.record(&commit.author);

        let paths: HashSet<&str> = commit.files.iter().map(|f| f.path.as_str()).collect();
        let mut dirs: HashSet<&str> = HashSet::new();
        for path in &paths {
            files.entry((*path).to_string()).or_default().record(&commit.author);
            let mut dir = directory_of(path);
            dirs.insert(dir);
            while let Some((parent, _)) = dir.rsplit_once('/') {
                dirs.insert(parent);
                dir = parent;
            }
        }
        for dir in dirs {
            directories.entry(dir.to_string()).or_default().record(&commit.author);
        }
    }

    let repository = summarize(Scope::Repository, &repository, config);

    let mut directories: Vec<ScopeBusFactor> = directories
        .into_iter()
        .map(|(dir, counts)| summarize(Scope::Directory(dir), &counts, config))
        .collect();
    sort_fragile_first(&mut directories);

    let mut files: Vec<ScopeBusFactor> = files
        .into_iter()
        .map(|(path, counts)| summarize(Scope::File(path), &counts, config))
        .collect();
    sort_fragile_first(&mut files);

    let critical_files = files
        .iter()
        .filter(|f| f.risk == Some(RiskLevel::Critical))
        .count();
    let medium_files = files
        .iter()
        .filter(|f| f.risk == Some(RiskLevel::Medium))
        .count();

    BusFactorReport {
        repository,
        directories,
        files,
        critical_files,
        medium_files,
    }
}

fn summarize(scope: Scope, counts: &ContributorCounts, config: &BusFactorConfig) -> ScopeBusFactor {
    let ranked = counts.ranked();
    let total = counts.total();
    let tallies: Vec<u32> = ranked.iter().map(|c| c.commits).collect();
    let factor = bus_factor(&tallies, config.threshold);

    let contributors = ranked
        .into_iter()
        .map(|c| ContributorShare {
            share: if total == 0 {
                0.0
            } else {
                f64::from(c.commits) / f64::from(total) * 100.0
            },
            author: c.author,
            name: c.name,
            commits: c.commits,
        })
        .collect();

    let risk = if total > 0 && total >= config.min_commits {
        match factor {
            0 | 1 => Some(RiskLevel::Critical),
            2 => Some(RiskLevel::Medium),
            _ => None,
        }
    } else {
        None
    };

    ScopeBusFactor {
        scope,
        bus_factor: factor,
        total_commits: total,
        contributors,
        risk,
    }
}

fn sort_fragile_first(entries: &mut [ScopeBusFactor]) {
    entries.sort_by(|a, b| {
        a.bus_factor
            .cmp(&b.bus_factor)
            .then_with(|| b.total_commits.cmp(&a.total_commits))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ChangeStatus, FileChange};
    use chrono::{FixedOffset, TimeZone};

    fn make_commit(email: &str, timestamp: i64, files: &[&str]) -> Commit {
        let name = email.split('@').next().unwrap_or(email);
        Commit {
            hash: format!("{email}-{timestamp}"),
            short_hash: "abc".into(),
            author: Identity::new(name, email),
            committer: Identity::new(name, email),
            timestamp: FixedOffset::east_opt(0).unwrap().timestamp_opt(timestamp, 0).unwrap(),
            subject: "test".into(),
            body: String::new(),
            parents: vec!["p".into()],
            files: files
                .iter()
                .map(|path| FileChange {
                    path: (*path).into(),
                    old_path: None,
                    additions: 5,
                    deletions: 2,
                    binary: false,
                    status: ChangeStatus::Modified,
                })
                .collect(),
        }
    }

    #[test]
    fn single_author_scope_has_bus_factor_one() {
        let commits: Vec<Commit> = (0..6)
            .map(|i| make_commit("alice@e.com", i, &["main.ts"]))
            .collect();
        let result = analyze_scope(&commits, &Scope::File("main.ts".into()), &BusFactorConfig::default());
        assert_eq!(result.bus_factor, 1);
        assert_eq!(result.total_commits, 6);
        assert_eq!(result.risk, Some(RiskLevel::Critical));
        assert!((result.contributors[0].share - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bus_factor_is_at_least_one_with_commits() {
        for counts in [vec![1], vec![1, 1], vec![5, 1, 1, 1], vec![2, 2, 2, 2, 2]] {
            assert!(bus_factor(&counts, 0.5) >= 1, "counts {counts:?}");
            assert!(bus_factor(&counts, 1.0) >= 1, "counts {counts:?}");
        }
    }

    #[test]
    fn threshold_controls_how_many_authors_are_needed() {
        let counts = [40, 30, 20, 10];
        assert_eq!(bus_factor(&counts, 0.4), 1);
        assert_eq!(bus_factor(&counts, 0.5), 2);
        assert_eq!(bus_factor(&counts, 0.8), 3);
        assert_eq!(bus_factor(&counts, 1.0), 4);
    }

    #[test]
    fn email_case_collapses_to_one_author() {
        let commits = vec![
            make_commit("Alice@E.com", 1, &["a.ts"]),
            make_commit("alice@e.com", 2, &["a.ts"]),
            make_commit("ALICE@e.COM", 3, &["a.ts"]),
        ];
        let result = analyze_scope(&commits, &Scope::Repository, &BusFactorConfig::default());
        assert_eq!(result.contributors.len(), 1);
        assert_eq!(result.contributors[0].commits, 3);
        assert_eq!(result.bus_factor, 1);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let commits = vec![
            make_commit("carol@e.com", 1, &["a.ts"]),
            make_commit("bob@e.com", 2, &["a.ts"]),
            make_commit("bob@e.com", 3, &["a.ts"]),
            make_commit("carol@e.com", 4, &["a.ts"]),
        ];
        let result = analyze_scope(&commits, &Scope::Repository, &BusFactorConfig::default());
        let order: Vec<&str> = result.contributors.iter().map(|c| c.author.as_str()).collect();
        assert_eq!(order, vec!["carol@e.com", "bob@e.com"]);
    }

    #[test]
    fn rarely_touched_scopes_are_not_flagged() {
        let commits = vec![
            make_commit("alice@e.com", 1, &["rare.ts"]),
            make_commit("alice@e.com", 2, &["rare.ts"]),
        ];
        let result = analyze_scope(&commits, &Scope::File("rare.ts".into()), &BusFactorConfig::default());
        assert_eq!(result.bus_factor, 1);
        assert!(result.risk.is_none());
    }

    #[test]
    fn two_authors_needed_is_medium() {
        let commits: Vec<Commit> = (0..10)
            .map(|i| {
                let email = if i % 2 == 0 { "a@e.com" } else { "b@e.com" };
                make_commit(email, i, &["shared.ts"])
            })
            .collect();
        let config = BusFactorConfig {
            threshold: 0.75,
            min_commits: 5,
        };
        let result = analyze_scope(&commits, &Scope::File("shared.ts".into()), &config);
        assert_eq!(result.bus_factor, 2);
        assert_eq!(result.risk, Some(RiskLevel::Medium));
    }

    #[test]
    fn empty_scope_returns_zero() {
        let commits = vec![make_commit("a@e.com", 1, &["src/a.ts"])];
        let result = analyze_scope(&commits, &Scope::Directory("docs".into()), &BusFactorConfig::default());
        assert_eq!(result.bus_factor, 0);
        assert_eq!(result.total_commits, 0);
        assert!(result.contributors.is_empty());
        assert!(result.risk.is_none());
    }

    #[test]
    fn directory_scopes_include_nested_files() {
        let commits = vec![
            make_commit("a@e.com", 1, &["src/api/client.ts"]),
            make_commit("b@e.com", 2, &["src/ui/button.tsx"]),
            make_commit("c@e.com", 3, &["docs/readme.md"]),
        ];
        let result = analyze_scope(&commits, &Scope::Directory("src".into()), &BusFactorConfig::default());
        assert_eq!(result.total_commits, 2);

        let report = analyze_bus_factor(&commits, &BusFactorConfig::default());
        let dirs: Vec<&Scope> = report.directories.iter().map(|d| &d.scope).collect();
        assert!(dirs.contains(&&Scope::Directory("src".into())));
        assert!(dirs.contains(&&Scope::Directory("src/api".into())));
        assert!(dirs.contains(&&Scope::Directory("docs".into())));
    }

    #[test]
    fn dominant_author_repository_scenario() {
        // One author makes 90 of 100 commits, every file has a single author.
        let mut commits = Vec::new();
        let solo_files = ["src/a.ts", "src/b.ts", "src/c.ts"];
        for i in 0..90 {
            commits.push(make_commit("lead@e.com", i, &[solo_files[i as usize % 3]]));
        }
        for i in 90..100 {
            commits.push(make_commit("helper@e.com", i, &["docs/guide.md"]));
        }

        let report = analyze_bus_factor(&commits, &BusFactorConfig::default());
        assert_eq!(report.repository.bus_factor, 1);
        assert_eq!(report.repository.total_commits, 100);
        assert_eq!(report.files.len(), 4);
        for file in &report.files {
            assert_eq!(file.bus_factor, 1);
            assert_eq!(file.risk, Some(RiskLevel::Critical), "{:?}", file.scope);
        }
        assert_eq!(report.critical_files, 4);
        assert_eq!(report.medium_files, 0);
    }

    #[test]
    fn files_are_sorted_fragile_first() {
        let mut commits = Vec::new();
        for (i, email) in ["a@e.com", "b@e.com", "c@e.com", "d@e.com"].iter().enumerate() {
            commits.push(make_commit(email, i as i64, &["team.ts"]));
        }
        for i in 0..3 {
            commits.push(make_commit("a@e.com", 10 + i, &["solo.ts"]));
        }
        let report = analyze_bus_factor(&commits, &BusFactorConfig::default());
        assert_eq!(report.files[0].scope, Scope::File("solo.ts".into()));
        assert_eq!(report.files[1].bus_factor, 2);
    }
}
