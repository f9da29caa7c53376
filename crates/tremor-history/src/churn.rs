//! Churn and combined risk scoring.
//!
//! Ranks files by how often and how heavily they change, rolls the results
//! up into directory hotspots, and blends frequency, churn, and ownership
//! concentration into a 0–100 risk score.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tremor_core::{ChurnConfig, HotspotThresholds, RiskLevel};

use crate::bus_factor::ContributorCounts;
use crate::directory_of;
use crate::parser::Commit;

/// Change history of a single file.
///
/// # Examples
///
/// ```
/// use tremor_history::churn::churn_score;
///
/// // Ten commits with 999 changed lines: 10 * log10(1000) = 30.
/// assert!((churn_score(10, 999) - 30.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChurn {
    /// File path (post-rename).
    pub path: String,
    /// Commits touching the file.
    pub commits: u32,
    /// Lines added across all commits.
    pub additions: u64,
    /// Lines removed across all commits.
    pub deletions: u64,
    /// Commits where the file changed as binary.
    pub binary_changes: u32,
    /// `commits * log10(additions + deletions + 1)`.
    pub churn_score: f64,
    /// Distinct authors.
    pub authors: usize,
    /// Author with the most commits to the file.
    pub primary_owner: String,
    /// Share of commits by the primary owner (0–100).
    pub ownership_pct: f64,
    /// Earliest commit touching the file.
    pub first_seen: DateTime<FixedOffset>,
    /// Latest commit touching the file.
    pub last_seen: DateTime<FixedOffset>,
}

/// Aggregate churn of a directory's immediate files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryHotspot {
    /// Directory path, `.` for the repository root.
    pub path: String,
    /// Commits touching any file directly in the directory.
    pub commits: u32,
    /// Files directly in the directory.
    pub files: usize,
    /// Sum of the files' churn scores.
    pub total_churn: f64,
    /// `total_churn / files`.
    pub avg_churn: f64,
    pub risk_level: RiskLevel,
}

/// Combined risk of a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRisk {
    pub path: String,
    /// Weighted score (0–100).
    pub score: f64,
    pub level: RiskLevel,
    /// Commits relative to the most-changed file (0–1).
    pub frequency: f64,
    /// Churn score relative to the highest churn score (0–1).
    pub churn: f64,
    /// Ownership concentration relative to the highest (0–1).
    pub ownership: f64,
    pub primary_owner: String,
}

/// Output of [`analyze_churn`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnReport {
    /// Files by churn score, highest first.
    pub files: Vec<FileChurn>,
    /// Directories by total churn, highest first.
    pub directories: Vec<DirectoryHotspot>,
    /// Files scoring above the low band, highest first.
    pub risks: Vec<FileRisk>,
}

/// Churn score for a file: frequency times log-compressed magnitude.
pub fn churn_score(commits: u32, lines_changed: u64) -> f64 {
    f64::from(commits) * ((lines_changed + 1) as f64).log10()
}

/// Map a 0–100 combined score to a risk band.
///
/// # Examples
///
/// ```
/// use tremor_core::RiskLevel;
/// use tremor_history::churn::risk_level;
///
/// assert_eq!(risk_level(71.0), RiskLevel::Critical);
/// assert_eq!(risk_level(70.0), RiskLevel::High);
/// assert_eq!(risk_level(30.0), RiskLevel::Low);
/// ```
pub fn risk_level(score: f64) -> RiskLevel {
    if score > 70.0 {
        RiskLevel::Critical
    } else if score > 50.0 {
        RiskLevel::High
    } else if score > 30.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Classify a directory by its commit count and average churn.
///
/// Both values must strictly exceed a level's thresholds.
pub fn hotspot_level(commits: u32, avg_churn: f64, thresholds: &HotspotThresholds) -> RiskLevel {
    let levels = [
        (RiskLevel::Critical, &thresholds.critical),
        (RiskLevel::High, &thresholds.high),
        (RiskLevel::Medium, &thresholds.medium),
    ];
    levels
        .into_iter()
        .find(|(_, t)| commits > t.commits && avg_churn > t.avg_churn)
        .map_or(RiskLevel::Low, |(level, _)| level)
}

struct FileAggregate {
    commits: u32,
    additions: u64,
    deletions: u64,
    binary_changes: u32,
    authors: ContributorCounts,
    first_seen: DateTime<FixedOffset>,
    last_seen: DateTime<FixedOffset>,
}

impl FileAggregate {
    fn new(at: DateTime<FixedOffset>) -> Self {
        Self {
            commits: 0,
            additions: 0,
            deletions: 0,
            binary_changes: 0,
            authors: ContributorCounts::default(),
            first_seen: at,
            last_seen: at,
        }
    }
}

/// Fold the commit stream into per-file churn, directory hotspots, and
/// combined risk.
///
/// # Examples
///
/// ```
/// use tremor_core::ChurnConfig;
/// use tremor_history::churn::analyze_churn;
///
/// let report = analyze_churn(&[], &ChurnConfig::default());
/// assert!(report.files.is_empty());
/// ```
pub fn analyze_churn(commits: &[Commit], config: &ChurnConfig) -> ChurnReport {
    let mut aggregates: HashMap<String, FileAggregate> = HashMap::new();
    let mut directory_commits: HashMap<String, u32> = HashMap::new();

    for commit in commits {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut dirs: HashSet<&str> = HashSet::new();

        for change in &commit.files {
            let entry = aggregates
                .entry(change.path.clone())
                .or_insert_with(|| FileAggregate::new(commit.timestamp));
            entry.additions += change.additions;
            entry.deletions += change.deletions;
            if change.binary {
                entry.binary_changes += 1;
            }

            if !seen.insert(change.path.as_str()) {
                continue;
            }
            entry.commits += 1;
            entry.authors.record(&commit.author);
            entry.first_seen = entry.first_seen.min(commit.timestamp);
            entry.last_seen = entry.last_seen.max(commit.timestamp);
            dirs.insert(directory_of(&change.path));
        }

        for dir in dirs {
            *directory_commits.entry(dir.to_string()).or_default() += 1;
        }
    }

    let mut files: Vec<FileChurn> = aggregates
        .into_iter()
        .map(|(path, agg)| {
            let ranked = agg.authors.ranked();
            let (primary_owner, top) = ranked
                .first()
                .map_or((String::new(), 0), |c| (c.author.clone(), c.commits));
            let ownership_pct = if agg.commits == 0 {
                0.0
            } else {
                f64::from(top) / f64::from(agg.commits) * 100.0
            };
            FileChurn {
                churn_score: churn_score(agg.commits, agg.additions + agg.deletions),
                authors: agg.authors.len(),
                primary_owner,
                ownership_pct,
                path,
                commits: agg.commits,
                additions: agg.additions,
                deletions: agg.deletions,
                binary_changes: agg.binary_changes,
                first_seen: agg.first_seen,
                last_seen: agg.last_seen,
            }
        })
        .collect();

    files.sort_by(|a, b| {
        b.churn_score
            .partial_cmp(&a.churn_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });

    let directories = directory_hotspots(&files, &directory_commits, &config.hotspots);
    let risks = file_risks(&files, config);

    ChurnReport {
        files,
        directories,
        risks,
    }
}

fn directory_hotspots(
    files: &[FileChurn],
    directory_commits: &HashMap<String, u32>,
    thresholds: &HotspotThresholds,
) -> Vec<DirectoryHotspot> {
    let mut grouped: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for file in files {
        let entry = grouped.entry(directory_of(&file.path)).or_default();
        entry.0 += 1;
        entry.1 += file.churn_score;
    }

    let mut hotspots: Vec<DirectoryHotspot> = grouped
        .into_iter()
        .map(|(dir, (count, total_churn))| {
            let commits = directory_commits.get(dir).copied().unwrap_or(0);
            let avg_churn = if count == 0 {
                0.0
            } else {
                total_churn / count as f64
            };
            DirectoryHotspot {
                path: dir.to_string(),
                commits,
                files: count,
                total_churn,
                avg_churn,
                risk_level: hotspot_level(commits, avg_churn, thresholds),
            }
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.total_churn
            .partial_cmp(&a.total_churn)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hotspots
}

fn file_risks(files: &[FileChurn], config: &ChurnConfig) -> Vec<FileRisk> {
    let max_commits = files.iter().map(|f| f.commits).max().unwrap_or(0);
    let max_churn = files.iter().map(|f| f.churn_score).fold(0.0f64, f64::max);
    let max_ownership = files.iter().map(|f| f.ownership_pct).fold(0.0f64, f64::max);

    let mut risks: Vec<FileRisk> = files
        .iter()
        .filter_map(|file| {
            let frequency = normalize(f64::from(file.commits), f64::from(max_commits));
            let churn = normalize(file.churn_score, max_churn);
            let ownership = normalize(file.ownership_pct, max_ownership);
            let score = (100.0
                * (config.frequency_weight * frequency
                    + config.churn_weight * churn
                    + config.ownership_weight * ownership))
                .clamp(0.0, 100.0);
            let level = risk_level(score);
            (level > RiskLevel::Low).then(|| FileRisk {
                path: file.path.clone(),
                score,
                level,
                frequency,
                churn,
                ownership,
                primary_owner: file.primary_owner.clone(),
            })
        })
        .collect();

    risks.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    risks
}

fn normalize(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}
