//! Git history analysis: churn, knowledge concentration, and temporal coupling.
//!
//! Mines the commit log with a single `git log --numstat` invocation, parses
//! it into [`parser::Commit`] records, and derives churn hotspots, bus
//! factor, and co-change coupling from the resulting stream.

pub mod bus_factor;
pub mod churn;
pub mod coupling;
pub mod mining;
pub mod parser;

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tremor_core::TremorConfig;

use crate::bus_factor::{analyze_bus_factor, BusFactorReport};
use crate::churn::{analyze_churn, ChurnReport};
use crate::coupling::{analyze_coupling, CouplingReport};
use crate::parser::Commit;

/// Directory containing `path`, or `.` for files at the repository root.
///
/// # Examples
///
/// ```
/// use tremor_history::directory_of;
///
/// assert_eq!(directory_of("src/api/client.ts"), "src/api");
/// assert_eq!(directory_of("README.md"), ".");
/// ```
pub fn directory_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir,
        _ => ".",
    }
}

/// Totals over the analyzed commit stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub commits: usize,
    pub merges: usize,
    /// Distinct authors by normalized email.
    pub authors: usize,
    /// Distinct file paths touched.
    pub files: usize,
    pub first_commit: Option<DateTime<FixedOffset>>,
    pub last_commit: Option<DateTime<FixedOffset>>,
}

impl HistorySummary {
    pub fn from_commits(commits: &[Commit]) -> Self {
        let authors: HashSet<String> = commits.iter().map(|c| c.author.key()).collect();
        let files: HashSet<&str> = commits
            .iter()
            .flat_map(|c| c.files.iter().map(|f| f.path.as_str()))
            .collect();
        Self {
            commits: commits.len(),
            merges: commits.iter().filter(|c| c.is_merge()).count(),
            authors: authors.len(),
            files: files.len(),
            first_commit: commits.iter().map(|c| c.timestamp).min(),
            last_commit: commits.iter().map(|c| c.timestamp).max(),
        }
    }
}

/// Combined output of the history analyzers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReport {
    pub summary: HistorySummary,
    pub churn: ChurnReport,
    pub bus_factor: BusFactorReport,
    pub coupling: CouplingReport,
}

/// Run churn, bus-factor, and coupling analysis over one commit stream.
///
/// The analyzers only read `commits`, so they run concurrently.
///
/// # Examples
///
/// ```
/// use tremor_core::TremorConfig;
/// use tremor_history::analyze_history;
///
/// let report = analyze_history(&[], &TremorConfig::default());
/// assert_eq!(report.summary.commits, 0);
/// assert_eq!(report.bus_factor.repository.bus_factor, 0);
/// ```
pub fn analyze_history(commits: &[Commit], config: &TremorConfig) -> HistoryReport {
    let (churn, (bus_factor, coupling)) = rayon::join(
        || analyze_churn(commits, &config.churn),
        || {
            rayon::join(
                || analyze_bus_factor(commits, &config.bus_factor),
                || analyze_coupling(commits, &config.coupling),
            )
        },
    );

    HistoryReport {
        summary: HistorySummary::from_commits(commits),
        churn,
        bus_factor,
        coupling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ChangeStatus, FileChange};
    use chrono::TimeZone;
    use tremor_core::{Identity, RiskLevel};

    fn make_commit(email: &str, ts: i64, parents: usize, files: &[&str]) -> Commit {
        Commit {
            hash: format!("hash_{ts}"),
            short_hash: format!("h{ts}"),
            author: Identity::new(email, email),
            committer: Identity::new(email, email),
            timestamp: FixedOffset::east_opt(0)
                .unwrap()
                .timestamp_opt(ts, 0)
                .unwrap(),
            subject: "change".into(),
            body: String::new(),
            parents: (0..parents).map(|i| format!("p{i}")).collect(),
            files: files
                .iter()
                .map(|p| FileChange {
                    path: (*p).into(),
                    old_path: None,
                    additions: 2,
                    deletions: 1,
                    binary: false,
                    status: ChangeStatus::Modified,
                })
                .collect(),
        }
    }

    #[test]
    fn directory_of_handles_nesting_and_root() {
        assert_eq!(directory_of("a/b/c.ts"), "a/b");
        assert_eq!(directory_of("a.ts"), ".");
        assert_eq!(directory_of("/abs.ts"), ".");
    }

    #[test]
    fn summary_counts_merges_authors_and_span() {
        let commits = vec![
            make_commit("a@e.com", 300, 2, &["src/a.ts"]),
            make_commit("A@E.com", 100, 1, &["src/a.ts", "src/b.ts"]),
            make_commit("b@e.com", 200, 0, &["README.md"]),
        ];
        let summary = HistorySummary::from_commits(&commits);
        assert_eq!(summary.commits, 3);
        assert_eq!(summary.merges, 1);
        assert_eq!(summary.authors, 2);
        assert_eq!(summary.files, 3);
        assert_eq!(summary.first_commit.unwrap().timestamp(), 100);
        assert_eq!(summary.last_commit.unwrap().timestamp(), 300);
    }

    #[test]
    fn dominant_author_history_is_fragile_everywhere() {
        let mut commits = Vec::new();
        let files = ["src/a.ts", "src/b.ts", "lib/c.ts"];
        for i in 0..90 {
            commits.push(make_commit("owner@e.com", i, 1, &[files[i as usize % 3]]));
        }
        for i in 90..100 {
            commits.push(make_commit(&format!("dev{i}@e.com"), i, 1, &["docs/guide.md"]));
        }

        let report = analyze_history(&commits, &TremorConfig::default());
        assert_eq!(report.summary.commits, 100);
        assert_eq!(report.bus_factor.repository.bus_factor, 1);
        for file in &files {
            let entry = report
                .bus_factor
                .files
                .iter()
                .find(|f| f.scope.contains(file))
                .unwrap();
            assert_eq!(entry.risk, Some(RiskLevel::Critical));
        }
        assert!(report.coupling.files.is_empty());
        assert_eq!(report.churn.files.len(), 4);
    }

    #[test]
    fn report_serializes_with_camel_case_keys() {
        let commits = vec![make_commit("a@e.com", 1, 1, &["src/a.ts"])];
        let report = analyze_history(&commits, &TremorConfig::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["commits"], 1);
        assert!(json["busFactor"]["repository"]["busFactor"].is_number());
        assert!(json["churn"]["files"][0]["churnScore"].is_number());
        assert_eq!(json["busFactor"]["files"][0]["scope"]["kind"], "file");
    }
}
