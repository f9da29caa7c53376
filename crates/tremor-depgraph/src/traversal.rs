//! Reachability and cycle analysis over the import graph.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tremor_core::{GraphConfig, RiskLevel};

use crate::graph::DependencyGraph;

/// Depth assigned to modules no entry point reaches.
pub const ORPHAN_DEPTH: u32 = 999;

/// An import cycle.
///
/// # Examples
///
/// ```
/// use tremor_core::RiskLevel;
/// use tremor_depgraph::traversal::cycle_severity;
///
/// assert_eq!(cycle_severity(2), RiskLevel::Low);
/// assert_eq!(cycle_severity(4), RiskLevel::Medium);
/// assert_eq!(cycle_severity(5), RiskLevel::High);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    /// Modules in import order; the last imports the first.
    pub nodes: Vec<String>,
    pub length: usize,
    pub severity: RiskLevel,
}

/// Severity of a cycle by the number of modules in it.
pub fn cycle_severity(length: usize) -> RiskLevel {
    match length {
        0..=2 => RiskLevel::Low,
        3..=4 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

/// Whether `path` follows an entry-point naming convention: its file stem is
/// one of `config.entry_names`, or one of its directories is in
/// `config.entry_dirs`.
///
/// # Examples
///
/// ```
/// use tremor_core::GraphConfig;
/// use tremor_depgraph::traversal::is_entry_path;
///
/// let config = GraphConfig::default();
/// assert!(is_entry_path("src/index.ts", &config));
/// assert!(is_entry_path("src/pages/about.tsx", &config));
/// assert!(!is_entry_path("src/util.ts", &config));
/// ```
pub fn is_entry_path(path: &str, config: &GraphConfig) -> bool {
    let mut segments: Vec<&str> = path.split('/').collect();
    let Some(file_name) = segments.pop() else {
        return false;
    };
    let stem = file_name.split('.').next().unwrap_or(file_name);
    config.entry_names.iter().any(|name| name == stem)
        || segments
            .iter()
            .any(|dir| config.entry_dirs.iter().any(|d| d == dir))
}

/// Entry points in path order: modules nothing imports, plus modules named
/// like entry points regardless of their fan-in.
pub fn entry_points<'g>(graph: &'g DependencyGraph, config: &GraphConfig) -> Vec<&'g str> {
    graph
        .paths()
        .filter(|path| graph.fan_in(path) == 0 || is_entry_path(path, config))
        .collect()
}

/// Shortest import distance from any of `entries` for every module, by node
/// position. Unreached modules get [`ORPHAN_DEPTH`].
///
/// # Examples
///
/// ```
/// use tremor_core::GraphConfig;
/// use tremor_depgraph::graph::DependencyGraph;
/// use tremor_depgraph::traversal::{depths, ORPHAN_DEPTH};
/// use tremor_depgraph::walker::SourceFile;
///
/// let files = vec![
///     SourceFile::new("main.ts", "import './a';"),
///     SourceFile::new("a.ts", "import './b';"),
///     SourceFile::new("b.ts", ""),
/// ];
/// let graph = DependencyGraph::build(&files, &GraphConfig::default());
/// let depth = depths(&graph, &["main.ts"]);
/// // Nodes are in path order: a.ts, b.ts, main.ts.
/// assert_eq!(depth, vec![1, 2, 0]);
/// assert!(depths(&graph, &[]).iter().all(|d| *d == ORPHAN_DEPTH));
/// ```
pub fn depths(graph: &DependencyGraph, entries: &[&str]) -> Vec<u32> {
    let adjacency = graph.adjacency();
    let mut depth = vec![ORPHAN_DEPTH; adjacency.len()];
    let mut queue = VecDeque::new();

    for entry in entries {
        if let Some(position) = graph.position(entry) {
            if depth[position] != 0 {
                depth[position] = 0;
                queue.push_back(position);
            }
        }
    }

    while let Some(node) = queue.pop_front() {
        let next_depth = depth[node] + 1;
        for &next in &adjacency[node] {
            if depth[next] == ORPHAN_DEPTH {
                depth[next] = next_depth;
                queue.push_back(next);
            }
        }
    }

    depth
}

/// Find import cycles with a depth-first walk.
///
/// Each start module is tried in path order, skipping modules an earlier
/// walk already finished. A cycle is recorded whenever an edge reaches a
/// module still on the walk's path; the same set of modules is reported once
/// however many times it is found.
///
/// # Examples
///
/// ```
/// use tremor_core::GraphConfig;
/// use tremor_depgraph::graph::DependencyGraph;
/// use tremor_depgraph::traversal::find_cycles;
/// use tremor_depgraph::walker::SourceFile;
///
/// let files = vec![
///     SourceFile::new("a.ts", "import './b';"),
///     SourceFile::new("b.ts", "import './a';"),
/// ];
/// let graph = DependencyGraph::build(&files, &GraphConfig::default());
/// let cycles = find_cycles(&graph);
/// assert_eq!(cycles.len(), 1);
/// assert_eq!(cycles[0].nodes, vec!["a.ts", "b.ts"]);
/// ```
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let adjacency = graph.adjacency();
    let count = adjacency.len();
    let mut visited = vec![false; count];
    let mut on_stack = vec![false; count];
    let mut path: Vec<usize> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut cycles = Vec::new();

    for start in 0..count {
        if visited[start] {
            continue;
        }

        // Frames are (node, index of the next successor to try).
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        visited[start] = true;
        on_stack[start] = true;
        path.push(start);

        while let Some(&(node, cursor)) = stack.last() {
            let Some(&next) = adjacency[node].get(cursor) else {
                stack.pop();
                path.pop();
                on_stack[node] = false;
                continue;
            };
            if let Some(frame) = stack.last_mut() {
                frame.1 += 1;
            }

            if on_stack[next] {
                if let Some(begin) = path.iter().position(|&p| p == next) {
                    let nodes: Vec<String> = path[begin..]
                        .iter()
                        .map(|&p| graph.path_at(p).to_string())
                        .collect();
                    let mut key: Vec<&str> = nodes.iter().map(String::as_str).collect();
                    key.sort_unstable();
                    if seen.insert(key.join("|")) {
                        cycles.push(Cycle {
                            length: nodes.len(),
                            severity: cycle_severity(nodes.len()),
                            nodes,
                        });
                    }
                }
            } else if !visited[next] {
                visited[next] = true;
                on_stack[next] = true;
                path.push(next);
                stack.push((next, 0));
            }
        }
    }

    tracing::debug!(cycles = cycles.len(), "cycle detection finished");
    cycles
}
