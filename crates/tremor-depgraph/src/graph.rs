use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tremor_core::{ArchLayer, GraphConfig};

use crate::hubs::HubKind;
use crate::imports::{extract_imports, is_internal, resolve_import, ImportKind};
use crate::walker::SourceFile;

/// A module in the import graph with its computed metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub path: String,
    /// Modules this one imports, sorted.
    pub imports: Vec<String>,
    /// Modules importing this one, sorted.
    pub imported_by: Vec<String>,
    pub fan_in: usize,
    pub fan_out: usize,
    /// `fan_out / (fan_in + fan_out)`, 0 for isolated modules.
    pub instability: f64,
    /// Shortest import distance from an entry point, [`ORPHAN_DEPTH`] if unreachable.
    ///
    /// [`ORPHAN_DEPTH`]: crate::traversal::ORPHAN_DEPTH
    pub depth: u32,
    pub is_entry: bool,
    pub is_orphan: bool,
    pub is_hub: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_kind: Option<HubKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<ArchLayer>,
    pub cluster: String,
}

/// Instability of a module.
///
/// # Examples
///
/// ```
/// use tremor_depgraph::graph::instability;
///
/// assert_eq!(instability(0, 0), 0.0);
/// assert_eq!(instability(3, 1), 0.25);
/// assert_eq!(instability(0, 4), 1.0);
/// ```
pub fn instability(fan_in: usize, fan_out: usize) -> f64 {
    let total = fan_in + fan_out;
    if total == 0 {
        0.0
    } else {
        fan_out as f64 / total as f64
    }
}

/// Directed import graph over a file snapshot.
///
/// Nodes are added in path order, so node indices sort the same way paths do.
///
/// # Examples
///
/// ```
/// use tremor_core::GraphConfig;
/// use tremor_depgraph::graph::DependencyGraph;
/// use tremor_depgraph::walker::SourceFile;
///
/// let files = vec![
///     SourceFile::new("src/index.ts", "import { run } from './app';"),
///     SourceFile::new("src/app.ts", "export function run() {}"),
/// ];
/// let graph = DependencyGraph::build(&files, &GraphConfig::default());
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.imports("src/index.ts"), vec!["src/app.ts"]);
/// assert_eq!(graph.imported_by("src/app.ts"), vec!["src/index.ts"]);
/// ```
pub struct DependencyGraph {
    graph: DiGraph<String, ImportKind>,
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph from `files`, keeping only files with a configured
    /// extension. Edges are resolved imports; duplicates and self-imports
    /// are dropped.
    pub fn build(files: &[SourceFile], config: &GraphConfig) -> Self {
        let mut sources: Vec<&SourceFile> = files
            .iter()
            .filter(|f| {
                f.extension()
                    .is_some_and(|ext| config.extensions.iter().any(|known| known == ext))
            })
            .collect();
        sources.sort_by(|a, b| a.path.cmp(&b.path));
        sources.dedup_by(|a, b| a.path == b.path);

        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for file in &sources {
            let idx = graph.add_node(file.path.clone());
            index.insert(file.path.clone(), idx);
        }

        let snapshot: HashSet<String> = index.keys().cloned().collect();
        let mut unresolved = 0usize;
        for file in &sources {
            let Some(&from) = index.get(&file.path) else {
                continue;
            };
            for import in extract_imports(&file.content) {
                if !is_internal(&import.specifier, &config.aliases) {
                    continue;
                }
                let Some(target) = resolve_import(
                    &file.path,
                    &import.specifier,
                    &snapshot,
                    &config.extensions,
                    &config.aliases,
                ) else {
                    tracing::debug!(from = %file.path, specifier = %import.specifier, "unresolved import");
                    unresolved += 1;
                    continue;
                };
                let Some(&to) = index.get(&target) else {
                    continue;
                };
                if from == to || graph.contains_edge(from, to) {
                    continue;
                }
                graph.add_edge(from, to, import.kind);
            }
        }

        tracing::info!(
            files = graph.node_count(),
            edges = graph.edge_count(),
            unresolved,
            "built import graph"
        );

        Self { graph, index }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Every edge as `(importer, imported, kind)`, ordered by importer then target.
    pub fn edges(&self) -> Vec<(&str, &str, ImportKind)> {
        let mut edges: Vec<(NodeIndex, NodeIndex, ImportKind)> = self
            .graph
            .edge_references()
            .map(|e| (e.source(), e.target(), *e.weight()))
            .collect();
        edges.sort_by_key(|(from, to, _)| (*from, *to));
        edges
            .into_iter()
            .map(|(from, to, kind)| (self.graph[from].as_str(), self.graph[to].as_str(), kind))
            .collect()
    }

    /// Modules imported by `path`, sorted. Empty for unknown paths.
    pub fn imports(&self, path: &str) -> Vec<&str> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Modules importing `path`, sorted. Empty for unknown paths.
    pub fn imported_by(&self, path: &str) -> Vec<&str> {
        self.neighbors(path, Direction::Incoming)
    }

    pub fn fan_in(&self, path: &str) -> usize {
        self.index.get(path).map_or(0, |&idx| {
            self.graph.neighbors_directed(idx, Direction::Incoming).count()
        })
    }

    pub fn fan_out(&self, path: &str) -> usize {
        self.index.get(path).map_or(0, |&idx| {
            self.graph.neighbors_directed(idx, Direction::Outgoing).count()
        })
    }

    /// Outgoing adjacency by node position, each list sorted by path.
    pub(crate) fn adjacency(&self) -> Vec<Vec<usize>> {
        self.graph
            .node_indices()
            .map(|idx| {
                let mut next: Vec<usize> = self.graph.neighbors(idx).map(|n| n.index()).collect();
                next.sort_unstable();
                next
            })
            .collect()
    }

    pub(crate) fn path_at(&self, position: usize) -> &str {
        &self.graph[NodeIndex::new(position)]
    }

    pub(crate) fn position(&self, path: &str) -> Option<usize> {
        self.index.get(path).map(|idx| idx.index())
    }

    fn neighbors(&self, path: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.index.get(path) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        found.sort_unstable();
        found
            .into_iter()
            .map(|n| self.graph[n].as_str())
            .collect()
    }
}
