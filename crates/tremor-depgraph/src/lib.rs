//! Import graph analysis over a snapshot of the source tree.
//!
//! Extracts import edges from JavaScript/TypeScript sources by pattern
//! matching, builds a petgraph graph, and derives fan-in/out, depth from
//! entry points, cycles, hubs, layering violations, and directory clusters.
//! Uses the `ignore` crate for file walking and `glob` for layer patterns.

pub mod clusters;
pub mod graph;
pub mod hubs;
pub mod imports;
pub mod layers;
pub mod traversal;
pub mod walker;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tremor_core::{GraphConfig, LayersConfig, TremorError};

use crate::clusters::{build_clusters, cluster_of, Cluster};
use crate::graph::{instability, DependencyGraph, DependencyNode};
use crate::hubs::{find_hubs, Hub, HubThresholds};
use crate::layers::{LayerPolicy, LayerViolation};
use crate::traversal::{depths, entry_points, find_cycles, Cycle, ORPHAN_DEPTH};
use crate::walker::{walk_sources, SourceFile};

/// Totals over the analyzed graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub files: usize,
    pub edges: usize,
    pub entry_points: usize,
    pub orphans: usize,
    pub cycles: usize,
    pub hubs: usize,
    pub violations: usize,
    pub clusters: usize,
    /// Deepest reachable module.
    pub max_depth: u32,
}

/// Full output of [`analyze_dependencies`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReport {
    pub summary: GraphSummary,
    /// Every module, in path order.
    pub nodes: Vec<DependencyNode>,
    pub entry_points: Vec<String>,
    /// Modules no entry point reaches.
    pub orphans: Vec<String>,
    pub cycles: Vec<Cycle>,
    pub hubs: Vec<Hub>,
    pub hub_thresholds: HubThresholds,
    pub violations: Vec<LayerViolation>,
    pub clusters: Vec<Cluster>,
}

/// Analyze the import structure of `files`.
///
/// # Errors
///
/// Returns [`TremorError::Config`] or [`TremorError::Pattern`] if the layer
/// configuration is invalid.
///
/// # Examples
///
/// ```
/// use tremor_core::{GraphConfig, LayersConfig};
/// use tremor_depgraph::analyze_dependencies;
/// use tremor_depgraph::walker::SourceFile;
///
/// let files = vec![
///     SourceFile::new("src/index.ts", "import './a';"),
///     SourceFile::new("src/a.ts", "import './b';"),
///     SourceFile::new("src/b.ts", "import './a';"),
/// ];
/// let report =
///     analyze_dependencies(&files, &GraphConfig::default(), &LayersConfig::default()).unwrap();
/// assert_eq!(report.summary.files, 3);
/// assert_eq!(report.cycles.len(), 1);
/// assert_eq!(report.entry_points, vec!["src/index.ts"]);
/// ```
pub fn analyze_dependencies(
    files: &[SourceFile],
    graph_config: &GraphConfig,
    layers_config: &LayersConfig,
) -> Result<DependencyReport, TremorError> {
    let policy = LayerPolicy::from_config(layers_config)?;
    let graph = DependencyGraph::build(files, graph_config);

    let entries = entry_points(&graph, graph_config);
    let depth = depths(&graph, &entries);
    let cycles = find_cycles(&graph);
    let (hubs, hub_thresholds) = find_hubs(&graph, graph_config);

    let edges: Vec<(&str, &str)> = graph
        .edges()
        .into_iter()
        .map(|(from, to, _)| (from, to))
        .collect();
    let violations = policy.violations(edges.iter().copied());
    let clusters = build_clusters(graph.paths(), edges.iter().copied());

    let nodes: Vec<DependencyNode> = graph
        .paths()
        .zip(depth.iter().copied())
        .map(|(path, depth)| {
            let fan_in = graph.fan_in(path);
            let fan_out = graph.fan_out(path);
            let hub_kind = hub_thresholds.classify(fan_in, fan_out);
            DependencyNode {
                path: path.to_string(),
                imports: graph.imports(path).into_iter().map(String::from).collect(),
                imported_by: graph
                    .imported_by(path)
                    .into_iter()
                    .map(String::from)
                    .collect(),
                fan_in,
                fan_out,
                instability: instability(fan_in, fan_out),
                depth,
                is_entry: entries.contains(&path),
                is_orphan: depth == ORPHAN_DEPTH,
                is_hub: hub_kind.is_some(),
                hub_kind,
                layer: policy.classify(path),
                cluster: cluster_of(path).to_string(),
            }
        })
        .collect();

    let orphans: Vec<String> = nodes
        .iter()
        .filter(|n| n.is_orphan)
        .map(|n| n.path.clone())
        .collect();
    let max_depth = nodes
        .iter()
        .map(|n| n.depth)
        .filter(|d| *d != ORPHAN_DEPTH)
        .max()
        .unwrap_or(0);

    let summary = GraphSummary {
        files: nodes.len(),
        edges: edges.len(),
        entry_points: entries.len(),
        orphans: orphans.len(),
        cycles: cycles.len(),
        hubs: hubs.len(),
        violations: violations.len(),
        clusters: clusters.len(),
        max_depth,
    };

    tracing::info!(
        files = summary.files,
        edges = summary.edges,
        cycles = summary.cycles,
        violations = summary.violations,
        "dependency analysis complete"
    );

    Ok(DependencyReport {
        summary,
        entry_points: entries.iter().map(|e| (*e).to_string()).collect(),
        nodes,
        orphans,
        cycles,
        hubs,
        hub_thresholds,
        violations,
        clusters,
    })
}

/// Walk `root` and analyze the import structure of its sources.
///
/// # Errors
///
/// Returns [`TremorError::FileNotFound`] if `root` is not a directory, or a
/// configuration error as in [`analyze_dependencies`].
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tremor_core::{GraphConfig, LayersConfig};
/// use tremor_depgraph::analyze_repository;
///
/// let report = analyze_repository(
///     Path::new("."),
///     &GraphConfig::default(),
///     &LayersConfig::default(),
/// )
/// .unwrap();
/// println!("{} cycles", report.cycles.len());
/// ```
pub fn analyze_repository(
    root: &Path,
    graph_config: &GraphConfig,
    layers_config: &LayersConfig,
) -> Result<DependencyReport, TremorError> {
    let files = walk_sources(root, graph_config)?;
    analyze_dependencies(&files, graph_config, layers_config)
}
