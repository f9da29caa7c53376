use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cluster name for files at the repository root.
pub const ROOT_CLUSTER: &str = "(root)";

/// Modules sharing a top-level directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,
    pub files: Vec<String>,
    /// Edges with both ends in the cluster.
    pub internal_edges: usize,
    /// Edges leaving the cluster.
    pub outgoing_edges: usize,
    /// Edges entering the cluster.
    pub incoming_edges: usize,
    /// `internal / (internal + outgoing)`.
    pub cohesion: f64,
    /// `outgoing / (internal + outgoing)`.
    pub coupling: f64,
}

/// The cluster a path belongs to: its first directory.
///
/// # Examples
///
/// ```
/// use tremor_depgraph::clusters::cluster_of;
///
/// assert_eq!(cluster_of("features/cart/view.ts"), "features");
/// assert_eq!(cluster_of("index.ts"), "(root)");
/// ```
pub fn cluster_of(path: &str) -> &str {
    match path.split_once('/') {
        Some((first, _)) if !first.is_empty() => first,
        _ => ROOT_CLUSTER,
    }
}

/// Group `paths` into clusters and score each against `edges`.
///
/// Clusters are returned in name order.
///
/// # Examples
///
/// ```
/// use tremor_depgraph::clusters::build_clusters;
///
/// let paths = ["a/x.ts", "a/y.ts", "b/z.ts"];
/// let edges = [("a/x.ts", "a/y.ts"), ("a/x.ts", "b/z.ts")];
/// let clusters = build_clusters(paths, edges);
/// assert_eq!(clusters[0].name, "a");
/// assert_eq!(clusters[0].cohesion, 0.5);
/// assert_eq!(clusters[1].incoming_edges, 1);
/// ```
pub fn build_clusters<'a>(
    paths: impl IntoIterator<Item = &'a str>,
    edges: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Vec<Cluster> {
    let mut clusters: BTreeMap<&str, Cluster> = BTreeMap::new();
    for path in paths {
        let name = cluster_of(path);
        clusters
            .entry(name)
            .or_insert_with(|| Cluster {
                name: name.to_string(),
                files: Vec::new(),
                internal_edges: 0,
                outgoing_edges: 0,
                incoming_edges: 0,
                cohesion: 0.0,
                coupling: 0.0,
            })
            .files
            .push(path.to_string());
    }

    for (from, to) in edges {
        let (source, target) = (cluster_of(from), cluster_of(to));
        if source == target {
            if let Some(cluster) = clusters.get_mut(source) {
                cluster.internal_edges += 1;
            }
            continue;
        }
        if let Some(cluster) = clusters.get_mut(source) {
            cluster.outgoing_edges += 1;
        }
        if let Some(cluster) = clusters.get_mut(target) {
            cluster.incoming_edges += 1;
        }
    }

    clusters
        .into_values()
        .map(|mut cluster| {
            let total = cluster.internal_edges + cluster.outgoing_edges;
            if total > 0 {
                cluster.cohesion = cluster.internal_edges as f64 / total as f64;
                cluster.coupling = cluster.outgoing_edges as f64 / total as f64;
            }
            cluster.files.sort();
            cluster
        })
        .collect()
}
