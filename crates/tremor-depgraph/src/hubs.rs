//! Hub detection.
//!
//! A hub has far more incoming or outgoing imports than the average module.
//! Thresholds scale with the repository through the mean degree, with a
//! configured floor so small repositories do not flag every module.

use std::fmt;

use serde::{Deserialize, Serialize};
use tremor_core::GraphConfig;

use crate::graph::DependencyGraph;

/// Which side of a module is overloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HubKind {
    /// Many dependents: stable but risky to change.
    #[serde(rename = "hub-in")]
    In,
    /// Many dependencies: knows too much.
    #[serde(rename = "hub-out")]
    Out,
    /// Both: a central point of failure.
    #[serde(rename = "hub-both")]
    Both,
}

impl fmt::Display for HubKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubKind::In => write!(f, "hub-in"),
            HubKind::Out => write!(f, "hub-out"),
            HubKind::Both => write!(f, "hub-both"),
        }
    }
}

/// Degree thresholds a module must reach to count as a hub.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubThresholds {
    pub fan_in: f64,
    pub fan_out: f64,
}

impl HubThresholds {
    /// `max(hub_min_degree, hub_multiplier * mean)` for each direction.
    ///
    /// # Examples
    ///
    /// ```
    /// use tremor_core::GraphConfig;
    /// use tremor_depgraph::hubs::HubThresholds;
    ///
    /// let config = GraphConfig::default();
    /// let small = HubThresholds::from_degrees(&[1, 0, 2], &[0, 3, 0], &config);
    /// assert_eq!(small.fan_in, 5.0);
    ///
    /// let busy = HubThresholds::from_degrees(&[10, 6], &[1, 1], &config);
    /// assert_eq!(busy.fan_in, 16.0);
    /// ```
    pub fn from_degrees(fan_ins: &[usize], fan_outs: &[usize], config: &GraphConfig) -> Self {
        let floor = config.hub_min_degree as f64;
        Self {
            fan_in: floor.max(config.hub_multiplier * mean(fan_ins)),
            fan_out: floor.max(config.hub_multiplier * mean(fan_outs)),
        }
    }

    /// Classify a module by its degrees.
    pub fn classify(&self, fan_in: usize, fan_out: usize) -> Option<HubKind> {
        let heavy_in = fan_in as f64 >= self.fan_in;
        let heavy_out = fan_out as f64 >= self.fan_out;
        match (heavy_in, heavy_out) {
            (true, true) => Some(HubKind::Both),
            (true, false) => Some(HubKind::In),
            (false, true) => Some(HubKind::Out),
            (false, false) => None,
        }
    }
}

/// A module flagged as a hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hub {
    pub path: String,
    pub kind: HubKind,
    pub fan_in: usize,
    pub fan_out: usize,
}

/// Every hub in the graph, in path order, with the thresholds used.
pub fn find_hubs(graph: &DependencyGraph, config: &GraphConfig) -> (Vec<Hub>, HubThresholds) {
    let degrees: Vec<(&str, usize, usize)> = graph
        .paths()
        .map(|path| (path, graph.fan_in(path), graph.fan_out(path)))
        .collect();
    let fan_ins: Vec<usize> = degrees.iter().map(|(_, i, _)| *i).collect();
    let fan_outs: Vec<usize> = degrees.iter().map(|(_, _, o)| *o).collect();
    let thresholds = HubThresholds::from_degrees(&fan_ins, &fan_outs, config);

    let hubs = degrees
        .into_iter()
        .filter_map(|(path, fan_in, fan_out)| {
            thresholds.classify(fan_in, fan_out).map(|kind| Hub {
                path: path.to_string(),
                kind,
                fan_in,
                fan_out,
            })
        })
        .collect();

    (hubs, thresholds)
}

fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<usize>() as f64 / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::SourceFile;

    #[test]
    fn classify_covers_every_combination() {
        let t = HubThresholds {
            fan_in: 5.0,
            fan_out: 5.0,
        };
        assert_eq!(t.classify(5, 5), Some(HubKind::Both));
        assert_eq!(t.classify(7, 1), Some(HubKind::In));
        assert_eq!(t.classify(0, 9), Some(HubKind::Out));
        assert_eq!(t.classify(4, 4), None);
    }

    #[test]
    fn empty_graph_uses_the_floor() {
        let t = HubThresholds::from_degrees(&[], &[], &GraphConfig::default());
        assert_eq!(t.fan_in, 5.0);
        assert_eq!(t.fan_out, 5.0);
    }

    #[test]
    fn shared_utility_becomes_fan_in_hub() {
        let mut files = vec![SourceFile::new("util.ts", "")];
        for i in 0..6 {
            files.push(SourceFile::new(format!("m{i}.ts"), "import './util';"));
        }
        let graph = DependencyGraph::build(&files, &GraphConfig::default());
        let (hubs, thresholds) = find_hubs(&graph, &GraphConfig::default());
        assert_eq!(thresholds.fan_in, 5.0);
        assert_eq!(hubs.len(), 1);
        assert_eq!(hubs[0].path, "util.ts");
        assert_eq!(hubs[0].kind, HubKind::In);
        assert_eq!(hubs[0].fan_in, 6);
    }

    #[test]
    fn kinds_serialize_with_hub_prefix() {
        assert_eq!(serde_json::to_string(&HubKind::Both).unwrap(), "\"hub-both\"");
        assert_eq!(HubKind::Out.to_string(), "hub-out");
    }
}
