//! Architectural layer classification and violation checks.

use std::collections::BTreeMap;

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use tremor_core::{ArchLayer, LayersConfig, TremorError};

/// An import from one layer into a layer it may not depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerViolation {
    pub from: String,
    pub to: String,
    pub from_layer: ArchLayer,
    pub to_layer: ArchLayer,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled layer patterns and allow-list.
///
/// # Examples
///
/// ```
/// use tremor_core::{ArchLayer, LayersConfig};
/// use tremor_depgraph::layers::LayerPolicy;
///
/// let policy = LayerPolicy::from_config(&LayersConfig::default()).unwrap();
/// assert_eq!(policy.classify("src/components/Button.tsx"), Some(ArchLayer::Ui));
/// assert_eq!(policy.classify("src/index.ts"), None);
/// assert!(policy.allows(ArchLayer::Ui, ArchLayer::Domain));
/// assert!(!policy.allows(ArchLayer::Domain, ArchLayer::Ui));
/// ```
#[derive(Debug, Clone)]
pub struct LayerPolicy {
    patterns: Vec<(ArchLayer, Vec<Pattern>)>,
    allowed: BTreeMap<ArchLayer, Vec<ArchLayer>>,
}

impl LayerPolicy {
    /// Compile `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TremorError::Config`] for an unknown layer name and
    /// [`TremorError::Pattern`] for an invalid glob.
    pub fn from_config(config: &LayersConfig) -> Result<Self, TremorError> {
        let mut patterns = Vec::new();
        for (layer, globs) in config.layer_patterns()? {
            let compiled = globs
                .iter()
                .map(|g| {
                    Pattern::new(g)
                        .map_err(|e| TremorError::Pattern(format!("{layer} pattern {g:?}: {e}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            patterns.push((layer, compiled));
        }

        Ok(Self {
            patterns,
            allowed: config.allowed_dependencies()?,
        })
    }

    /// The first layer, in layer order, with a pattern matching `path`.
    pub fn classify(&self, path: &str) -> Option<ArchLayer> {
        self.patterns
            .iter()
            .find(|(_, globs)| globs.iter().any(|g| g.matches_with(path, MATCH_OPTIONS)))
            .map(|(layer, _)| *layer)
    }

    /// Whether `from` may import from `to`.
    pub fn allows(&self, from: ArchLayer, to: ArchLayer) -> bool {
        self.allowed
            .get(&from)
            .map_or(from == to, |targets| targets.contains(&to))
    }

    /// Check every edge. Edges with an unclassified endpoint never violate.
    pub fn violations<'a>(
        &self,
        edges: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Vec<LayerViolation> {
        edges
            .into_iter()
            .filter_map(|(from, to)| {
                let from_layer = self.classify(from)?;
                let to_layer = self.classify(to)?;
                (!self.allows(from_layer, to_layer)).then(|| LayerViolation {
                    from: from.to_string(),
                    to: to.to_string(),
                    from_layer,
                    to_layer,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_policy() -> LayerPolicy {
        LayerPolicy::from_config(&LayersConfig::default()).unwrap()
    }

    #[test]
    fn classifies_by_directory_patterns() {
        let policy = default_policy();
        assert_eq!(policy.classify("src/services/auth.ts"), Some(ArchLayer::Application));
        assert_eq!(policy.classify("src/domain/user.ts"), Some(ArchLayer::Domain));
        assert_eq!(policy.classify("src/api/client.ts"), Some(ArchLayer::Infrastructure));
        assert_eq!(policy.classify("src/utils/format.ts"), Some(ArchLayer::Utility));
        assert_eq!(policy.classify("src/servicesx/a.ts"), None);
    }

    #[test]
    fn earlier_layers_win_overlaps() {
        let policy = default_policy();
        assert_eq!(
            policy.classify("src/components/utils/pad.ts"),
            Some(ArchLayer::Ui)
        );
    }

    #[test]
    fn upward_imports_are_violations() {
        let policy = default_policy();
        let edges = vec![
            ("src/domain/user.ts", "src/components/Avatar.tsx"),
            ("src/components/Avatar.tsx", "src/domain/user.ts"),
            ("src/domain/user.ts", "src/index.ts"),
            ("src/utils/a.ts", "src/utils/b.ts"),
        ];
        let violations = policy.violations(edges);
        assert_eq!(
            violations,
            vec![LayerViolation {
                from: "src/domain/user.ts".into(),
                to: "src/components/Avatar.tsx".into(),
                from_layer: ArchLayer::Domain,
                to_layer: ArchLayer::Ui,
            }]
        );
    }

    #[test]
    fn missing_allow_entry_permits_only_itself() {
        let mut config = LayersConfig::default();
        config.allowed.remove("domain");
        let policy = LayerPolicy::from_config(&config).unwrap();
        assert!(policy.allows(ArchLayer::Domain, ArchLayer::Domain));
        assert!(!policy.allows(ArchLayer::Domain, ArchLayer::Utility));
    }

    #[test]
    fn invalid_glob_is_a_pattern_error() {
        let mut config = LayersConfig::default();
        config
            .patterns
            .insert("ui".into(), vec!["src/[oops".into()]);
        let result = LayerPolicy::from_config(&config);
        assert!(matches!(result, Err(TremorError::Pattern(_))));
    }

    #[test]
    fn unknown_layer_is_a_config_error() {
        let mut config = LayersConfig::default();
        config.allowed.insert("presenters".into(), vec!["ui".into()]);
        let result = LayerPolicy::from_config(&config);
        assert!(matches!(result, Err(TremorError::Config(_))));
    }
}
