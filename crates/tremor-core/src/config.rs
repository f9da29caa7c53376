use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TremorError;
use crate::types::ArchLayer;

/// Top-level configuration loaded from `.tremor.toml`.
///
/// Every section is optional; omitted fields fall back to their defaults.
///
/// # Examples
///
/// ```
/// use tremor_core::TremorConfig;
///
/// let config = TremorConfig::default();
/// assert_eq!(config.bus_factor.threshold, 0.5);
/// assert_eq!(config.coupling.min_co_changes, 3);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TremorConfig {
    /// Filters applied to the log invocation.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Churn and combined risk scoring.
    #[serde(default)]
    pub churn: ChurnConfig,
    /// Knowledge concentration.
    #[serde(default)]
    pub bus_factor: BusFactorConfig,
    /// Temporal coupling.
    #[serde(default)]
    pub coupling: CouplingConfig,
    /// Import graph extraction and hub detection.
    #[serde(default)]
    pub graph: GraphConfig,
    /// Architectural layer policy.
    #[serde(default)]
    pub layers: LayersConfig,
}

impl TremorConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TremorError::FileNotFound`] if the file does not exist,
    /// [`TremorError::Toml`] if the content is not valid TOML, or
    /// [`TremorError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tremor_core::TremorConfig;
    /// use std::path::Path;
    ///
    /// let config = TremorConfig::from_file(Path::new(".tremor.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, TremorError> {
        if !path.exists() {
            return Err(TremorError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`TremorError::Toml`] if parsing fails, or
    /// [`TremorError::Config`] if validation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use tremor_core::TremorConfig;
    ///
    /// let toml = r#"
    /// [bus_factor]
    /// threshold = 0.8
    /// "#;
    /// let config = TremorConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.bus_factor.threshold, 0.8);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, TremorError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and layer names.
    ///
    /// # Errors
    ///
    /// Returns [`TremorError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), TremorError> {
        let threshold = self.bus_factor.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(TremorError::Config(format!(
                "bus_factor.threshold must be in (0, 1], got {threshold}"
            )));
        }

        let weights = [
            ("churn.frequency_weight", self.churn.frequency_weight),
            ("churn.churn_weight", self.churn.churn_weight),
            ("churn.ownership_weight", self.churn.ownership_weight),
        ];
        for (name, value) in weights {
            if value < 0.0 {
                return Err(TremorError::Config(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }

        if self.graph.hub_multiplier <= 0.0 {
            return Err(TremorError::Config(format!(
                "graph.hub_multiplier must be positive, got {}",
                self.graph.hub_multiplier
            )));
        }

        self.layers.allowed_dependencies()?;
        self.layers.layer_patterns()?;
        Ok(())
    }
}

/// Filters applied before the log is parsed.
///
/// # Examples
///
/// ```
/// use tremor_core::HistoryConfig;
///
/// let config = HistoryConfig::default();
/// assert!(config.branch.is_none());
/// assert!(!config.no_merges);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Branch or revision to walk (default: HEAD).
    pub branch: Option<String>,
    /// Lower date bound, in any format `git log --since` accepts.
    pub since: Option<String>,
    /// Upper date bound, in any format `git log --until` accepts.
    pub until: Option<String>,
    /// Restrict to commits by these authors (pattern match on name or email).
    #[serde(default)]
    pub authors: Vec<String>,
    /// Restrict to commits touching these paths.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Maximum number of commits to read.
    pub max_count: Option<usize>,
    /// Skip merge commits.
    #[serde(default)]
    pub no_merges: bool,
}

/// Paired thresholds for one directory hotspot level.
///
/// A directory reaches the level when both its commit count and its
/// average per-file churn strictly exceed these values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotspotThreshold {
    /// Minimum directory commit count (exclusive).
    pub commits: u32,
    /// Minimum average per-file churn score (exclusive).
    pub avg_churn: f64,
}

/// Directory hotspot thresholds, most severe first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotThresholds {
    #[serde(default = "default_hotspot_critical")]
    pub critical: HotspotThreshold,
    #[serde(default = "default_hotspot_high")]
    pub high: HotspotThreshold,
    #[serde(default = "default_hotspot_medium")]
    pub medium: HotspotThreshold,
}

fn default_hotspot_critical() -> HotspotThreshold {
    HotspotThreshold {
        commits: 50,
        avg_churn: 100.0,
    }
}

fn default_hotspot_high() -> HotspotThreshold {
    HotspotThreshold {
        commits: 25,
        avg_churn: 50.0,
    }
}

fn default_hotspot_medium() -> HotspotThreshold {
    HotspotThreshold {
        commits: 10,
        avg_churn: 20.0,
    }
}

impl Default for HotspotThresholds {
    fn default() -> Self {
        Self {
            critical: default_hotspot_critical(),
            high: default_hotspot_high(),
            medium: default_hotspot_medium(),
        }
    }
}

/// Churn and combined risk scoring configuration.
///
/// # Examples
///
/// ```
/// use tremor_core::ChurnConfig;
///
/// let config = ChurnConfig::default();
/// let total = config.frequency_weight + config.churn_weight + config.ownership_weight;
/// assert!((total - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnConfig {
    /// Weight of normalized change frequency (default: 0.3).
    #[serde(default = "default_frequency_weight")]
    pub frequency_weight: f64,
    /// Weight of normalized churn score (default: 0.4).
    #[serde(default = "default_churn_weight")]
    pub churn_weight: f64,
    /// Weight of normalized ownership concentration (default: 0.3).
    #[serde(default = "default_ownership_weight")]
    pub ownership_weight: f64,
    /// Directory hotspot classification.
    #[serde(default)]
    pub hotspots: HotspotThresholds,
}

fn default_frequency_weight() -> f64 {
    0.3
}

fn default_churn_weight() -> f64 {
    0.4
}

fn default_ownership_weight() -> f64 {
    0.3
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            frequency_weight: default_frequency_weight(),
            churn_weight: default_churn_weight(),
            ownership_weight: default_ownership_weight(),
            hotspots: HotspotThresholds::default(),
        }
    }
}

/// Knowledge concentration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusFactorConfig {
    /// Share of commits the top authors must reach (default: 0.5).
    #[serde(default = "default_bus_threshold")]
    pub threshold: f64,
    /// Scopes with fewer commits are never flagged (default: 5).
    #[serde(default = "default_min_commits")]
    pub min_commits: u32,
}

fn default_bus_threshold() -> f64 {
    0.5
}

fn default_min_commits() -> u32 {
    5
}

impl Default for BusFactorConfig {
    fn default() -> Self {
        Self {
            threshold: default_bus_threshold(),
            min_commits: default_min_commits(),
        }
    }
}

/// Temporal coupling configuration.
///
/// # Examples
///
/// ```
/// use tremor_core::CouplingConfig;
///
/// let config = CouplingConfig::default();
/// assert_eq!(config.min_directory_co_changes, 5);
/// assert!(config.max_files_per_commit.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingConfig {
    /// File pairs changed together fewer times are noise (default: 3).
    #[serde(default = "default_min_co_changes")]
    pub min_co_changes: u32,
    /// Directory pairs changed together fewer times are noise (default: 5).
    #[serde(default = "default_min_directory_co_changes")]
    pub min_directory_co_changes: u32,
    /// Strength above which a pair is likely coupled, in percent (default: 50).
    #[serde(default = "default_likely_threshold")]
    pub likely_threshold: f64,
    /// Strength above which a cross-directory pair is a hidden dependency (default: 60).
    #[serde(default = "default_hidden_threshold")]
    pub hidden_threshold: f64,
    /// Ignore commits touching more files than this.
    pub max_files_per_commit: Option<usize>,
}

fn default_min_co_changes() -> u32 {
    3
}

fn default_min_directory_co_changes() -> u32 {
    5
}

fn default_likely_threshold() -> f64 {
    50.0
}

fn default_hidden_threshold() -> f64 {
    60.0
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            min_co_changes: default_min_co_changes(),
            min_directory_co_changes: default_min_directory_co_changes(),
            likely_threshold: default_likely_threshold(),
            hidden_threshold: default_hidden_threshold(),
            max_files_per_commit: None,
        }
    }
}

/// Import graph configuration.
///
/// # Examples
///
/// ```
/// use tremor_core::GraphConfig;
///
/// let config = GraphConfig::default();
/// assert!(config.extensions.contains(&"ts".to_string()));
/// assert!(config.exclude_dirs.contains(&"node_modules".to_string()));
/// assert_eq!(config.hub_min_degree, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Recognized source extensions, without the dot, in resolution order.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Directory names never walked.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    /// File stems treated as entry points.
    #[serde(default = "default_entry_names")]
    pub entry_names: Vec<String>,
    /// Directory names whose files are entry points.
    #[serde(default = "default_entry_dirs")]
    pub entry_dirs: Vec<String>,
    /// Floor for the hub threshold (default: 5).
    #[serde(default = "default_hub_min_degree")]
    pub hub_min_degree: usize,
    /// Multiple of the mean degree a hub must reach (default: 2.0).
    #[serde(default = "default_hub_multiplier")]
    pub hub_multiplier: f64,
    /// Internal import prefixes mapped to repository paths, e.g. `"@/" = "src/"`.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Files larger than this many bytes are skipped (default: 1 MiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx", "mjs", "cjs"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_exclude_dirs() -> Vec<String> {
    [
        "node_modules",
        "dist",
        "build",
        "out",
        "target",
        "coverage",
        ".next",
        ".git",
        "vendor",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_entry_names() -> Vec<String> {
    ["index", "main", "app"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_entry_dirs() -> Vec<String> {
    ["pages", "routes"].into_iter().map(String::from).collect()
}

fn default_hub_min_degree() -> usize {
    5
}

fn default_hub_multiplier() -> f64 {
    2.0
}

fn default_max_file_size() -> u64 {
    1_048_576
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
            entry_names: default_entry_names(),
            entry_dirs: default_entry_dirs(),
            hub_min_degree: default_hub_min_degree(),
            hub_multiplier: default_hub_multiplier(),
            aliases: BTreeMap::new(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Architectural layer policy.
///
/// Keys are layer names (`ui`, `application`, `domain`, `infrastructure`,
/// `utility`). `patterns` lists globs classifying paths into a layer, checked
/// in layer order; `allowed` lists the layers each layer may import from.
///
/// # Examples
///
/// ```
/// use tremor_core::{ArchLayer, LayersConfig};
///
/// let config = LayersConfig::default();
/// let allowed = config.allowed_dependencies().unwrap();
/// assert!(allowed[&ArchLayer::Ui].contains(&ArchLayer::Domain));
/// assert!(!allowed[&ArchLayer::Domain].contains(&ArchLayer::Ui));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayersConfig {
    #[serde(default = "default_layer_patterns")]
    pub patterns: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_layer_allowed")]
    pub allowed: BTreeMap<String, Vec<String>>,
}

fn layer_map(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(layer, values)| {
            (
                (*layer).to_string(),
                values.iter().map(|v| (*v).to_string()).collect(),
            )
        })
        .collect()
}

fn default_layer_patterns() -> BTreeMap<String, Vec<String>> {
    layer_map(&[
        (
            "ui",
            &[
                "**/components/**",
                "**/pages/**",
                "**/views/**",
                "**/screens/**",
                "**/ui/**",
                "**/routes/**",
            ],
        ),
        (
            "application",
            &[
                "**/services/**",
                "**/application/**",
                "**/usecases/**",
                "**/use-cases/**",
                "**/hooks/**",
                "**/store/**",
            ],
        ),
        (
            "domain",
            &[
                "**/domain/**",
                "**/models/**",
                "**/entities/**",
            ],
        ),
        (
            "infrastructure",
            &[
                "**/infrastructure/**",
                "**/infra/**",
                "**/api/**",
                "**/db/**",
                "**/repositories/**",
                "**/adapters/**",
            ],
        ),
        (
            "utility",
            &[
                "**/utils/**",
                "**/helpers/**",
                "**/lib/**",
                "**/shared/**",
                "**/common/**",
            ],
        ),
    ])
}

fn default_layer_allowed() -> BTreeMap<String, Vec<String>> {
    layer_map(&[
        ("ui", &["ui", "application", "domain", "utility"]),
        (
            "application",
            &["application", "domain", "infrastructure", "utility"],
        ),
        ("domain", &["domain", "utility"]),
        ("infrastructure", &["infrastructure", "domain", "utility"]),
        ("utility", &["utility"]),
    ])
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            patterns: default_layer_patterns(),
            allowed: default_layer_allowed(),
        }
    }
}

impl LayersConfig {
    /// Resolve the allow-list into typed layers.
    ///
    /// A layer absent from `allowed` may depend only on itself.
    ///
    /// # Errors
    ///
    /// Returns [`TremorError::Config`] for an unknown layer name.
    pub fn allowed_dependencies(
        &self,
    ) -> Result<BTreeMap<ArchLayer, Vec<ArchLayer>>, TremorError> {
        let mut resolved: BTreeMap<ArchLayer, Vec<ArchLayer>> = ArchLayer::ALL
            .iter()
            .map(|layer| (*layer, vec![*layer]))
            .collect();

        for (name, targets) in &self.allowed {
            let layer = parse_layer(name)?;
            let mut parsed = Vec::with_capacity(targets.len());
            for target in targets {
                parsed.push(parse_layer(target)?);
            }
            resolved.insert(layer, parsed);
        }

        Ok(resolved)
    }

    /// Resolve the pattern table into typed layers, in classification order.
    ///
    /// # Errors
    ///
    /// Returns [`TremorError::Config`] for an unknown layer name.
    pub fn layer_patterns(&self) -> Result<Vec<(ArchLayer, Vec<String>)>, TremorError> {
        let mut resolved = Vec::with_capacity(self.patterns.len());
        for (name, globs) in &self.patterns {
            resolved.push((parse_layer(name)?, globs.clone()));
        }
        resolved.sort_by_key(|(layer, _)| *layer);
        Ok(resolved)
    }
}

fn parse_layer(name: &str) -> Result<ArchLayer, TremorError> {
    name.parse::<ArchLayer>().map_err(TremorError::Config)
}
