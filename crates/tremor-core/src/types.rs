use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A person recorded on a commit, either as author or committer.
///
/// Two identities belong to the same person when their emails match
/// case-insensitively; use [`Identity::key`] wherever people are counted.
///
/// # Examples
///
/// ```
/// use tremor_core::Identity;
///
/// let a = Identity::new("Alice", "Alice@Example.com");
/// let b = Identity::new("alice", "alice@example.com");
/// assert_eq!(a.key(), b.key());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Display name as recorded by the version-control tool.
    pub name: String,
    /// Email as recorded, not normalized.
    pub email: String,
}

impl Identity {
    /// Create an identity from a name and email.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Normalized author key: the lower-cased email.
    pub fn key(&self) -> String {
        author_key(&self.email)
    }
}

/// Normalize an email into the key used to group contributions.
///
/// # Examples
///
/// ```
/// use tremor_core::author_key;
///
/// assert_eq!(author_key("  Bob@Corp.IO "), "bob@corp.io");
/// ```
pub fn author_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Categorical risk classification shared by every analyzer.
///
/// Ordered from least to most severe, so levels can be compared directly.
///
/// # Examples
///
/// ```
/// use tremor_core::RiskLevel;
///
/// assert!(RiskLevel::Critical > RiskLevel::High);
/// let level: RiskLevel = serde_json::from_str("\"medium\"").unwrap();
/// assert_eq!(level, RiskLevel::Medium);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Nothing worth reporting.
    Low,
    /// Worth watching.
    Medium,
    /// Should be addressed.
    High,
    /// Needs attention now.
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Architectural layer a source file belongs to.
///
/// Layers are listed outermost first; the allow-list in
/// [`LayersConfig`](crate::LayersConfig) decides which may depend on which.
///
/// # Examples
///
/// ```
/// use tremor_core::ArchLayer;
///
/// let layer: ArchLayer = "infra".parse().unwrap();
/// assert_eq!(layer, ArchLayer::Infrastructure);
/// assert_eq!(layer.to_string(), "infrastructure");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchLayer {
    /// Components, pages, views.
    Ui,
    /// Services, use cases, state management.
    Application,
    /// Models, entities, business rules.
    Domain,
    /// API clients, persistence, adapters.
    Infrastructure,
    /// Helpers shared by everything.
    Utility,
}

impl ArchLayer {
    /// All layers in classification order.
    pub const ALL: [ArchLayer; 5] = [
        ArchLayer::Ui,
        ArchLayer::Application,
        ArchLayer::Domain,
        ArchLayer::Infrastructure,
        ArchLayer::Utility,
    ];
}

impl fmt::Display for ArchLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchLayer::Ui => write!(f, "ui"),
            ArchLayer::Application => write!(f, "application"),
            ArchLayer::Domain => write!(f, "domain"),
            ArchLayer::Infrastructure => write!(f, "infrastructure"),
            ArchLayer::Utility => write!(f, "utility"),
        }
    }
}

impl FromStr for ArchLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ui" | "presentation" => Ok(ArchLayer::Ui),
            "application" | "app" => Ok(ArchLayer::Application),
            "domain" => Ok(ArchLayer::Domain),
            "infrastructure" | "infra" => Ok(ArchLayer::Infrastructure),
            "utility" | "util" | "utils" => Ok(ArchLayer::Utility),
            other => Err(format!("unknown layer: {other}")),
        }
    }
}

/// Output format for CLI subcommands.
///
/// # Examples
///
/// ```
/// use tremor_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
