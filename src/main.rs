use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tremor_core::{HistoryConfig, OutputFormat, TremorConfig};
use tremor_depgraph::DependencyReport;
use tremor_history::bus_factor::Scope;
use tremor_history::mining::{mine_history, LogOptions};
use tremor_history::{analyze_history, HistoryReport};

#[derive(Parser)]
#[command(
    name = "tremor",
    version,
    about = "Commit-history and import-graph risk analytics",
    long_about = "Tremor mines a repository's commit log and import graph for risk signals.\n\n\
                   Churn hotspots, bus factor, temporal coupling, import cycles, hubs,\n\
                   layering violations, and directory clusters.\n\n\
                   Examples:\n  \
                     tremor history --since '6 months ago'   Analyze recent history\n  \
                     tremor history -- src/api               Restrict to a path\n  \
                     tremor deps --path web                  Analyze the import graph\n  \
                     tremor analyze --format json            Run everything, emit JSON\n  \
                     tremor init                             Write a default .tremor.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .tremor.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Human-readable summaries (default)\n  \
                         json  Machine-readable JSON with camelCase keys"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// History filters; each flag overrides its `[history]` setting.
#[derive(Args, Clone, Default)]
struct HistoryArgs {
    /// Branch or revision to walk (default: HEAD)
    #[arg(long)]
    branch: Option<String>,

    /// Only commits more recent than this date (any format git accepts)
    #[arg(long)]
    since: Option<String>,

    /// Only commits older than this date
    #[arg(long)]
    until: Option<String>,

    /// Only commits by matching authors (repeatable)
    #[arg(long = "author")]
    authors: Vec<String>,

    /// Stop after this many commits
    #[arg(long)]
    max_count: Option<usize>,

    /// Skip merge commits
    #[arg(long)]
    no_merges: bool,

    /// Only commits touching these paths
    #[arg(last = true)]
    paths: Vec<String>,
}

impl HistoryArgs {
    fn apply(&self, config: &mut HistoryConfig) {
        if self.branch.is_some() {
            config.branch.clone_from(&self.branch);
        }
        if self.since.is_some() {
            config.since.clone_from(&self.since);
        }
        if self.until.is_some() {
            config.until.clone_from(&self.until);
        }
        if !self.authors.is_empty() {
            config.authors.clone_from(&self.authors);
        }
        if self.max_count.is_some() {
            config.max_count = self.max_count;
        }
        if self.no_merges {
            config.no_merges = true;
        }
        if !self.paths.is_empty() {
            config.paths.clone_from(&self.paths);
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Analyze commit history for churn, bus factor, and coupling
    #[command(
        long_about = "Analyze commit history for churn, bus factor, and coupling.\n\n\
        Runs a single `git log --numstat` over the repository and derives churn\n\
        hotspots, combined file risk, knowledge concentration, and files that\n\
        change together.\n\n\
        Examples:\n  tremor history --since 2024-01-01\n  tremor history --author alice --no-merges\n  tremor history -- src/payments"
    )]
    History {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        filters: HistoryArgs,

        /// Maximum entries per list in text output
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Analyze the import graph of the current source tree
    #[command(
        long_about = "Analyze the import graph of the current source tree.\n\n\
        Extracts JavaScript/TypeScript imports and reports cycles, hubs, orphans,\n\
        layering violations, and directory clusters.\n\n\
        Examples:\n  tremor deps --path .\n  tremor deps --format json"
    )]
    Deps {
        /// Source tree root (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Maximum entries per list in text output
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Run history and import-graph analysis together
    Analyze {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        filters: HistoryArgs,

        /// Maximum entries per list in text output
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Create a default .tremor.toml configuration file
    #[command(long_about = "Create a default .tremor.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .tremor.toml already exists.")]
    Init,
}

const DEFAULT_CONFIG: &str = r#"# Tremor Configuration

[history]
# branch = "main"
# since = "12 months ago"
# until = "2024-12-31"
# authors = ["alice@example.com"]
# paths = ["src"]
# max_count = 5000
# no_merges = false

[churn]
# frequency_weight = 0.3
# churn_weight = 0.4
# ownership_weight = 0.3

[churn.hotspots]
# critical = { commits = 50, avg_churn = 100.0 }
# high = { commits = 25, avg_churn = 50.0 }
# medium = { commits = 10, avg_churn = 20.0 }

[bus_factor]
# threshold = 0.5
# min_commits = 5

[coupling]
# min_co_changes = 3
# min_directory_co_changes = 5
# likely_threshold = 50.0
# hidden_threshold = 60.0
# max_files_per_commit = 50

[graph]
# extensions = ["ts", "tsx", "js", "jsx", "mjs", "cjs"]
# exclude_dirs = ["node_modules", "dist", "build", "out", "target", "coverage", ".next", ".git", "vendor"]
# entry_names = ["index", "main", "app"]
# entry_dirs = ["pages", "routes"]
# hub_min_degree = 5
# hub_multiplier = 2.0
# max_file_size = 1048576
# aliases = { "@/" = "src/" }

[layers]
# Setting a table replaces its defaults entirely.
# patterns.ui = ["**/components/**", "**/pages/**", "**/views/**"]
# patterns.domain = ["**/domain/**", "**/models/**"]
# allowed.ui = ["ui", "application", "domain", "utility"]
# allowed.domain = ["domain", "utility"]
"#;

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<TremorConfig> {
    let config = match path {
        Some(path) => TremorConfig::from_file(path)?,
        None => {
            let default_path = Path::new(".tremor.toml");
            if default_path.exists() {
                TremorConfig::from_file(default_path)?
            } else {
                TremorConfig::default()
            }
        }
    };
    Ok(config)
}

fn run_history(path: &Path, config: &TremorConfig) -> tremor_core::Result<HistoryReport> {
    let commits = mine_history(path, &LogOptions::from(&config.history))?;
    Ok(analyze_history(&commits, config))
}

fn run_deps(path: &Path, config: &TremorConfig) -> tremor_core::Result<DependencyReport> {
    tremor_depgraph::analyze_repository(path, &config.graph, &config.layers)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn heading(title: &str) {
    println!("{title}");
    println!("{:-<72}", "");
}

fn print_history(report: &HistoryReport, limit: usize) {
    let summary = &report.summary;
    heading("History");
    println!("  Commits:     {} ({} merges)", summary.commits, summary.merges);
    println!("  Authors:     {}", summary.authors);
    println!("  Files:       {}", summary.files);
    if let (Some(first), Some(last)) = (summary.first_commit, summary.last_commit) {
        println!(
            "  Span:        {} .. {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        );
    }
    println!("  Bus factor:  {}", report.bus_factor.repository.bus_factor);
    println!();

    heading(&format!("Churn (top {limit})"));
    for (i, f) in report.churn.files.iter().take(limit).enumerate() {
        println!(
            "{:>3}. {:<40} churn={:.1}  commits={}  +{}/-{}  owner={} ({:.0}%)",
            i + 1,
            f.path,
            f.churn_score,
            f.commits,
            f.additions,
            f.deletions,
            f.primary_owner,
            f.ownership_pct,
        );
    }
    println!();

    let hot: Vec<_> = report
        .churn
        .directories
        .iter()
        .filter(|d| d.risk_level > tremor_core::RiskLevel::Low)
        .collect();
    if !hot.is_empty() {
        heading("Directory hotspots");
        for d in hot.iter().take(limit) {
            println!(
                "  [{}] {}  commits={}  files={}  avg churn={:.1}",
                d.risk_level, d.path, d.commits, d.files, d.avg_churn
            );
        }
        println!();
    }

    heading("Risky files");
    if report.churn.risks.is_empty() {
        println!("  No risky files detected.");
    }
    for r in report.churn.risks.iter().take(limit) {
        println!("  [{}] {}  score={:.0}  owner={}", r.level, r.path, r.score, r.primary_owner);
    }
    println!();

    heading(&format!(
        "Knowledge silos ({} critical, {} medium)",
        report.bus_factor.critical_files, report.bus_factor.medium_files
    ));
    for f in report
        .bus_factor
        .files
        .iter()
        .filter(|f| f.risk.is_some())
        .take(limit)
    {
        let top = f
            .contributors
            .first()
            .map(|c| format!("{} ({:.0}%)", c.author, c.share))
            .unwrap_or_default();
        let risk = f.risk.map(|r| r.to_string()).unwrap_or_default();
        let Scope::File(path) = &f.scope else {
            continue;
        };
        println!("  [{risk}] {path}  bus factor={}  top={top}", f.bus_factor);
    }
    println!();

    heading(&format!(
        "Temporal coupling ({} hidden dependencies)",
        report.coupling.hidden_dependencies
    ));
    if report.coupling.files.is_empty() {
        println!("  No significant coupling detected.");
    }
    for pair in report.coupling.files.iter().take(limit) {
        let flag = if pair.hidden_dependency {
            "  [hidden]"
        } else {
            ""
        };
        println!(
            "  {} <-> {} (strength={:.0}%, co-changes={}){flag}",
            pair.path_a, pair.path_b, pair.strength, pair.co_changes
        );
    }
    println!();
}

fn print_deps(report: &DependencyReport, limit: usize) {
    let summary = &report.summary;
    heading("Import graph");
    println!("  Files:        {}", summary.files);
    println!("  Edges:        {}", summary.edges);
    println!("  Entry points: {}", summary.entry_points);
    println!("  Orphans:      {}", summary.orphans);
    println!("  Max depth:    {}", summary.max_depth);
    println!();

    heading(&format!("Cycles ({})", summary.cycles));
    for cycle in report.cycles.iter().take(limit) {
        let first = cycle.nodes.first().map(String::as_str).unwrap_or_default();
        println!("  [{}] {} -> {first}", cycle.severity, cycle.nodes.join(" -> "));
    }
    println!();

    heading(&format!(
        "Hubs (in >= {:.1}, out >= {:.1})",
        report.hub_thresholds.fan_in, report.hub_thresholds.fan_out
    ));
    for hub in report.hubs.iter().take(limit) {
        println!(
            "  [{}] {}  in={}  out={}",
            hub.kind, hub.path, hub.fan_in, hub.fan_out
        );
    }
    println!();

    heading(&format!("Layer violations ({})", summary.violations));
    for v in report.violations.iter().take(limit) {
        println!("  {} ({}) -> {} ({})", v.from, v.from_layer, v.to, v.to_layer);
    }
    println!();

    heading("Clusters");
    for c in report.clusters.iter().take(limit) {
        println!(
            "  {:<24} files={:<4} cohesion={:.2}  coupling={:.2}",
            c.name,
            c.files.len(),
            c.cohesion,
            c.coupling
        );
    }
    println!();

    if !report.orphans.is_empty() {
        heading("Orphans");
        for path in report.orphans.iter().take(limit) {
            println!("  {path}");
        }
        println!();
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    tracing::debug!(format = %cli.format, "configuration loaded");

    match cli.command {
        Command::History {
            ref path,
            ref filters,
            limit,
        } => {
            filters.apply(&mut config.history);
            let report = run_history(path, &config)?;
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print_history(&report, limit),
            }
        }
        Command::Deps { ref path, limit } => {
            let report = run_deps(path, &config)?;
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => print_deps(&report, limit),
            }
        }
        Command::Analyze {
            ref path,
            ref filters,
            limit,
        } => {
            filters.apply(&mut config.history);
            let (history, deps) =
                rayon::join(|| run_history(path, &config), || run_deps(path, &config));
            let (history, deps) = (history?, deps?);
            match cli.format {
                OutputFormat::Json => {
                    let mut json = serde_json::Map::new();
                    json.insert(
                        "history".into(),
                        serde_json::to_value(&history).into_diagnostic()?,
                    );
                    json.insert(
                        "dependencies".into(),
                        serde_json::to_value(&deps).into_diagnostic()?,
                    );
                    print_json(&serde_json::Value::Object(json))?;
                }
                OutputFormat::Text => {
                    print_history(&history, limit);
                    print_deps(&deps, limit);
                }
            }
        }
        Command::Init => {
            let path = Path::new(".tremor.toml");
            if path.exists() {
                miette::bail!(".tremor.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .tremor.toml with default configuration");
        }
    }

    Ok(())
}
