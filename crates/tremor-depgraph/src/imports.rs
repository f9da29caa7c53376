//! Import statement extraction and resolution.
//!
//! Imports are found by pattern matching over file text rather than by
//! parsing, which keeps the scan fast and tolerant of syntax the patterns
//! do not understand. Only internal imports (relative, root-absolute, or
//! configured aliases) are resolved against the file snapshot.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a module is pulled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    /// `import x from './x'`, `import './x'`
    Static,
    /// `import('./x')`
    Dynamic,
    /// `export { x } from './x'`, `export * from './x'`
    ReExport,
    /// `require('./x')`
    Require,
}

/// An import found in a file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// The module specifier as written.
    pub specifier: String,
    pub kind: ImportKind,
}

fn import_patterns() -> &'static [(ImportKind, Regex)] {
    static PATTERNS: OnceLock<Vec<(ImportKind, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                ImportKind::Static,
                r#"(?m)^\s*import\s+(?:type\s+)?(?:[^'";]*?\s+from\s+)?['"]([^'"\n]+)['"]"#,
            ),
            (
                ImportKind::Dynamic,
                r#"\bimport\(\s*['"]([^'"\n]+)['"]\s*\)"#,
            ),
            (
                ImportKind::ReExport,
                r#"(?m)^\s*export\s+(?:type\s+)?(?:\*(?:\s+as\s+\w+)?|\{[^}]*\})\s*from\s+['"]([^'"\n]+)['"]"#,
            ),
            (
                ImportKind::Require,
                r#"\brequire\(\s*['"]([^'"\n]+)['"]\s*\)"#,
            ),
        ]
        .into_iter()
        .filter_map(|(kind, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((kind, re)),
            Err(e) => {
                tracing::warn!("invalid import pattern {pattern}: {e}");
                None
            }
        })
        .collect()
    })
}

/// Find every import specifier in `content`, in pattern order.
///
/// # Examples
///
/// ```
/// use tremor_depgraph::imports::{extract_imports, ImportKind};
///
/// let imports = extract_imports("import { a } from './a';\nconst b = require('./b');");
/// assert_eq!(imports.len(), 2);
/// assert_eq!(imports[0].specifier, "./a");
/// assert_eq!(imports[1].kind, ImportKind::Require);
/// ```
pub fn extract_imports(content: &str) -> Vec<Import> {
    let mut imports = Vec::new();
    for (kind, pattern) in import_patterns() {
        for captures in pattern.captures_iter(content) {
            if let Some(specifier) = captures.get(1) {
                imports.push(Import {
                    specifier: specifier.as_str().to_string(),
                    kind: *kind,
                });
            }
        }
    }
    imports
}

/// Whether `specifier` refers to a file inside the repository rather than an
/// installed package.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use tremor_depgraph::imports::is_internal;
///
/// let aliases = BTreeMap::from([("@/".to_string(), "src/".to_string())]);
/// assert!(is_internal("./util", &aliases));
/// assert!(is_internal("@/components/Button", &aliases));
/// assert!(!is_internal("react", &aliases));
/// assert!(!is_internal("@scope/pkg", &aliases));
/// ```
pub fn is_internal(specifier: &str, aliases: &BTreeMap<String, String>) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
        || specifier.starts_with('/')
        || aliases.keys().any(|prefix| specifier.starts_with(prefix.as_str()))
}

/// Resolve an internal import from `from` to a file in `files`.
///
/// Candidates are tried in order: the literal path, the path with each of
/// `extensions` appended, then `index.<ext>` inside the path as a directory.
/// Returns `None` for package imports, paths escaping the repository root,
/// and specifiers matching nothing.
///
/// # Examples
///
/// ```
/// use std::collections::{BTreeMap, HashSet};
/// use tremor_depgraph::imports::resolve_import;
///
/// let files: HashSet<String> = ["src/app.ts", "src/utils/index.ts"]
///     .into_iter()
///     .map(String::from)
///     .collect();
/// let exts = vec!["ts".to_string()];
/// let aliases = BTreeMap::new();
///
/// assert_eq!(
///     resolve_import("src/main.ts", "./app", &files, &exts, &aliases).as_deref(),
///     Some("src/app.ts")
/// );
/// assert_eq!(
///     resolve_import("src/main.ts", "./utils", &files, &exts, &aliases).as_deref(),
///     Some("src/utils/index.ts")
/// );
/// assert!(resolve_import("src/main.ts", "react", &files, &exts, &aliases).is_none());
/// ```
pub fn resolve_import(
    from: &str,
    specifier: &str,
    files: &HashSet<String>,
    extensions: &[String],
    aliases: &BTreeMap<String, String>,
) -> Option<String> {
    let joined = if let Some((prefix, target)) = longest_alias(specifier, aliases) {
        format!("{target}/{}", &specifier[prefix.len()..])
    } else if let Some(rooted) = specifier.strip_prefix('/') {
        rooted.to_string()
    } else if is_internal(specifier, aliases) {
        match from.rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/{specifier}"),
            None => specifier.to_string(),
        }
    } else {
        return None;
    };

    let base = normalize_path(&joined)?;

    if !base.is_empty() && files.contains(&base) {
        return Some(base);
    }
    for ext in extensions {
        let candidate = format!("{base}.{ext}");
        if files.contains(&candidate) {
            return Some(candidate);
        }
    }
    for ext in extensions {
        let candidate = if base.is_empty() {
            format!("index.{ext}")
        } else {
            format!("{base}/index.{ext}")
        };
        if files.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn longest_alias<'a>(
    specifier: &str,
    aliases: &'a BTreeMap<String, String>,
) -> Option<(&'a str, &'a str)> {
    aliases
        .iter()
        .filter(|(prefix, _)| specifier.starts_with(prefix.as_str()))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(prefix, target)| (prefix.as_str(), target.trim_end_matches('/')))
}

/// Collapse `.` and `..` segments. `None` when `..` climbs above the root.
fn normalize_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}
