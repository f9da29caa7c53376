use std::path::Path;

use tremor_core::{GraphConfig, TremorError};

/// Number of bytes to check for binary detection.
const BINARY_CHECK_SIZE: usize = 8192;

/// A source file snapshot fed to the dependency analysis.
///
/// # Examples
///
/// ```
/// use tremor_depgraph::walker::SourceFile;
///
/// let file = SourceFile::new("src/index.ts", "import './app';");
/// assert_eq!(file.extension(), Some("ts"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    /// Full file content.
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Extension without the dot, if the file name has one.
    pub fn extension(&self) -> Option<&str> {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        name.rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|_| !name.starts_with('.') || name.matches('.').count() > 1)
    }
}

/// Walk a repository, respecting `.gitignore`, returning source files whose
/// extension is listed in `config.extensions`.
///
/// Directories named in `config.exclude_dirs` are never entered. Files that
/// are larger than `config.max_file_size`, binary, or unreadable are skipped.
/// Returned paths are relative to `root` and sorted.
///
/// # Errors
///
/// Returns [`TremorError::FileNotFound`] if `root` is not a directory.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tremor_core::GraphConfig;
/// use tremor_depgraph::walker::walk_sources;
///
/// let files = walk_sources(Path::new("."), &GraphConfig::default()).unwrap();
/// for f in &files {
///     println!("{} ({} bytes)", f.path, f.content.len());
/// }
/// ```
pub fn walk_sources(root: &Path, config: &GraphConfig) -> Result<Vec<SourceFile>, TremorError> {
    if !root.is_dir() {
        return Err(TremorError::FileNotFound(root.to_path_buf()));
    }

    let excluded = config.exclude_dirs.clone();
    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && excluded.iter().any(|d| entry.file_name() == d.as_str()))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {e}");
                continue;
            }
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !config.extensions.iter().any(|known| known == ext) {
            continue;
        }

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(path = %path.display(), "skipping file: {e}");
                continue;
            }
        };
        if metadata.len() > config.max_file_size {
            tracing::debug!(path = %path.display(), size = metadata.len(), "skipping oversized file");
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = %path.display(), "skipping file: {e}");
                continue;
            }
        };

        let check_len = content.len().min(BINARY_CHECK_SIZE);
        if content.as_bytes()[..check_len].contains(&0) {
            tracing::debug!(path = %path.display(), "skipping binary file");
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        files.push(SourceFile {
            path: relative.join("/"),
            content,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::info!(files = files.len(), root = %root.display(), "walked source tree");
    Ok(files)
}
