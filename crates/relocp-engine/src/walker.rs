//! Source tree enumeration with exclusion filtering

use globset::{Glob, GlobSet, GlobSetBuilder};
use relocp_types::{Error, Result};
use relocp_config::ExcludeConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// One regular file discovered by enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path under the source root
    pub source: PathBuf,
    /// Path relative to the source root
    pub relative: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Compiled exclusion rules.
///
/// Directory exclusions prune whole subtrees from the walk; file exclusions
/// and the hidden-file rule apply per file name. Excluded entries never
/// reach the counters.
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    dirs: Vec<String>,
    files: GlobSet,
    hidden_files: bool,
}

impl ExcludeFilter {
    /// Compile the configured exclusion rules
    pub fn new(config: &ExcludeConfig) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.files {
            let glob = Glob::new(pattern).map_err(|e| {
                Error::config(format!("invalid exclude pattern {:?}: {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let files = builder
            .build()
            .map_err(|e| Error::config(format!("failed to compile exclude patterns: {}", e)))?;

        Ok(Self {
            dirs: config.dirs.clone(),
            files,
            hidden_files: config.hidden_files,
        })
    }

    /// Whether a directory with this name should be pruned
    pub fn excludes_dir(&self, name: &str) -> bool {
        if self.hidden_files && name.starts_with('.') {
            return true;
        }
        self.dirs.iter().any(|d| d == name)
    }

    /// Whether a file with this name should be skipped
    pub fn excludes_file(&self, name: &str) -> bool {
        if self.hidden_files && name.starts_with('.') {
            return true;
        }
        self.files.is_match(name)
    }
}

/// Enumerates regular files under the source root in deterministic order.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: PathBuf,
    filter: ExcludeFilter,
}

impl TreeWalker {
    /// Create a walker over `root` with the given exclusion rules
    pub fn new<P: Into<PathBuf>>(root: P, filter: ExcludeFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    /// Walk the tree and collect every included regular file.
    ///
    /// The walk is breadth-stable: entries come back sorted by name within
    /// each directory, so two runs over an unchanged tree enumerate in the
    /// same order. Any walk error is fatal; an unreadable source tree must
    /// not silently produce a partial migration.
    pub fn enumerate(&self) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();

        let filter = self.filter.clone();
        let walk = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| {
                // Never prune the root itself
                if e.depth() == 0 {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                if e.file_type().is_dir() {
                    !filter.excludes_dir(&name)
                } else {
                    true
                }
            });

        for entry in walk {
            let entry = entry.map_err(|e| {
                Error::enumeration(format!("source tree walk failed: {}", e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if self.filter.excludes_file(&name) {
                debug!(path = %entry.path().display(), "excluded by filter");
                continue;
            }
            let meta = entry.metadata().map_err(|e| {
                Error::enumeration(format!(
                    "metadata failed for {}: {}",
                    entry.path().display(),
                    e
                ))
            })?;
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| {
                    Error::enumeration(format!(
                        "path {} escapes source root: {}",
                        entry.path().display(),
                        e
                    ))
                })?
                .to_path_buf();
            entries.push(FileEntry {
                source: entry.path().to_path_buf(),
                relative,
                size: meta.len(),
            });
        }

        let total_bytes: u64 = entries.iter().map(|e| e.size).sum();
        info!(
            files = entries.len(),
            bytes = total_bytes,
            root = %self.root.display(),
            "enumeration complete"
        );
        Ok(entries)
    }

    /// Source root this walker enumerates
    pub fn root(&self) -> &Path {
        &self.root
    }
}
