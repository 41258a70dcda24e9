//! Local directory -> in-memory workspace

use anyhow::{Context, Result};
use ptm_vfs::{MemoryFileSystem, TreePath, VirtualFileSystem};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Directory names never imported
const IGNORED: &[&str] = &[".git", ".hg", ".svn", "target", "node_modules"];

/// Counts of imported entries
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImportStats {
    pub(crate) folders: usize,
    pub(crate) files: usize,
    pub(crate) skipped: usize,
}

/// Copy the tree under `root` into a fresh [`MemoryFileSystem`]
///
/// Symlinks are not followed. Unreadable entries are skipped with a warning.
pub(crate) fn import_dir(root: &Path) -> Result<(MemoryFileSystem, ImportStats)> {
    let meta = std::fs::metadata(root).with_context(|| format!("cannot access {}", root.display()))?;
    anyhow::ensure!(meta.is_dir(), "{} is not a directory", root.display());

    let fs = MemoryFileSystem::new();
    let mut stats = ImportStats::default();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {err}");
                stats.skipped += 1;
                continue;
            }
        };
        let path = tree_path(root, entry.path())?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs.create_folder(&path)?;
            stats.folders += 1;
        } else if file_type.is_file() {
            match std::fs::read(entry.path()) {
                Ok(content) => {
                    fs.create_file(&path, &content)?;
                    stats.files += 1;
                }
                Err(err) => {
                    tracing::warn!(path = %entry.path().display(), "skipping file: {err}");
                    stats.skipped += 1;
                }
            }
        } else {
            stats.skipped += 1;
        }
    }
    tracing::info!(
        root = %root.display(),
        folders = stats.folders,
        files = stats.files,
        skipped = stats.skipped,
        "directory imported"
    );
    Ok((fs, stats))
}

fn is_ignored(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED.contains(&name))
}

/// Workspace path of `path` below `root`
fn tree_path(root: &Path, path: &Path) -> Result<TreePath> {
    let relative = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    let mut out = TreePath::root();
    for component in relative.components() {
        let name = component.as_os_str().to_string_lossy();
        out = out
            .child(&name)
            .with_context(|| format!("unsupported file name in {}", path.display()))?;
    }
    Ok(out)
}
