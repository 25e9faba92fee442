//! Project discovery.
//!
//! A project is a directory that directly contains at least one `*.tf` file.
//! The walk stops at the first project on every branch, so nested module
//! directories inside a project are never scanned on their own.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::ports::filesystem::FileSystem;

const CACHE_DIR: &str = ".terraform";

/// Finds every project under `root`, sorted by path.
///
/// Hidden directories and terraform caches are skipped. When `root` itself
/// holds `*.tf` files it is the only project.
///
/// # Errors
///
/// Returns an error string if `root` is not a readable directory.
/// Unreadable subdirectories are logged and skipped.
pub fn find_projects(fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>, String> {
    if !fs.is_dir(root) {
        return Err(format!("{} is not a directory", root.display()));
    }
    let entries = fs
        .list_dir(root)
        .map_err(|e| format!("failed to read {}: {e}", root.display()))?;

    let mut projects = Vec::new();
    let mut pending = vec![(root.to_path_buf(), entries)];
    while let Some((dir, entries)) = pending.pop() {
        if is_project(fs, &dir, &entries) {
            debug!(project = %dir.display(), "found project");
            projects.push(dir);
            continue;
        }
        for name in entries {
            if name.starts_with('.') || name == CACHE_DIR {
                continue;
            }
            let child = dir.join(&name);
            if !fs.is_dir(&child) {
                continue;
            }
            match fs.list_dir(&child) {
                Ok(children) => pending.push((child, children)),
                Err(e) => warn!(path = %child.display(), error = %e, "skipping unreadable directory"),
            }
        }
    }

    projects.sort();
    Ok(projects)
}

fn is_project(fs: &dyn FileSystem, dir: &Path, entries: &[String]) -> bool {
    entries
        .iter()
        .filter(|name| name.ends_with(".tf"))
        .any(|name| !fs.is_dir(&dir.join(name)))
}
