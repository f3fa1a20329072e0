//! Filesystem helpers for assembling the build root.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};
use walkdir::WalkDir;

/// Compute the path of `target` relative to the directory `base`.
///
/// Both paths should be absolute (or both relative to the same root).
///
/// # Examples
/// ```ignore
/// relative_path(Path::new("/tmp/a/b"), Path::new("/tmp/c/d")) // "../../c/d"
/// ```
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base: Vec<Component<'_>> = base.components().collect();
    let target: Vec<Component<'_>> = target.components().collect();

    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for comp in &target[common..] {
        rel.push(comp.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

/// Create a relative symlink at `link` pointing to `target`.
///
/// Does nothing when something already exists at `link`. Returns whether
/// a link was created.
pub fn make_link(target: &Path, link: &Path) -> Result<bool> {
    if link.symlink_metadata().is_ok() {
        return Ok(false);
    }
    let dir = link
        .parent()
        .with_context(|| format!("Invalid link path: {}", link.display()))?;
    let rel = relative_path(dir, target);
    symlink(&rel, link)
        .with_context(|| format!("Failed to link {} -> {}", link.display(), rel.display()))?;
    Ok(true)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    let resolved = link.parent().map(|p| p.join(target)).unwrap_or_default();
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Recursively copy `src` to `dst`, replacing `dst` if it exists.
pub fn replace_dir(src: &Path, dst: &Path) -> Result<()> {
    if dst.exists() {
        fs::remove_dir_all(dst).with_context(|| format!("Failed to remove {}", dst.display()))?;
    }
    copy_dir(src, dst)
}

/// Recursively copy `src` into `dst`, creating directories as needed.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// Collect all files under `root` with the given extension, sorted.
pub fn collect_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == extension))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}
