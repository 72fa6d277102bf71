//! Minimal filesystem facade.
//!
//! Every path touch in the workspace (existence, canonicalisation, size,
//! directory enumeration) goes through these helpers so platform quirks are
//! handled in one place.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// File name of `path` as a string, or the whole path when it has none.
pub fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Canonical absolute form of `path`, or the input unchanged when the file
/// does not exist (canonicalisation requires an existing file).
pub fn canonicalize_or_input(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn file_size(path: &Path) -> io::Result<u64> {
    Ok(fs::metadata(path)?.len())
}

/// Directory entries sorted lexicographically by file name.
pub fn list_dir_sorted(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    Ok(entries)
}

/// Resolves `.` and `..` segments lexically, without touching the
/// filesystem. Leading `..` segments that would escape the root are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
