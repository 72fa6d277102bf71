//! Library dependency resolution.
//!
//! Maps a dependency token (`libssl.so.3`, `@rpath/libfoo.dylib`,
//! `KERNEL32.dll`, or an absolute path) to the first existing file across
//! the search order: absolute token, the referring binary's
//! RPATH/RUNPATH, then the configured system paths.

use heimdall_model::paths;
use std::path::{Path, PathBuf};
use tracing::trace;

#[cfg(unix)]
const SYSTEM_PATHS: &[&str] = &[
    "/lib",
    "/lib64",
    "/usr/lib",
    "/usr/lib64",
    "/usr/local/lib",
];

#[cfg(not(unix))]
const SYSTEM_PATHS: &[&str] = &["C:\\Windows\\System32", "C:\\Windows\\SysWOW64"];

/// Search-path driven resolver for dependency tokens.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    search_paths: Vec<PathBuf>,
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self {
            search_paths: SYSTEM_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a caller-provided directory after the platform defaults.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// Resolves `token`, consulting `rpaths` (from the referring binary)
    /// before the configured list. Returns the canonical absolute path of
    /// the first existing candidate, following symlinks, or `None`.
    pub fn resolve(&self, token: &str, rpaths: &[String]) -> Option<PathBuf> {
        // Mach-O install names carry loader-relative prefixes; the file
        // name is what the search paths can answer for.
        let token = token
            .strip_prefix("@rpath/")
            .or_else(|| token.strip_prefix("@loader_path/"))
            .or_else(|| token.strip_prefix("@executable_path/"))
            .unwrap_or(token);

        let token_path = Path::new(token);
        if token_path.is_absolute() {
            return existing(token_path);
        }

        for dir in rpaths
            .iter()
            .map(PathBuf::from)
            .chain(self.search_paths.iter().cloned())
        {
            let candidate = paths::normalize(&dir.join(token_path));
            if let Some(found) = existing(&candidate) {
                trace!(token, path = %found.display(), "resolved dependency");
                return Some(found);
            }
        }
        None
    }
}

fn existing(path: &Path) -> Option<PathBuf> {
    if paths::exists(path) {
        Some(paths::canonicalize_or_input(path))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn bare_resolver() -> DependencyResolver {
        DependencyResolver {
            search_paths: Vec::new(),
        }
    }

    #[test]
    fn test_absolute_token_resolves_directly() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("libx.so.1");
        fs::write(&lib, b"x").unwrap();

        let resolver = bare_resolver();
        let resolved = resolver.resolve(lib.to_str().unwrap(), &[]).unwrap();
        assert_eq!(resolved, fs::canonicalize(&lib).unwrap());
    }

    #[test]
    fn test_search_path_order_first_hit_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("libdup.so"), b"1").unwrap();
        fs::write(second.path().join("libdup.so"), b"2").unwrap();

        let mut resolver = bare_resolver();
        resolver.add_search_path(first.path());
        resolver.add_search_path(second.path());

        let resolved = resolver.resolve("libdup.so", &[]).unwrap();
        assert!(resolved.starts_with(fs::canonicalize(first.path()).unwrap()));
    }

    #[test]
    fn test_rpath_beats_search_paths() {
        let rpath_dir = tempfile::tempdir().unwrap();
        let sys_dir = tempfile::tempdir().unwrap();
        fs::write(rpath_dir.path().join("libr.so"), b"r").unwrap();
        fs::write(sys_dir.path().join("libr.so"), b"s").unwrap();

        let mut resolver = bare_resolver();
        resolver.add_search_path(sys_dir.path());

        let rpaths = vec![rpath_dir.path().to_string_lossy().into_owned()];
        let resolved = resolver.resolve("libr.so", &rpaths).unwrap();
        assert!(resolved.starts_with(fs::canonicalize(rpath_dir.path()).unwrap()));
    }

    #[test]
    fn test_unresolvable_token_is_none() {
        let resolver = bare_resolver();
        assert!(resolver.resolve("libnothing.so.9", &[]).is_none());
    }

    #[test]
    fn test_dot_segments_normalised() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("liba.so"), b"a").unwrap();

        let mut resolver = bare_resolver();
        resolver.add_search_path(&sub);

        let resolved = resolver.resolve("../liba.so", &[]).unwrap();
        assert_eq!(
            resolved,
            fs::canonicalize(dir.path().join("liba.so")).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_followed_to_canonical_target() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("libreal.so.1.2.3");
        fs::write(&real, b"lib").unwrap();
        let link = dir.path().join("libreal.so.1");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let mut resolver = bare_resolver();
        resolver.add_search_path(dir.path());

        let resolved = resolver.resolve("libreal.so.1", &[]).unwrap();
        assert_eq!(resolved, fs::canonicalize(&real).unwrap());
    }

    #[test]
    fn test_macho_rpath_prefix_stripped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libfoo.dylib"), b"f").unwrap();

        let rpaths = vec![dir.path().to_string_lossy().into_owned()];
        let resolver = bare_resolver();
        assert!(resolver.resolve("@rpath/libfoo.dylib", &rpaths).is_some());
    }
}
