//! Compiler sidecar metadata loading.
//!
//! Compiler plugins drop one `heimdall_*.json` file per translation unit
//! into a shared directory. The loader scans that directory in
//! lexicographic order and merges every file component into the pipeline;
//! a bad sidecar is logged and skipped, never fatal.

use crate::pipeline::SbomPipeline;
use heimdall_model::{paths, CompilerMetadata, ComponentInfo, FileType};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

fn is_sidecar(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .is_some_and(|name| name.starts_with("heimdall_") && name.ends_with(".json"))
}

/// Parses every sidecar file in `dir`, lexicographic order. Parse failures
/// on individual files never abort the scan.
pub fn load_directory(dir: &Path) -> Vec<CompilerMetadata> {
    let entries = match paths::list_dir_sorted(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "no sidecar directory");
            return Vec::new();
        }
    };

    let mut loaded = Vec::new();
    for path in entries.iter().filter(|p| is_sidecar(p)) {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read sidecar");
                continue;
            }
        };
        match serde_json::from_slice::<CompilerMetadata>(&content) {
            Ok(metadata) => loaded.push(metadata),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "invalid sidecar json, skipping");
            }
        }
    }
    debug!(dir = %dir.display(), count = loaded.len(), "loaded compiler metadata");
    loaded
}

/// Merges one compilation unit's metadata into the pipeline.
///
/// Every file component becomes a store entry keyed by
/// `(basename, file_path)`. Compile-time license evidence overrides
/// whatever the binary heuristics guessed for the same path.
pub fn merge_metadata(pipeline: &mut SbomPipeline, metadata: &CompilerMetadata) {
    for file in metadata.files() {
        let mut component = ComponentInfo::new(file.name(), file.file_path.clone());
        component.file_type = FileType::from_sidecar(&file.file_type);
        component.checksum = file.hashes.sha256.clone();
        component.file_size = file.hashes.file_size;
        component.was_processed = true;

        if !file.hashes.sha1.is_empty() {
            component.set_property("hash.sha1", file.hashes.sha1.clone());
        }
        if !file.hashes.md5.is_empty() {
            component.set_property("hash.md5", file.hashes.md5.clone());
        }
        component.set_property("file.size", file.hashes.file_size.to_string());
        component.set_property("license.confidence", file.license.confidence.to_string());
        if !file.relative_path.is_empty() {
            component.set_property("file.relative_path", file.relative_path.clone());
        }
        if !file.modification_time.is_empty() {
            component.set_property("file.modification_time", file.modification_time.clone());
        }
        for (key, value) in &metadata.compiler_flags {
            component.set_property(key.clone(), value.clone());
        }

        let sidecar_license = file.license.spdx_id.clone();
        match pipeline.store_mut().enrol(component) {
            Ok(stored) => {
                // Sidecar license wins over binary heuristics.
                if !sidecar_license.is_empty() && sidecar_license != "NOASSERTION" {
                    stored.license = sidecar_license;
                }
            }
            Err(err) => {
                warn!(path = file.file_path, error = %err, "could not enrol sidecar component");
            }
        }
    }
}

/// Deletes every sidecar file in `dir`; returns the number removed.
pub fn cleanup_directory(dir: &Path) -> usize {
    cleanup_matching(dir, |_| true)
}

/// Deletes sidecar files older than `max_age`; returns the number removed.
pub fn cleanup_older_than(dir: &Path, max_age: Duration) -> usize {
    let now = SystemTime::now();
    cleanup_matching(dir, |path| {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > max_age)
    })
}

fn cleanup_matching(dir: &Path, should_remove: impl Fn(&Path) -> bool) -> usize {
    let Ok(entries) = paths::list_dir_sorted(dir) else {
        return 0;
    };
    let mut removed = 0;
    for path in entries.iter().filter(|p| is_sidecar(p)) {
        if should_remove(path) && fs::remove_file(path).is_ok() {
            removed += 1;
        }
    }
    removed
}

/// `(file count, total size in bytes)` of the sidecar files in `dir`.
pub fn directory_stats(dir: &Path) -> (usize, u64) {
    let Ok(entries) = paths::list_dir_sorted(dir) else {
        return (0, 0);
    };
    let mut count = 0;
    let mut total = 0;
    for path in entries.iter().filter(|p| is_sidecar(p)) {
        count += 1;
        total += paths::file_size(path).unwrap_or(0);
    }
    (count, total)
}
