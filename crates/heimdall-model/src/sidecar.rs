//! Serde schema of the sidecar JSON files written by compiler plugins.
//!
//! One file is written per translation unit, named
//! `heimdall_<sanitised-source-name>_<unix-seconds>.json`. The field names
//! mirror the wire format exactly; unknown fields are ignored and missing
//! fields take their defaults so that older plugins keep loading.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File digests recorded by the compiler plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ComponentHashes {
    pub sha256: String,
    pub sha1: String,
    pub md5: String,
    pub file_size: u64,
}

impl ComponentHashes {
    /// A hash record is usable when at least the SHA-256 digest is present.
    pub fn is_valid(&self) -> bool {
        !self.sha256.is_empty()
    }
}

/// License evidence detected at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SidecarLicense {
    pub name: String,
    #[serde(rename = "spdxId")]
    pub spdx_id: String,
    pub confidence: f64,
    pub copyright: String,
    pub author: String,
}

/// Per-file provenance record produced for every source and include file of
/// a translation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileComponent {
    pub file_path: String,
    pub relative_path: String,
    /// `source`, `header`, or `system_header`.
    pub file_type: String,
    pub hashes: ComponentHashes,
    pub license: SidecarLicense,
    pub copyright_notice: String,
    pub authors: Vec<String>,
    /// ISO-8601 last-modification timestamp.
    pub modification_time: String,
    pub is_system_file: bool,
    pub is_generated: bool,
}

impl FileComponent {
    /// Component name: the file name without its directory.
    pub fn name(&self) -> String {
        Path::new(&self.file_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_path.clone())
    }
}

/// Complete compiler metadata for one compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompilerMetadata {
    pub compiler_type: String,
    pub compiler_version: String,
    pub main_source_file: String,
    pub object_file: String,
    pub project_root: String,
    pub source_files: Vec<FileComponent>,
    pub include_files: Vec<FileComponent>,
    pub functions: Vec<String>,
    pub global_variables: Vec<String>,
    pub macro_definitions: Vec<String>,
    pub compiler_flags: IndexMap<String, String>,
    pub target_architecture: String,
    /// ISO-8601, millisecond precision.
    pub compilation_timestamp: String,
}

impl CompilerMetadata {
    pub fn total_file_count(&self) -> usize {
        self.source_files.len() + self.include_files.len()
    }

    /// All file components, sources first.
    pub fn files(&self) -> impl Iterator<Item = &FileComponent> {
        self.source_files.iter().chain(self.include_files.iter())
    }
}
