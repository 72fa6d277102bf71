use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Classification of a component on disk.
///
/// Derived from the container format and, for compiler-reported files, from
/// the sidecar `file_type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FileType {
    Object,
    StaticLibrary,
    SharedLibrary,
    Executable,
    SourceFile,
    HeaderFile,
    #[default]
    Unknown,
}

impl FileType {
    /// Maps to the SPDX 2.3 `FileType` enumeration.
    pub fn spdx_2_3(self) -> &'static str {
        match self {
            FileType::Object | FileType::SharedLibrary | FileType::Executable => "BINARY",
            FileType::StaticLibrary => "ARCHIVE",
            FileType::SourceFile | FileType::HeaderFile => "SOURCE",
            FileType::Unknown => "OTHER",
        }
    }

    /// Human-readable label used in descriptions and comments.
    pub fn describe(self) -> &'static str {
        match self {
            FileType::Object => "Object file",
            FileType::StaticLibrary => "Static library",
            FileType::SharedLibrary => "Shared library",
            FileType::Executable => "Executable",
            FileType::SourceFile => "Source file",
            FileType::HeaderFile => "Header file",
            FileType::Unknown => "Unknown",
        }
    }

    /// Parses the sidecar `file_type` string written by compiler plugins.
    pub fn from_sidecar(s: &str) -> Self {
        match s {
            "source" => FileType::SourceFile,
            "header" | "system_header" => FileType::HeaderFile,
            _ => FileType::Unknown,
        }
    }
}

/// A single entry from a symbol table.
///
/// Duplicate names with different addresses are distinct entries; ordering
/// follows the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub address: u64,
    pub size: u64,
    /// `local`, `global`, or `weak`.
    pub binding: String,
    pub visibility: String,
    pub defined: bool,
}

/// A section header entry, flags preserved verbatim from the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionInfo {
    pub name: String,
    pub address: u64,
    pub size: u64,
    pub flags: u64,
}

/// Link-target identity surfaced in document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildInfo {
    pub target_name: String,
    pub build_id: String,
}

/// Returns true when `s` is a well-formed SHA-256 hex digest (64 lowercase
/// hex characters).
pub fn is_valid_checksum(s: &str) -> bool {
    s.len() == 64
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// The central provenance record for one file participating in the link.
///
/// Created the first time the link event sink or the sidecar loader observes
/// a file, then enriched in place as more evidence arrives. Identity is the
/// `(name, file_path)` tuple; see [`crate::ComponentStore`].
///
/// # Example
///
/// ```
/// use heimdall_model::{ComponentInfo, FileType};
///
/// let mut c = ComponentInfo::from_path("/usr/lib/libssl.so.3");
/// c.file_type = FileType::SharedLibrary;
/// assert_eq!(c.name, "libssl.so.3");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ComponentInfo {
    pub name: String,
    pub file_path: String,
    /// Empty until detected; emitters substitute `UNKNOWN`/`NOASSERTION`.
    pub version: String,
    pub supplier: String,
    pub download_location: String,
    pub homepage: String,
    /// Normalised SPDX identifier, or empty when nothing was detected.
    pub license: String,
    pub file_type: FileType,
    pub file_size: u64,
    /// Lowercase hex SHA-256; empty only before the file has been read.
    pub checksum: String,
    pub symbols: Vec<SymbolInfo>,
    pub sections: Vec<SectionInfo>,
    /// Dependency tokens as recorded in the dynamic table, first-seen order.
    pub dependencies: IndexSet<String>,
    pub source_files: IndexSet<String>,
    pub functions: IndexSet<String>,
    pub compile_units: IndexSet<String>,
    pub contains_debug_info: bool,
    pub is_stripped: bool,
    pub is_system_library: bool,
    /// purl type hint: `conan`, `vcpkg`, `system`, or empty for `generic`.
    pub package_manager: String,
    pub properties: IndexMap<String, String>,
    pub was_processed: bool,
}

impl ComponentInfo {
    pub fn new(name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    /// Builds a component whose name is the file name of `path`.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        Self::new(name, path)
    }

    pub fn add_symbol(&mut self, symbol: SymbolInfo) {
        if !self.symbols.contains(&symbol) {
            self.symbols.push(symbol);
        }
    }

    pub fn add_section(&mut self, section: SectionInfo) {
        if !self.sections.contains(&section) {
            self.sections.push(section);
        }
    }

    pub fn add_dependency(&mut self, dep: impl Into<String>) {
        self.dependencies.insert(dep.into());
    }

    pub fn add_source_file(&mut self, file: impl Into<String>) {
        self.source_files.insert(file.into());
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Merges `other` into `self`.
    ///
    /// Set-typed attributes append entries not already present, never
    /// reordering existing ones. Scalar attributes keep the existing value
    /// when it is non-empty and adopt the incoming one otherwise. Booleans
    /// are sticky once set.
    pub fn merge_from(&mut self, other: &ComponentInfo) {
        fn adopt(existing: &mut String, incoming: &str) {
            if existing.is_empty() && !incoming.is_empty() {
                *existing = incoming.to_string();
            }
        }

        adopt(&mut self.version, &other.version);
        adopt(&mut self.supplier, &other.supplier);
        adopt(&mut self.download_location, &other.download_location);
        adopt(&mut self.homepage, &other.homepage);
        adopt(&mut self.license, &other.license);
        adopt(&mut self.checksum, &other.checksum);
        adopt(&mut self.package_manager, &other.package_manager);

        if self.file_size == 0 {
            self.file_size = other.file_size;
        }
        if self.file_type == FileType::Unknown {
            self.file_type = other.file_type;
        }

        for symbol in &other.symbols {
            self.add_symbol(symbol.clone());
        }
        for section in &other.sections {
            self.add_section(section.clone());
        }
        for dep in &other.dependencies {
            self.dependencies.insert(dep.clone());
        }
        for file in &other.source_files {
            self.source_files.insert(file.clone());
        }
        for function in &other.functions {
            self.functions.insert(function.clone());
        }
        for unit in &other.compile_units {
            self.compile_units.insert(unit.clone());
        }
        for (key, value) in &other.properties {
            self.properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        self.contains_debug_info |= other.contains_debug_info;
        self.is_stripped |= other.is_stripped;
        self.is_system_library |= other.is_system_library;
        self.was_processed |= other.was_processed;
    }
}
