//! The provenance pipeline: link events in, one SBOM out.
//!
//! Each `process_*` call runs one file through classification, object
//! reading, hashing, heuristics, and enrolment. `finalize` freezes the
//! store and writes the document. The pipeline is single-threaded by
//! contract; nothing here spawns workers.

use crate::config::{FormatFamily, PluginConfig};
use heimdall_binary::hash::{self, HashAlgorithm, HashService};
use heimdall_binary::heuristics::{self, HeuristicTables};
use heimdall_binary::resolve::DependencyResolver;
use heimdall_binary::{dwarf, BinaryError, ObjectReader};
use heimdall_cyclonedx::{CycloneDxDocumentInfo, CycloneDxWriter};
use heimdall_model::{BuildInfo, ComponentInfo, ComponentStore, StoreError};
use heimdall_spdx::{SpdxDocumentInfo, SpdxWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Merge engine shared by the link event sink and the sidecar loader.
pub struct SbomPipeline {
    store: ComponentStore,
    hasher: HashService,
    resolver: DependencyResolver,
    tables: HeuristicTables,
    build_info: BuildInfo,
    extract_debug_info: bool,
}

impl Default for SbomPipeline {
    fn default() -> Self {
        Self {
            store: ComponentStore::new(),
            hasher: HashService::new(),
            resolver: DependencyResolver::new(),
            tables: HeuristicTables::default(),
            build_info: BuildInfo::default(),
            extract_debug_info: true,
        }
    }
}

impl SbomPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_build_info(&mut self, build_info: BuildInfo) {
        self.build_info = build_info;
    }

    pub fn set_extract_debug_info(&mut self, extract: bool) {
        self.extract_debug_info = extract;
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.resolver.add_search_path(path);
    }

    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ComponentStore {
        &mut self.store
    }

    /// Handles a `process_input_file` event. Resolved dynamic dependencies
    /// of the input are enrolled as libraries.
    pub fn process_input_file(&mut self, path: &Path) -> Result<(), PipelineError> {
        let rpaths = self.process_path(path)?;
        self.enrol_resolved_dependencies(path, &rpaths)?;
        Ok(())
    }

    /// Handles a `process_library` event.
    pub fn process_library(&mut self, path: &Path) -> Result<(), PipelineError> {
        self.process_path(path)?;
        Ok(())
    }

    /// Runs one file through the full extraction chain and enrols it.
    /// Returns the file's RPATH/RUNPATH entries for dependency resolution.
    fn process_path(&mut self, path: &Path) -> Result<Vec<String>, PipelineError> {
        let mut component = ComponentInfo::from_path(path.to_string_lossy().into_owned());

        component.file_size = heimdall_model::paths::file_size(path).unwrap_or(0);
        component.checksum = self
            .hasher
            .file_digest(HashAlgorithm::Sha256, path)
            .map_err(|source| PipelineError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if let Ok(sha1) = self.hasher.file_digest(HashAlgorithm::Sha1, path) {
            component.set_property("hash.sha1", sha1);
        }
        if let Ok(md5) = self.hasher.file_digest(HashAlgorithm::Md5, path) {
            component.set_property("hash.md5", md5);
        }

        let mut rpaths = Vec::new();
        match ObjectReader::open(path) {
            Ok(reader) => {
                rpaths = reader.rpaths();
                if let Err(err) = reader.populate(&mut component) {
                    log_reader_failure(path, &err);
                }
            }
            Err(err) => log_reader_failure(path, &err),
        }

        if component.license.is_empty() {
            let license = heuristics::detect_license(path, &component.symbols, &self.tables);
            if license != heuristics::NOASSERTION {
                component.license = license;
            }
        }
        if component.version.is_empty() {
            if let Some(version) = heuristics::detect_version(path, &component.symbols) {
                component.version = version;
            }
        }
        if component.package_manager.is_empty() {
            component.package_manager = heuristics::detect_package_manager(path);
        }
        component.is_system_library = heuristics::is_system_library_path(
            &heimdall_model::paths::canonicalize_or_input(path),
        );

        if component.contains_debug_info && self.extract_debug_info {
            extract_debug_evidence(path, &mut component);
        }

        self.store.enrol(component)?;
        Ok(rpaths)
    }

    /// Resolves each dependency token of the freshly enrolled input and
    /// enrols the hits as libraries, skipping paths already in the store.
    fn enrol_resolved_dependencies(
        &mut self,
        path: &Path,
        rpaths: &[String],
    ) -> Result<(), PipelineError> {
        let id = heimdall_model::ComponentId::new(
            heimdall_model::paths::file_name(&path.to_string_lossy()),
            path.to_string_lossy().into_owned(),
        );
        let tokens: Vec<String> = self
            .store
            .get(&id)
            .map(|c| c.dependencies.iter().cloned().collect())
            .unwrap_or_default();

        for token in tokens {
            let Some(resolved) = self.resolver.resolve(&token, rpaths) else {
                debug!(token, "could not resolve dependency");
                continue;
            };
            let resolved_id = heimdall_model::ComponentId::new(
                heimdall_model::paths::file_name(&resolved.to_string_lossy()),
                resolved.to_string_lossy().into_owned(),
            );
            if self.store.get(&resolved_id).is_some() {
                continue;
            }
            debug!(token, path = %resolved.display(), "enrolling resolved dependency");
            if let Err(err) = self.process_library(&resolved) {
                warn!(token, error = %err, "failed to enrol resolved dependency");
            }
        }
        Ok(())
    }

    /// Freezes the store and writes the SBOM selected by `config`.
    ///
    /// Either exactly one document is written, or an error is returned and
    /// nothing useful is on disk; partial output is never reported as
    /// success.
    pub fn finalize(&mut self, config: &PluginConfig) -> anyhow::Result<()> {
        use anyhow::Context;

        self.store.freeze();

        let stats = self.store.stats();
        info!(
            components = stats.total,
            shared_libraries = stats.shared_libraries,
            system_libraries = stats.system_libraries,
            with_debug_info = stats.with_debug_info,
            stripped = stats.stripped,
            "finalizing SBOM"
        );

        let tool_version = env!("CARGO_PKG_VERSION");
        let file = File::create(&config.output_path).with_context(|| {
            format!(
                "could not open output file: {}",
                config.output_path.display()
            )
        })?;
        let mut writer = BufWriter::new(file);

        match config.format {
            FormatFamily::Spdx => {
                let info = SpdxDocumentInfo::new(
                    tool_version,
                    self.build_info.clone(),
                    self.verification_code(),
                );
                SpdxWriter::new(config.spdx_version, info)
                    .write(&self.store, &mut writer)
                    .context("failed to write SPDX document")?;
            }
            FormatFamily::CycloneDx => {
                let info = CycloneDxDocumentInfo::new(tool_version, self.build_info.clone());
                CycloneDxWriter::new(config.cyclonedx_version, info)
                    .write(&self.store, &mut writer)
                    .context("failed to write CycloneDX document")?;
            }
        }

        info!(path = %config.output_path.display(), "SBOM written");
        Ok(())
    }

    /// SPDX 2.3 package verification code over the per-file SHA-1 digests.
    /// Files without a digest are listed as excluded.
    fn verification_code(&self) -> String {
        let mut digests = Vec::new();
        let mut excluded = Vec::new();
        for component in self.store.iter() {
            match component.properties.get("hash.sha1") {
                Some(sha1) if !sha1.is_empty() => digests.push(sha1.clone()),
                _ => excluded.push(heimdall_model::paths::file_name(&component.file_path)),
            }
        }
        hash::verification_code(digests, &excluded)
    }
}

/// Reader failures are `FormatError`s: logged, component left enrolled
/// with name/path/checksum, the run continues.
fn log_reader_failure(path: &Path, err: &BinaryError) {
    warn!(path = %path.display(), error = %err, "binary reader failed");
}

/// DWARF extraction, serialised by the reader's own lock. Out-parameters
/// are pre-seeded with nothing; failed extractions leave the component as
/// the object walk produced it.
fn extract_debug_evidence(path: &Path, component: &mut ComponentInfo) {
    let mut source_files = Vec::new();
    if dwarf::extract_source_files(path, &mut source_files) {
        for file in source_files {
            component.source_files.insert(file);
        }
    }
    let mut compile_units = Vec::new();
    if dwarf::extract_compile_units(path, &mut compile_units) {
        for unit in compile_units {
            component.compile_units.insert(unit);
        }
    }
    let mut functions = Vec::new();
    if dwarf::extract_functions(path, &mut functions) {
        for function in functions {
            component.functions.insert(function);
        }
    }
}
