//! Linker host adapters.
//!
//! One concrete adapter type covers every supported host; the flavor is
//! fixed at construction. `Gold` and `Lld` run the link-time pipeline
//! alone; `Enhanced` additionally merges compiler sidecar metadata at
//! finalize. Shared behaviour lives in the pipeline, not in a type
//! hierarchy.

use crate::config::PluginConfig;
use crate::pipeline::{PipelineError, SbomPipeline};
use crate::sidecar;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkerFlavor {
    Gold,
    Lld,
    #[default]
    Enhanced,
}

/// The capability set a hosting linker drives: enrol input, enrol library,
/// finalize.
pub struct LinkerHostAdapter {
    flavor: LinkerFlavor,
    pipeline: SbomPipeline,
}

impl LinkerHostAdapter {
    pub fn new(flavor: LinkerFlavor) -> Self {
        debug!(?flavor, "initializing linker host adapter");
        Self {
            flavor,
            pipeline: SbomPipeline::new(),
        }
    }

    pub fn flavor(&self) -> LinkerFlavor {
        self.flavor
    }

    pub fn pipeline(&self) -> &SbomPipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut SbomPipeline {
        &mut self.pipeline
    }

    pub fn enrol_input(&mut self, path: &Path) -> Result<(), PipelineError> {
        self.pipeline.process_input_file(path)
    }

    pub fn enrol_library(&mut self, path: &Path) -> Result<(), PipelineError> {
        self.pipeline.process_library(path)
    }

    /// Merges sidecar metadata (Enhanced only), emits the SBOM, and
    /// optionally cleans the sidecar directory up afterwards.
    pub fn finalize(&mut self, config: &PluginConfig) -> anyhow::Result<()> {
        if self.flavor == LinkerFlavor::Enhanced {
            let dir = config.sidecar_directory();
            let loaded = sidecar::load_directory(&dir);
            if !loaded.is_empty() {
                let (files, bytes) = sidecar::directory_stats(&dir);
                info!(units = loaded.len(), files, bytes, "merging compiler metadata");
            }
            for metadata in &loaded {
                sidecar::merge_metadata(&mut self.pipeline, metadata);
            }
        }

        self.pipeline.finalize(config)?;

        if self.flavor == LinkerFlavor::Enhanced && config.cleanup_sidecars {
            let removed = sidecar::cleanup_directory(&config.sidecar_directory());
            debug!(removed, "cleaned up sidecar files");
        }
        Ok(())
    }
}
