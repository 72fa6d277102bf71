#![doc = include_str!("../readme.md")]

mod adapter;
mod config;
mod entry;
mod pipeline;
mod sidecar;

pub use adapter::{LinkerFlavor, LinkerHostAdapter};
pub use config::{FormatFamily, PluginConfig};
pub use pipeline::{PipelineError, SbomPipeline};
pub use sidecar::{
    cleanup_directory, cleanup_older_than, directory_stats, load_directory, merge_metadata,
};
