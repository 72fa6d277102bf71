#![doc = include_str!("../readme.md")]

mod component;
mod sidecar;
mod store;

pub mod paths;

pub use component::{
    is_valid_checksum, BuildInfo, ComponentInfo, FileType, SectionInfo, SymbolInfo,
};
pub use sidecar::{CompilerMetadata, ComponentHashes, FileComponent, SidecarLicense};
pub use store::{ComponentId, ComponentStore, StoreError, StoreStats};
