#![doc = include_str!("../readme.md")]

use thiserror::Error;

mod archive;
mod classify;
mod pe;
mod reader;

pub mod dwarf;
pub mod elf;
pub mod hash;
pub mod heuristics;
pub mod macho;
pub mod resolve;

pub use classify::{classify_bytes, classify_file, BinaryFormat};
pub use elf::ElfDynamicInfo;
pub use macho::MachOInfo;
pub use reader::ObjectReader;

/// Errors raised while introspecting a binary.
///
/// `NotThisFormat` is fatal for a single reader but non-fatal for dispatch:
/// the dispatch layer maps it to "try the next reader" or "give up" without
/// raising. `Truncated`/`Malformed`/`Unsupported` are logged by callers and
/// leave the component enrolled with whatever partial data exists.
#[derive(Error, Debug)]
pub enum BinaryError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The file exists but its magic does not match the chosen reader.
    #[error("not a {0} file")]
    NotThisFormat(&'static str),
    /// Unexpected end of file inside a structure.
    #[error("truncated {0}")]
    Truncated(&'static str),
    /// Self-inconsistent offsets or otherwise unparseable content.
    #[error("malformed binary: {0}")]
    Malformed(String),
    /// Valid file using a feature the reader does not handle.
    #[error("unsupported feature: {0}")]
    Unsupported(&'static str),
}

impl From<object::read::Error> for BinaryError {
    fn from(err: object::read::Error) -> Self {
        BinaryError::Malformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BinaryError>;
