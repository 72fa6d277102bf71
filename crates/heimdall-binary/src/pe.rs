//! PE-specific extraction.
//!
//! Symbols and sections go through the generic reader; only the import
//! directory needs format-aware handling. Version resources are not read.

use crate::Result;
use object::Object;

/// Imported DLL names from the import directory table, first-seen order.
///
/// A PE file without an import directory yields an empty list.
pub fn imported_dlls(file: &object::File<'_>) -> Result<Vec<String>> {
    let mut dlls: Vec<String> = Vec::new();
    for import in file.imports()? {
        let library = String::from_utf8_lossy(import.library()).into_owned();
        if library.is_empty() || dlls.contains(&library) {
            continue;
        }
        dlls.push(library);
    }
    Ok(dlls)
}
