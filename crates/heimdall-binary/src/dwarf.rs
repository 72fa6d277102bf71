//! DWARF debug-info extraction.
//!
//! The backend is not reentrant: every public operation serialises through
//! one process-wide lock, and nothing here may be dispatched to a parallel
//! executor.
//!
//! All operations append to the caller's sequence (callers may pre-seed)
//! and return `true` on success; on failure the out-sequence is left
//! untouched.

use object::{Object, ObjectSection};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

static DWARF_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> std::sync::MutexGuard<'static, ()> {
    DWARF_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// True when `path` carries non-empty DWARF sections.
pub fn has_dwarf_info(path: &Path) -> bool {
    let _guard = lock();
    let Ok(data) = fs::read(path) else {
        return false;
    };
    let Ok(file) = object::File::parse(&*data) else {
        return false;
    };
    has_debug_sections(&file)
}

/// Source files from the `.debug_line` file tables of all compile units,
/// plus `DW_AT_decl_file` references from subprogram DIEs, deduplicated by
/// absolute path.
pub fn extract_source_files(path: &Path, out: &mut Vec<String>) -> bool {
    append(out, query(path, Query::SourceFiles))
}

/// `DW_AT_name` of every `DW_TAG_compile_unit`.
pub fn extract_compile_units(path: &Path, out: &mut Vec<String>) -> bool {
    append(out, query(path, Query::CompileUnits))
}

/// Names of `DW_TAG_subprogram` DIEs that carry `DW_AT_name`. Inlined
/// instances without a name are skipped.
pub fn extract_functions(path: &Path, out: &mut Vec<String>) -> bool {
    append(out, query(path, Query::Functions))
}

/// `"<file>:<line>"` pairs from the line programs.
pub fn extract_line_info(path: &Path, out: &mut Vec<String>) -> bool {
    append(out, query(path, Query::LineInfo))
}

fn append(out: &mut Vec<String>, found: Option<Vec<String>>) -> bool {
    match found {
        Some(items) => {
            for item in items {
                if !out.contains(&item) {
                    out.push(item);
                }
            }
            true
        }
        None => false,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Query {
    SourceFiles,
    CompileUnits,
    Functions,
    LineInfo,
}

type Reader<'a> = gimli::EndianSlice<'a, gimli::RunTimeEndian>;

fn has_debug_sections(file: &object::File<'_>) -> bool {
    [".debug_info", ".debug_line"].iter().any(|name| {
        file.section_by_name(name)
            .map(|s| s.size() > 0)
            .unwrap_or(false)
    })
}

/// Loads the DWARF sections of `path` and runs `query` over every unit.
/// Returns `None` on any failure so callers can leave their out-sequences
/// untouched.
fn query(path: &Path, query: Query) -> Option<Vec<String>> {
    let _guard = lock();

    let data = fs::read(path).ok()?;
    let file = object::File::parse(&*data).ok()?;
    if !has_debug_sections(&file) {
        return None;
    }
    let endian = if file.is_little_endian() {
        gimli::RunTimeEndian::Little
    } else {
        gimli::RunTimeEndian::Big
    };

    let load_section = |id: gimli::SectionId| -> Result<Cow<[u8]>, gimli::Error> {
        Ok(file
            .section_by_name(id.name())
            .and_then(|section| section.uncompressed_data().ok())
            .unwrap_or(Cow::Borrowed(&[][..])))
    };
    let dwarf_cow = gimli::Dwarf::load(load_section).ok()?;
    let dwarf = dwarf_cow.borrow(|section| gimli::EndianSlice::new(section, endian));

    match walk(&dwarf, query) {
        Ok(found) => Some(found),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "dwarf walk failed");
            None
        }
    }
}

fn walk(dwarf: &gimli::Dwarf<Reader<'_>>, query: Query) -> gimli::Result<Vec<String>> {
    let mut found = Vec::new();
    let mut push = |item: String| {
        if !found.contains(&item) {
            found.push(item);
        }
    };

    let mut units = dwarf.units();
    while let Some(header) = units.next()? {
        let unit = dwarf.unit(header)?;

        match query {
            Query::CompileUnits => {
                if let Some(name) = &unit.name {
                    push(name.to_string_lossy().into_owned());
                }
            }
            Query::SourceFiles => {
                if let Some(program) = unit.line_program.clone() {
                    let header = program.header();
                    for file in header.file_names() {
                        if let Some(path) = render_file(dwarf, &unit, header, file) {
                            push(path);
                        }
                    }
                }
                let mut entries = unit.entries();
                while let Some((_, entry)) = entries.next_dfs()? {
                    if entry.tag() != gimli::DW_TAG_subprogram {
                        continue;
                    }
                    let Some(gimli::AttributeValue::FileIndex(index)) =
                        entry.attr_value(gimli::DW_AT_decl_file)?
                    else {
                        continue;
                    };
                    let Some(program) = unit.line_program.as_ref() else {
                        continue;
                    };
                    let header = program.header();
                    if let Some(file) = header.file(index) {
                        if let Some(path) = render_file(dwarf, &unit, header, file) {
                            push(path);
                        }
                    }
                }
            }
            Query::Functions => {
                let mut entries = unit.entries();
                while let Some((_, entry)) = entries.next_dfs()? {
                    if entry.tag() != gimli::DW_TAG_subprogram {
                        continue;
                    }
                    let Some(attr) = entry.attr_value(gimli::DW_AT_name)? else {
                        continue;
                    };
                    if let Ok(name) = dwarf.attr_string(&unit, attr) {
                        push(name.to_string_lossy().into_owned());
                    }
                }
            }
            Query::LineInfo => {
                let Some(program) = unit.line_program.clone() else {
                    continue;
                };
                let mut rows = program.rows();
                while let Some((header, row)) = rows.next_row()? {
                    if row.end_sequence() {
                        continue;
                    }
                    let Some(file) = row.file(header) else { continue };
                    let Some(path) = render_file(dwarf, &unit, header, file) else {
                        continue;
                    };
                    let Some(line) = row.line() else { continue };
                    push(format!("{path}:{line}"));
                }
            }
        }
    }
    Ok(found)
}

/// Joins directory, file name, and the unit's comp_dir into one path.
fn render_file(
    dwarf: &gimli::Dwarf<Reader<'_>>,
    unit: &gimli::Unit<Reader<'_>>,
    header: &gimli::LineProgramHeader<Reader<'_>>,
    file: &gimli::FileEntry<Reader<'_>>,
) -> Option<String> {
    let mut path = PathBuf::new();
    if let Some(dir_attr) = file.directory(header) {
        if let Ok(dir) = dwarf.attr_string(unit, dir_attr) {
            path.push(dir.to_string_lossy().as_ref());
        }
    }
    let name = dwarf.attr_string(unit, file.path_name()).ok()?;
    path.push(name.to_string_lossy().as_ref());

    if path.is_relative() {
        if let Some(comp_dir) = &unit.comp_dir {
            path = PathBuf::from(comp_dir.to_string_lossy().as_ref()).join(path);
        }
    }
    Some(path.to_string_lossy().into_owned())
}
