//! Format dispatch and the generic object walk.
//!
//! `ObjectReader` owns the file bytes and parses on demand, so the public
//! API stays lifetime-free. Symbols and sections are read through the
//! generic `object::Object` traits for every container; only dependencies
//! and identity data (build id, dylib versions) need per-format paths.

use crate::{archive, classify, elf, macho, pe, BinaryError, BinaryFormat, Result};
use heimdall_model::{ComponentInfo, FileType, SectionInfo, SymbolInfo};
use object::{Object, ObjectKind, ObjectSection, ObjectSymbol, SectionFlags, SymbolKind};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An owning reader over one input file.
pub struct ObjectReader {
    path: PathBuf,
    data: Vec<u8>,
    format: BinaryFormat,
}

impl ObjectReader {
    /// Reads `path` into memory and classifies it by magic bytes.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let format = classify::classify_bytes(&data);
        Ok(Self {
            path: path.to_path_buf(),
            data,
            format,
        })
    }

    pub fn format(&self) -> BinaryFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn parse(&self) -> Result<object::File<'_>> {
        // Fat Mach-O files are read through their first architecture slice.
        let data = if self.format == BinaryFormat::MachO {
            macho::first_arch_slice(&self.data)?.unwrap_or(&self.data)
        } else {
            &self.data
        };
        object::File::parse(data).map_err(BinaryError::from)
    }

    /// Walks the symbol table: `.symtab` first, `.dynsym` as fallback for
    /// stripped ELF binaries; `LC_SYMTAB` for Mach-O; the COFF table for PE;
    /// the union of member tables for archives.
    pub fn extract_symbols(&self) -> Result<Vec<SymbolInfo>> {
        match self.format {
            BinaryFormat::Unknown => Err(BinaryError::NotThisFormat("object")),
            BinaryFormat::Archive => archive::union_symbols(&self.data),
            BinaryFormat::Elf => Ok(elf::symbols(&self.data)?.0),
            _ => {
                let file = self.parse()?;
                Ok(symbols_from(&file).0)
            }
        }
    }

    /// Section headers with flags preserved verbatim from the container.
    /// Archives have no sections of their own.
    pub fn extract_sections(&self) -> Result<Vec<SectionInfo>> {
        match self.format {
            BinaryFormat::Unknown => Err(BinaryError::NotThisFormat("object")),
            BinaryFormat::Archive => Ok(Vec::new()),
            _ => {
                let file = self.parse()?;
                Ok(sections_from(&file))
            }
        }
    }

    /// Dynamic dependency tokens in file order:
    /// `DT_NEEDED` (ELF), load-command install names (Mach-O), imported DLL
    /// names (PE). Archives carry no link-time dependency list.
    pub fn extract_dependencies(&self) -> Result<Vec<String>> {
        match self.format {
            BinaryFormat::Elf => Ok(elf::dynamic_info(&self.data)?.needed),
            BinaryFormat::MachO => Ok(macho::load_command_info(&self.data)?.dylibs),
            BinaryFormat::Pe => {
                let file = self.parse()?;
                pe::imported_dlls(&file)
            }
            BinaryFormat::Archive => Ok(Vec::new()),
            BinaryFormat::Unknown => Err(BinaryError::NotThisFormat("object")),
        }
    }

    /// Build ID (ELF) or UUID (Mach-O), lowercase hex.
    pub fn extract_build_id(&self) -> Result<Option<String>> {
        match self.format {
            BinaryFormat::Elf => {
                let file = self.parse()?;
                Ok(file.build_id()?.map(hex::encode))
            }
            BinaryFormat::MachO => Ok(macho::load_command_info(&self.data)?.uuid),
            BinaryFormat::Pe | BinaryFormat::Archive => Ok(None),
            BinaryFormat::Unknown => Err(BinaryError::NotThisFormat("object")),
        }
    }

    /// Embedded version string, where the container records one. Only
    /// Mach-O dylibs carry this (`LC_ID_DYLIB` current_version); PE version
    /// resources are not read.
    pub fn extract_version(&self) -> Result<Option<String>> {
        match self.format {
            BinaryFormat::MachO => Ok(macho::load_command_info(&self.data)?.current_version),
            BinaryFormat::Unknown => Err(BinaryError::NotThisFormat("object")),
            _ => Ok(None),
        }
    }

    /// `DT_RPATH`/`DT_RUNPATH` entries of an ELF binary, for the resolver.
    pub fn rpaths(&self) -> Vec<String> {
        if self.format != BinaryFormat::Elf {
            return Vec::new();
        }
        elf::dynamic_info(&self.data)
            .map(|info| info.rpaths)
            .unwrap_or_default()
    }

    /// Runs every extraction against `component`.
    ///
    /// An `Unknown` file is recorded as processed with no object evidence; a
    /// recognised format that fails to parse propagates the error so the
    /// dispatch layer can log it and leave `was_processed` unset.
    pub fn populate(&self, component: &mut ComponentInfo) -> Result<()> {
        if self.format == BinaryFormat::Unknown {
            component.was_processed = true;
            return Ok(());
        }

        if self.format == BinaryFormat::Archive {
            component.file_type = FileType::StaticLibrary;
            for symbol in archive::union_symbols(&self.data)? {
                component.add_symbol(symbol);
            }
            for (i, member) in archive::member_names(&self.data)?.iter().enumerate() {
                component.set_property(format!("archive.member.{i}"), member.clone());
            }
            component.was_processed = true;
            return Ok(());
        }

        let file = self.parse()?;

        component.file_type = match file.kind() {
            ObjectKind::Relocatable => FileType::Object,
            ObjectKind::Dynamic => FileType::SharedLibrary,
            ObjectKind::Executable => FileType::Executable,
            _ => FileType::Unknown,
        };

        let (symbols, from_dynamic) = match self.format {
            BinaryFormat::Elf => elf::symbols(&self.data)?,
            _ => symbols_from(&file),
        };
        component.is_stripped = from_dynamic
            && matches!(file.kind(), ObjectKind::Executable | ObjectKind::Dynamic);
        for symbol in symbols {
            component.add_symbol(symbol);
        }

        let sections = sections_from(&file);
        component.contains_debug_info = sections.iter().any(|s| {
            s.name.starts_with(".debug_")
                || s.name.starts_with(".zdebug_")
                || s.name.starts_with("__debug_")
        });
        for section in sections {
            component.add_section(section);
        }

        drop(file);

        for dep in self.extract_dependencies()? {
            component.add_dependency(dep);
        }
        if let Some(build_id) = self.extract_build_id()? {
            component.set_property("build.id", build_id);
        }
        if component.version.is_empty() {
            if let Some(version) = self.extract_version()? {
                component.version = version;
            }
        }

        component.was_processed = true;
        debug!(
            path = %self.path.display(),
            format = %self.format,
            symbols = component.symbols.len(),
            sections = component.sections.len(),
            "extracted object metadata"
        );
        Ok(())
    }
}

/// Symbol table of `file`. Falls back to the dynamic table when the regular
/// one is empty; the second value reports whether the fallback was taken.
pub(crate) fn symbols_from(file: &object::File<'_>) -> (Vec<SymbolInfo>, bool) {
    let regular: Vec<SymbolInfo> = file.symbols().filter_map(convert_symbol).collect();
    if !regular.is_empty() {
        return (regular, false);
    }
    let dynamic: Vec<SymbolInfo> = file.dynamic_symbols().filter_map(convert_symbol).collect();
    (dynamic, true)
}

fn convert_symbol<'data, 'file>(
    symbol: object::Symbol<'data, 'file>,
) -> Option<SymbolInfo> {
    if matches!(symbol.kind(), SymbolKind::Section | SymbolKind::File) {
        return None;
    }
    let name = symbol.name().ok()?;
    if name.is_empty() {
        return None;
    }
    let binding = if symbol.is_weak() {
        "weak"
    } else if symbol.is_global() {
        "global"
    } else {
        "local"
    };
    let visibility = match symbol.scope() {
        object::SymbolScope::Compilation => "compilation",
        object::SymbolScope::Linkage => "linkage",
        object::SymbolScope::Dynamic => "dynamic",
        object::SymbolScope::Unknown => "unknown",
    };
    Some(SymbolInfo {
        name: name.to_string(),
        address: symbol.address(),
        size: symbol.size(),
        binding: binding.to_string(),
        visibility: visibility.to_string(),
        defined: !symbol.is_undefined(),
    })
}

pub(crate) fn sections_from(file: &object::File<'_>) -> Vec<SectionInfo> {
    file.sections()
        .filter_map(|section| {
            let name = section.name().ok()?;
            if name.is_empty() {
                return None;
            }
            let flags = match section.flags() {
                SectionFlags::Elf { sh_flags } => sh_flags,
                SectionFlags::MachO { flags } => flags as u64,
                SectionFlags::Coff { characteristics } => characteristics as u64,
                _ => 0,
            };
            Some(SectionInfo {
                name: name.to_string(),
                address: section.address(),
                size: section.size(),
                flags,
            })
        })
        .collect()
}
