//! Low-level ELF walks.
//!
//! The generic `object` API covers sections; symbol bindings/visibility and
//! the dynamic table (`DT_NEEDED`, `DT_SONAME`, `DT_RPATH`/`DT_RUNPATH`)
//! need the typed ELF view.

use crate::{BinaryError, Result};
use heimdall_model::SymbolInfo;
use object::elf;
use object::read::elf::{Dyn, FileHeader, SectionHeader, Sym};
use object::read::SectionIndex;
use object::{Endianness, FileKind};

/// Dynamic-table facts recovered from an ELF binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElfDynamicInfo {
    /// `DT_NEEDED` entries in file order.
    pub needed: Vec<String>,
    pub soname: Option<String>,
    /// `DT_RPATH`/`DT_RUNPATH` entries, split on `:`.
    pub rpaths: Vec<String>,
}

/// Walks the dynamic section of `data`. Objects without one (relocatable
/// files, statically linked executables) yield an empty record.
pub fn dynamic_info(data: &[u8]) -> Result<ElfDynamicInfo> {
    match FileKind::parse(data)? {
        FileKind::Elf32 => walk::<elf::FileHeader32<Endianness>>(data),
        FileKind::Elf64 => walk::<elf::FileHeader64<Endianness>>(data),
        _ => Err(BinaryError::NotThisFormat("ELF")),
    }
}

/// Symbol table walk with ELF-native bindings and visibility.
///
/// Prefers `.symtab`; falls back to `.dynsym` for stripped binaries. The
/// second value reports whether the fallback was taken.
pub fn symbols(data: &[u8]) -> Result<(Vec<SymbolInfo>, bool)> {
    match FileKind::parse(data)? {
        FileKind::Elf32 => walk_symbols::<elf::FileHeader32<Endianness>>(data),
        FileKind::Elf64 => walk_symbols::<elf::FileHeader64<Endianness>>(data),
        _ => Err(BinaryError::NotThisFormat("ELF")),
    }
}

fn walk_symbols<Elf: FileHeader<Endian = Endianness>>(
    data: &[u8],
) -> Result<(Vec<SymbolInfo>, bool)> {
    let header = Elf::parse(data)?;
    let endian = header.endian()?;
    let sections = header.sections(endian, data)?;

    let from_table = |wanted: u32| -> Result<Vec<SymbolInfo>> {
        let mut out = Vec::new();
        for (index, section) in sections.iter().enumerate() {
            if section.sh_type(endian) != wanted {
                continue;
            }
            let Some(table) = section.symbols(endian, data, &sections, SectionIndex(index))? else {
                continue;
            };
            let strings = table.strings();
            for symbol in table.iter() {
                if matches!(symbol.st_type(), elf::STT_SECTION | elf::STT_FILE) {
                    continue;
                }
                let Ok(name) = symbol.name(endian, strings) else {
                    continue;
                };
                if name.is_empty() {
                    continue;
                }
                let binding = match symbol.st_bind() {
                    elf::STB_WEAK => "weak",
                    elf::STB_GLOBAL => "global",
                    _ => "local",
                };
                let visibility = match symbol.st_visibility() {
                    elf::STV_INTERNAL => "internal",
                    elf::STV_HIDDEN => "hidden",
                    elf::STV_PROTECTED => "protected",
                    _ => "default",
                };
                out.push(SymbolInfo {
                    name: String::from_utf8_lossy(name).into_owned(),
                    address: symbol.st_value(endian).into(),
                    size: symbol.st_size(endian).into(),
                    binding: binding.to_string(),
                    visibility: visibility.to_string(),
                    defined: symbol.st_shndx(endian) != elf::SHN_UNDEF,
                });
            }
        }
        Ok(out)
    };

    let regular = from_table(elf::SHT_SYMTAB)?;
    if !regular.is_empty() {
        return Ok((regular, false));
    }
    Ok((from_table(elf::SHT_DYNSYM)?, true))
}

fn walk<Elf: FileHeader<Endian = Endianness>>(data: &[u8]) -> Result<ElfDynamicInfo> {
    let header = Elf::parse(data)?;
    let endian = header.endian()?;
    let sections = header.sections(endian, data)?;

    let mut info = ElfDynamicInfo::default();
    for section in sections.iter() {
        let Some((entries, index)) = section.dynamic(endian, data)? else {
            continue;
        };
        let strings = sections.strings(endian, data, index).unwrap_or_default();

        for entry in entries {
            let tag = entry.tag32(endian);
            let Some(tag) = tag else { continue };
            if tag != elf::DT_NEEDED
                && tag != elf::DT_SONAME
                && tag != elf::DT_RPATH
                && tag != elf::DT_RUNPATH
            {
                continue;
            }
            let Ok(value) = entry.string(endian, strings) else {
                // Corrupt string offset: skip the entry, keep the rest.
                continue;
            };
            let value = String::from_utf8_lossy(value).into_owned();
            match tag {
                elf::DT_NEEDED => info.needed.push(value),
                elf::DT_SONAME => info.soname = Some(value),
                elf::DT_RPATH | elf::DT_RUNPATH => {
                    info.rpaths
                        .extend(value.split(':').filter(|s| !s.is_empty()).map(String::from));
                }
                _ => unreachable!(),
            }
        }
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_elf_is_not_this_format() {
        let err = dynamic_info(b"MZ\x90\x00\x03\x00\x00\x00").unwrap_err();
        assert!(matches!(err, BinaryError::NotThisFormat("ELF")));
    }

    #[test]
    fn test_relocatable_object_has_empty_dynamic_info() {
        // A relocatable object written by the object crate has no dynamic
        // section at all.
        let mut obj = object::write::Object::new(
            object::BinaryFormat::Elf,
            object::Architecture::X86_64,
            object::Endianness::Little,
        );
        let text = obj.add_section(Vec::new(), b".text".to_vec(), object::SectionKind::Text);
        obj.append_section_data(text, &[0xc3], 1);
        let data = obj.write().unwrap();

        let info = dynamic_info(&data).unwrap();
        assert!(info.needed.is_empty());
        assert!(info.soname.is_none());
        assert!(info.rpaths.is_empty());
    }

    #[test]
    fn test_symbol_walk_reports_binding_and_visibility() {
        use object::write::{Object as WriteObject, Symbol as WriteSymbol, SymbolSection};

        let mut obj = WriteObject::new(
            object::BinaryFormat::Elf,
            object::Architecture::X86_64,
            object::Endianness::Little,
        );
        let text = obj.add_section(Vec::new(), b".text".to_vec(), object::SectionKind::Text);
        obj.append_section_data(text, &[0x90, 0xc3], 1);
        obj.add_symbol(WriteSymbol {
            name: b"strong".to_vec(),
            value: 0,
            size: 1,
            kind: object::SymbolKind::Text,
            scope: object::SymbolScope::Dynamic,
            weak: false,
            section: SymbolSection::Section(text),
            flags: object::SymbolFlags::None,
        });
        obj.add_symbol(WriteSymbol {
            name: b"maybe".to_vec(),
            value: 1,
            size: 1,
            kind: object::SymbolKind::Text,
            scope: object::SymbolScope::Dynamic,
            weak: true,
            section: SymbolSection::Section(text),
            flags: object::SymbolFlags::None,
        });
        obj.add_symbol(WriteSymbol {
            name: b"external".to_vec(),
            value: 0,
            size: 0,
            kind: object::SymbolKind::Unknown,
            scope: object::SymbolScope::Dynamic,
            weak: false,
            section: SymbolSection::Undefined,
            flags: object::SymbolFlags::None,
        });
        let data = obj.write().unwrap();

        let (symbols, from_dynamic) = symbols(&data).unwrap();
        assert!(!from_dynamic);
        let by_name = |n: &str| symbols.iter().find(|s| s.name == n).unwrap();

        assert_eq!(by_name("strong").binding, "global");
        assert_eq!(by_name("strong").visibility, "default");
        assert!(by_name("strong").defined);

        assert_eq!(by_name("maybe").binding, "weak");
        assert!(!by_name("external").defined);
    }

    #[test]
    fn test_truncated_elf_is_malformed() {
        // Valid magic, garbage header.
        let mut data = b"\x7fELF\x02\x01\x01\x00".to_vec();
        data.extend_from_slice(&[0u8; 8]);
        assert!(dynamic_info(&data).is_err());
    }
}
