//! `ar` archive reading.
//!
//! Archives are collapsed into a single component: symbols are the union of
//! the member tables in stored order, and member names are kept as
//! properties. Members that are not object files are skipped silently.

use crate::{reader, Result};
use heimdall_model::SymbolInfo;
use object::read::archive::ArchiveFile;
use tracing::debug;

pub fn member_names(data: &[u8]) -> Result<Vec<String>> {
    let archive = ArchiveFile::parse(data)?;
    let mut names = Vec::new();
    for member in archive.members() {
        let Ok(member) = member else { continue };
        names.push(String::from_utf8_lossy(member.name()).into_owned());
    }
    Ok(names)
}

/// Union of the per-member symbol tables, members in stored order.
pub fn union_symbols(data: &[u8]) -> Result<Vec<SymbolInfo>> {
    let archive = ArchiveFile::parse(data)?;
    let mut symbols = Vec::new();
    for member in archive.members() {
        let Ok(member) = member else { continue };
        let Ok(member_data) = member.data(data) else {
            continue;
        };
        let Ok(file) = object::File::parse(member_data) else {
            debug!(
                member = %String::from_utf8_lossy(member.name()),
                "skipping non-object archive member"
            );
            continue;
        };
        for symbol in reader::symbols_from(&file).0 {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use object::write::{Object as WriteObject, Symbol as WriteSymbol, SymbolSection};

    fn object_with_symbol(name: &str) -> Vec<u8> {
        let mut obj = WriteObject::new(
            object::BinaryFormat::Elf,
            object::Architecture::X86_64,
            object::Endianness::Little,
        );
        let text = obj.add_section(Vec::new(), b".text".to_vec(), object::SectionKind::Text);
        obj.append_section_data(text, &[0xc3], 1);
        obj.add_symbol(WriteSymbol {
            name: name.as_bytes().to_vec(),
            value: 0,
            size: 1,
            kind: object::SymbolKind::Text,
            scope: object::SymbolScope::Linkage,
            weak: false,
            section: SymbolSection::Section(text),
            flags: object::SymbolFlags::None,
        });
        obj.write().unwrap()
    }

    /// Builds a classic `ar` archive: global header plus 60-byte member
    /// headers, data 2-byte aligned.
    pub(crate) fn build_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = b"!<arch>\n".to_vec();
        for (name, data) in members {
            let header = format!(
                "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
                name,
                0, // mtime
                0, // uid
                0, // gid
                "100644",
                data.len()
            );
            assert_eq!(header.len(), 60);
            out.extend_from_slice(header.as_bytes());
            out.extend_from_slice(data);
            if data.len() % 2 == 1 {
                out.push(b'\n');
            }
        }
        out
    }

    #[test]
    fn test_union_of_member_symbols_in_stored_order() {
        let a = object_with_symbol("foo");
        let b = object_with_symbol("bar");
        let archive = build_archive(&[("a.o", &a), ("b.o", &b)]);

        let symbols = union_symbols(&archive).unwrap();
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "bar"]);
    }

    #[test]
    fn test_non_object_members_skipped() {
        let a = object_with_symbol("foo");
        let archive = build_archive(&[("notes.txt", b"hello\n"), ("a.o", &a)]);

        let symbols = union_symbols(&archive).unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "foo");

        let names = member_names(&archive).unwrap();
        assert_eq!(names, vec!["notes.txt", "a.o"]);
    }

    #[test]
    fn test_empty_archive() {
        let archive = build_archive(&[]);
        assert!(union_symbols(&archive).unwrap().is_empty());
        assert!(member_names(&archive).unwrap().is_empty());
    }
}
