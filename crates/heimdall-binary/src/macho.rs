//! Mach-O load-command walk: linked dylibs, install name, UUID.

use crate::{BinaryError, Result};
use object::macho;
use object::read::macho::{LoadCommandVariant, MachHeader, MachOFatFile32, MachOFatFile64};
use object::{BigEndian, Endianness, FileKind};

/// Facts recovered from Mach-O load commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachOInfo {
    /// Install names from `LC_LOAD_DYLIB`/`LC_LOAD_WEAK_DYLIB`/
    /// `LC_REEXPORT_DYLIB`, in command order.
    pub dylibs: Vec<String>,
    /// `LC_ID_DYLIB` install name (the library itself, not a dependency).
    pub install_name: Option<String>,
    /// `current_version` from `LC_ID_DYLIB`, rendered `X.Y.Z`.
    pub current_version: Option<String>,
    /// `LC_UUID`, lowercase hex.
    pub uuid: Option<String>,
}

/// The first architecture slice of a fat/universal file, or `None` when
/// `data` is not fat.
pub(crate) fn first_arch_slice(data: &[u8]) -> Result<Option<&[u8]>> {
    let (offset, size) = match FileKind::parse(data)? {
        FileKind::MachOFat32 => {
            let file = MachOFatFile32::parse(data)?;
            let arch = file
                .arches()
                .first()
                .ok_or(BinaryError::Truncated("fat Mach-O header"))?;
            (
                arch.offset.get(BigEndian) as usize,
                arch.size.get(BigEndian) as usize,
            )
        }
        FileKind::MachOFat64 => {
            let file = MachOFatFile64::parse(data)?;
            let arch = file
                .arches()
                .first()
                .ok_or(BinaryError::Truncated("fat Mach-O header"))?;
            (
                arch.offset.get(BigEndian) as usize,
                arch.size.get(BigEndian) as usize,
            )
        }
        _ => return Ok(None),
    };
    data.get(offset..offset + size)
        .map(Some)
        .ok_or(BinaryError::Truncated("fat Mach-O slice"))
}

/// Walks the load commands of `data`. Fat/universal files are read through
/// their first architecture slice.
pub fn load_command_info(data: &[u8]) -> Result<MachOInfo> {
    if let Some(slice) = first_arch_slice(data)? {
        return load_command_info(slice);
    }
    match FileKind::parse(data)? {
        FileKind::MachO32 => walk::<macho::MachHeader32<Endianness>>(data),
        FileKind::MachO64 => walk::<macho::MachHeader64<Endianness>>(data),
        _ => Err(BinaryError::NotThisFormat("Mach-O")),
    }
}

fn walk<Mach: MachHeader<Endian = Endianness>>(data: &[u8]) -> Result<MachOInfo> {
    let header = Mach::parse(data, 0)?;
    let endian = header.endian()?;
    let mut commands = header.load_commands(endian, data, 0)?;

    let mut info = MachOInfo::default();
    while let Some(command) = commands.next()? {
        match command.variant()? {
            LoadCommandVariant::Dylib(dylib) => {
                let Ok(name) = command.string(endian, dylib.dylib.name) else {
                    continue;
                };
                let name = String::from_utf8_lossy(name).into_owned();
                match command.cmd() {
                    macho::LC_ID_DYLIB => {
                        info.current_version =
                            Some(format_dylib_version(dylib.dylib.current_version.get(endian)));
                        info.install_name = Some(name);
                    }
                    macho::LC_LOAD_DYLIB
                    | macho::LC_LOAD_WEAK_DYLIB
                    | macho::LC_REEXPORT_DYLIB => {
                        if !info.dylibs.contains(&name) {
                            info.dylibs.push(name);
                        }
                    }
                    _ => {}
                }
            }
            LoadCommandVariant::Uuid(uuid) => {
                info.uuid = Some(hex::encode(uuid.uuid));
            }
            _ => {}
        }
    }
    Ok(info)
}

/// Mach-O packs dylib versions as `xxxx.yy.zz` in a 32-bit word.
fn format_dylib_version(raw: u32) -> String {
    format!("{}.{}.{}", raw >> 16, (raw >> 8) & 0xff, raw & 0xff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dylib_version_packing() {
        assert_eq!(format_dylib_version(0x0003_0200), "3.2.0");
        assert_eq!(format_dylib_version(0x0001_0000), "1.0.0");
        assert_eq!(format_dylib_version(0x0100_050a), "256.5.10");
    }

    #[test]
    fn test_non_macho_is_not_this_format() {
        let err = load_command_info(b"\x7fELF\x02\x01\x01\x00").unwrap_err();
        assert!(matches!(err, BinaryError::NotThisFormat("Mach-O")));
    }

    #[test]
    fn test_macho_object_without_dylib_commands() {
        let mut obj = object::write::Object::new(
            object::BinaryFormat::MachO,
            object::Architecture::X86_64,
            object::Endianness::Little,
        );
        let text = obj.add_section(
            b"__TEXT".to_vec(),
            b"__text".to_vec(),
            object::SectionKind::Text,
        );
        obj.append_section_data(text, &[0xc3], 1);
        let data = obj.write().unwrap();

        let info = load_command_info(&data).unwrap();
        assert!(info.dylibs.is_empty());
        assert!(info.install_name.is_none());
    }
}
