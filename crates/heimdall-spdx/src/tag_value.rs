//! SPDX 2.3 tag-value rendering.

use crate::{ids::spdx_ref, license_or_noassertion, Error, SpdxDocumentInfo};
use heimdall_model::{paths, ComponentInfo, ComponentStore};
use std::fmt::Write as _;
use std::io::Write;

pub fn write<W: Write>(
    store: &ComponentStore,
    info: &SpdxDocumentInfo,
    writer: &mut W,
) -> Result<(), Error> {
    let mut doc = String::new();
    let target = &info.build_info.target_name;
    let build_id = &info.build_info.build_id;

    let _ = writeln!(doc, "SPDXVersion: SPDX-2.3");
    let _ = writeln!(doc, "DataLicense: CC0-1.0");
    let _ = writeln!(doc, "SPDXID: SPDXRef-DOCUMENT");
    let _ = writeln!(doc, "DocumentName: {}", info.document_name());
    let _ = writeln!(doc, "DocumentNamespace: {}", info.namespace());
    let _ = writeln!(doc, "Creator: Tool: {}", info.creator());
    let _ = writeln!(doc, "Created: {}", info.created);
    doc.push('\n');

    let or_unknown = |s: &str| if s.is_empty() { "Unknown".to_string() } else { s.to_string() };
    let _ = writeln!(doc, "PackageName: {}", or_unknown(target));
    let _ = writeln!(doc, "SPDXID: SPDXRef-Package");
    let _ = writeln!(doc, "PackageVersion: {}", or_unknown(build_id));
    let _ = writeln!(doc, "PackageFileName: {}", or_unknown(target));
    let _ = writeln!(doc, "PackageDownloadLocation: NOASSERTION");
    let _ = writeln!(doc, "FilesAnalyzed: true");
    let _ = writeln!(doc, "PackageVerificationCode: {}", info.verification_code);
    let _ = writeln!(doc, "PackageLicenseConcluded: NOASSERTION");
    let _ = writeln!(doc, "PackageLicenseInfoFromFiles: NOASSERTION");
    let _ = writeln!(doc, "PackageLicenseDeclared: NOASSERTION");
    let _ = writeln!(doc, "PackageCopyrightText: NOASSERTION");
    let _ = writeln!(
        doc,
        "PackageDescription: Software Bill of Materials generated by Heimdall"
    );
    doc.push('\n');

    for component in store.iter() {
        render_file_block(&mut doc, component);
        doc.push('\n');
    }

    for component in store.iter() {
        let _ = writeln!(
            doc,
            "Relationship: SPDXRef-Package CONTAINS {}",
            spdx_ref(&component.name)
        );
    }

    // LF endings, no trailing blank lines.
    writer.write_all(doc.trim_end_matches('\n').as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn render_file_block(doc: &mut String, component: &ComponentInfo) {
    let sha1 = component
        .properties
        .get("hash.sha1")
        .cloned()
        .unwrap_or_default();
    let license = license_or_noassertion(&component.license);

    let _ = writeln!(doc, "FileName: {}", paths::file_name(&component.file_path));
    let _ = writeln!(doc, "SPDXID: {}", spdx_ref(&component.name));
    let _ = writeln!(doc, "FileType: {}", component.file_type.spdx_2_3());
    let _ = writeln!(
        doc,
        "FileChecksum: SHA1: {}",
        if sha1.is_empty() { "UNKNOWN" } else { sha1.as_str() }
    );
    let _ = writeln!(
        doc,
        "FileChecksum: SHA256: {}",
        if component.checksum.is_empty() {
            "UNKNOWN"
        } else {
            component.checksum.as_str()
        }
    );
    let _ = writeln!(doc, "LicenseConcluded: {license}");
    let _ = writeln!(doc, "LicenseInfoInFile: {license}");
    let _ = writeln!(doc, "FileCopyrightText: NOASSERTION");
    let _ = writeln!(doc, "FileComment: {}", file_comment(component));
}

/// Source-file and property evidence, or a file-type fallback when neither
/// exists.
fn file_comment(component: &ComponentInfo) -> String {
    let mut comment = String::new();
    if !component.source_files.is_empty() {
        comment.push_str("Source files: ");
        let files: Vec<&str> = component.source_files.iter().map(String::as_str).collect();
        comment.push_str(&files.join(", "));
    }
    if !component.properties.is_empty() {
        if !comment.is_empty() {
            comment.push_str("; ");
        }
        comment.push_str("Enhanced metadata: ");
        let pairs: Vec<String> = component
            .properties
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        comment.push_str(&pairs.join(", "));
    }
    if comment.is_empty() {
        comment = format!("{} file", component.file_type.describe());
    }
    comment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SpdxVersion;
    use heimdall_model::{BuildInfo, FileType};
    use regex::Regex;

    fn sample_store() -> ComponentStore {
        let mut store = ComponentStore::new();

        let mut archive = ComponentInfo::from_path("/build/libutils.a");
        archive.file_type = FileType::StaticLibrary;
        archive.checksum = "ab".repeat(32);
        archive.set_property("hash.sha1", "cd".repeat(20));
        store.enrol(archive).unwrap();

        let mut lib = ComponentInfo::from_path("/usr/lib/lib_foo++.so.1");
        lib.file_type = FileType::SharedLibrary;
        lib.license = "Apache-2.0".into();
        lib.add_source_file("/src/foo.c");
        store.enrol(lib).unwrap();

        store
    }

    fn render(store: &ComponentStore) -> String {
        let info = SpdxDocumentInfo {
            created: "2025-03-01T10:00:00Z".into(),
            tool_version: "2.0.0".into(),
            build_info: BuildInfo {
                target_name: "app".into(),
                build_id: "42".into(),
            },
            verification_code: "d6a770ba38583ed4bb4525bd96e50461655d2758".into(),
        };
        let writer = crate::SpdxWriter::new(SpdxVersion::V2_3, info);
        let mut out = Vec::new();
        writer.write(store, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_document_header_and_package_block() {
        let doc = render(&sample_store());
        assert!(doc.starts_with("SPDXVersion: SPDX-2.3\n"));
        assert!(doc.contains("DataLicense: CC0-1.0\n"));
        assert!(doc.contains("DocumentName: app\n"));
        assert!(doc.contains(
            "DocumentNamespace: https://spdx.org/spdxdocs/heimdall-2025-03-01T10:00:00Z\n"
        ));
        assert!(doc.contains("Creator: Tool: Heimdall SBOM Generator-2.0.0\n"));
        assert!(doc.contains("PackageName: app\n"));
        assert!(doc
            .contains("PackageVerificationCode: d6a770ba38583ed4bb4525bd96e50461655d2758\n"));
    }

    #[test]
    fn test_one_file_block_per_component() {
        let doc = render(&sample_store());
        assert_eq!(doc.matches("FileName: ").count(), 2);
        assert_eq!(doc.matches("FileName: libutils.a\n").count(), 1);
        assert!(doc.contains("FileType: ARCHIVE\n"));
        assert!(doc.contains("FileType: BINARY\n"));
    }

    #[test]
    fn test_spdx_ids_are_conformant_and_sanitised() {
        let doc = render(&sample_store());
        assert!(doc.contains("SPDXID: SPDXRef-lib-foo+-so-1\n"));

        let id_re = Regex::new(r"^SPDXID: SPDXRef-[A-Za-z0-9+.-]+$").unwrap();
        for line in doc.lines().filter(|l| l.starts_with("SPDXID: ")) {
            assert!(id_re.is_match(line), "bad id line: {line}");
            let id = line.strip_prefix("SPDXID: SPDXRef-").unwrap();
            assert!(!id.contains('_'), "underscore in {line}");
            assert!(!id.contains('.'), "dot in {line}");
        }
    }

    #[test]
    fn test_checksums_and_unknown_fallbacks() {
        let doc = render(&sample_store());
        assert!(doc.contains(&format!("FileChecksum: SHA256: {}\n", "ab".repeat(32))));
        assert!(doc.contains(&format!("FileChecksum: SHA1: {}\n", "cd".repeat(20))));
        // The shared library has neither digest recorded.
        assert!(doc.contains("FileChecksum: SHA256: UNKNOWN\n"));
        assert!(doc.contains("FileChecksum: SHA1: UNKNOWN\n"));
    }

    #[test]
    fn test_relationships_per_component() {
        let doc = render(&sample_store());
        assert!(doc.contains("Relationship: SPDXRef-Package CONTAINS SPDXRef-libutils-a\n"));
        assert!(doc.contains("Relationship: SPDXRef-Package CONTAINS SPDXRef-lib-foo+-so-1\n"));
    }

    #[test]
    fn test_source_files_appear_in_comment() {
        let doc = render(&sample_store());
        assert!(doc.contains("FileComment: Source files: /src/foo.c"));
    }

    #[test]
    fn test_no_trailing_blank_lines() {
        let doc = render(&sample_store());
        assert!(doc.ends_with('\n'));
        assert!(!doc.ends_with("\n\n"));
    }

    #[test]
    fn test_empty_store_still_has_package_block() {
        let doc = render(&ComponentStore::new());
        assert!(doc.contains("PackageName: app\n"));
        assert!(!doc.contains("FileName: "));
        assert!(!doc.ends_with("\n\n"));
    }
}
