//! SPDX 3.0.x JSON-LD rendering.
//!
//! One `@graph` element holds the document, its files, packages, and
//! relationships. 3.0.0 and 3.0.1 differ in the context URL, the version
//! key, and the element type names.

use crate::{ids::spdx_ref, Error, SpdxDocumentInfo, SpdxVersion};
use heimdall_model::ComponentStore;
use serde_json::{json, Value};
use std::io::Write;

pub fn write<W: Write>(
    store: &ComponentStore,
    info: &SpdxDocumentInfo,
    version: SpdxVersion,
    writer: &mut W,
) -> Result<(), Error> {
    let (context, file_type, package_type) = match version {
        SpdxVersion::V3_0_1 => (
            "https://spdx.org/rdf/3.0.1/spdx-context.jsonld",
            "File",
            "Package",
        ),
        _ => (
            "https://spdx.org/rdf/3.0.0/spdx-context.jsonld",
            "software_File",
            "software_Package",
        ),
    };

    let files: Vec<Value> = store
        .iter()
        .map(|component| {
            json!({
                "@id": format!("spdx:{}", spdx_ref(&component.name)),
                "type": file_type,
                "fileName": component.file_path,
                "checksums": [{
                    "type": "Checksum",
                    "algorithm": "SHA256",
                    "checksumValue": if component.checksum.is_empty() {
                        "NOASSERTION"
                    } else {
                        component.checksum.as_str()
                    },
                }],
            })
        })
        .collect();

    let packages: Vec<Value> = store
        .iter()
        .map(|component| {
            json!({
                "@id": format!("spdx:{}", spdx_ref(&component.name)),
                "type": package_type,
                "name": component.name,
                "versionInfo": if component.version.is_empty() {
                    "NOASSERTION"
                } else {
                    component.version.as_str()
                },
            })
        })
        .collect();

    let relationships: Vec<Value> = store
        .iter()
        .map(|component| {
            json!({
                "type": "Relationship",
                "relationshipType": "CONTAINS",
                "relatedSpdxElement": format!("spdx:{}", spdx_ref(&component.name)),
            })
        })
        .collect();

    let mut document = json!({
        "spdxId": "spdx:SPDXRef-DOCUMENT",
        "type": "SpdxDocument",
        "name": info.document_name(),
        "documentNamespace": info.namespace(),
        "creationInfo": {
            "spdxId": "spdx:CreationInfo-1",
            "type": "CreationInfo",
            "created": info.created,
            "createdBy": [{
                "type": "Tool",
                "name": info.creator(),
            }],
        },
        "dataLicense": "CC0-1.0",
        "files": files,
        "packages": packages,
        "relationships": relationships,
    });

    // The version key itself changed between 3.0.0 and 3.0.1.
    if let Some(object) = document.as_object_mut() {
        match version {
            SpdxVersion::V3_0_1 => {
                object.insert("spdxVersion".into(), json!("SPDX-3.0.1"));
            }
            _ => {
                object.insert("specVersion".into(), json!("SPDX-3.0.0"));
            }
        }
    }

    let root = json!({
        "@context": context,
        "@graph": [document],
    });

    serde_json::to_writer_pretty(&mut *writer, &root)?;
    writer.write_all(b"\n")?;
    Ok(())
}
