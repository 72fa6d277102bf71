#![doc = include_str!("../readme.md")]

use heimdall_model::{BuildInfo, ComponentInfo, ComponentStore};
use packageurl::PackageUrl;
use serde_json::{json, Value};
use std::io::Write;
use thiserror::Error;

/// Errors that can occur while writing a CycloneDX document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Supported CycloneDX specification versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycloneDxVersion {
    V1_4,
    #[default]
    V1_6,
}

impl CycloneDxVersion {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "1.4" => Some(CycloneDxVersion::V1_4),
            "1.6" => Some(CycloneDxVersion::V1_6),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CycloneDxVersion::V1_4 => "1.4",
            CycloneDxVersion::V1_6 => "1.6",
        }
    }
}

/// Document-level facts for the `metadata` block.
#[derive(Debug, Clone, Default)]
pub struct CycloneDxDocumentInfo {
    /// ISO-8601 UTC, millisecond precision, `Z` suffix.
    pub timestamp: String,
    pub tool_version: String,
    pub build_info: BuildInfo,
}

impl CycloneDxDocumentInfo {
    pub fn new(tool_version: impl Into<String>, build_info: BuildInfo) -> Self {
        Self {
            timestamp: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
            tool_version: tool_version.into(),
            build_info,
        }
    }
}

/// Renders a component store as a CycloneDX JSON document.
#[derive(Debug, Clone)]
pub struct CycloneDxWriter {
    pub version: CycloneDxVersion,
    pub info: CycloneDxDocumentInfo,
}

impl CycloneDxWriter {
    pub fn new(version: CycloneDxVersion, info: CycloneDxDocumentInfo) -> Self {
        Self { version, info }
    }

    /// Writes one complete document; components in store insertion order.
    pub fn write<W: Write>(&self, store: &ComponentStore, writer: &mut W) -> Result<(), Error> {
        fn or_unknown(s: &str) -> &str {
            if s.is_empty() {
                "Unknown"
            } else {
                s
            }
        }

        let components: Vec<Value> = store
            .iter()
            .map(|component| self.render_component(component))
            .collect();

        let document = json!({
            "bomFormat": "CycloneDX",
            "specVersion": self.version.as_str(),
            "version": 1,
            "metadata": {
                "timestamp": self.info.timestamp,
                "tools": [{
                    "vendor": "Heimdall",
                    "name": "SBOM Generator",
                    "version": self.info.tool_version,
                }],
                "component": {
                    "type": "application",
                    "name": or_unknown(&self.info.build_info.target_name),
                    "version": or_unknown(&self.info.build_info.build_id),
                },
            },
            "components": components,
        });

        serde_json::to_writer_pretty(&mut *writer, &document)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn render_component(&self, component: &ComponentInfo) -> Value {
        let version = display_version(component);
        let rendered = json!({
            "type": "library",
            "name": component.name,
            "version": version,
            "description": format!("{} component", component.file_type.describe()),
            "supplier": {
                "name": if component.supplier.is_empty() {
                    "system-package-manager"
                } else {
                    component.supplier.as_str()
                },
            },
            "hashes": [{
                "alg": "SHA-256",
                "content": if component.checksum.is_empty() {
                    "UNKNOWN"
                } else {
                    component.checksum.as_str()
                },
            }],
            "purl": purl(component),
            "externalReferences": [{
                "type": "distribution",
                "url": if component.download_location.is_empty() {
                    "NOASSERTION"
                } else {
                    component.download_location.as_str()
                },
            }],
        });

        let mut object = match rendered {
            Value::Object(object) => object,
            _ => serde_json::Map::new(),
        };

        if self.version == CycloneDxVersion::V1_6 {
            object.insert("properties".into(), properties_block(component));
            object.insert("evidence".into(), evidence_block(component));
        }

        // Debug-info evidence rides along in every version.
        if !component.source_files.is_empty() {
            object.insert(
                "sourceFiles".into(),
                json!(component.source_files.iter().collect::<Vec<_>>()),
            );
        }
        if !component.functions.is_empty() {
            object.insert(
                "functions".into(),
                json!(component.functions.iter().collect::<Vec<_>>()),
            );
        }
        if !component.compile_units.is_empty() {
            object.insert(
                "compileUnits".into(),
                json!(component.compile_units.iter().collect::<Vec<_>>()),
            );
        }

        Value::Object(object)
    }
}

fn display_version(component: &ComponentInfo) -> &str {
    if component.version.is_empty() {
        "UNKNOWN"
    } else {
        &component.version
    }
}

/// `pkg:<manager|generic>/<name>@<version>`.
fn purl(component: &ComponentInfo) -> String {
    let ty = if component.package_manager.is_empty() {
        "generic"
    } else {
        component.package_manager.as_str()
    };
    let version = display_version(component);
    match PackageUrl::new(ty.to_string(), component.name.clone()) {
        Ok(mut purl) => {
            purl.with_version(version.to_string());
            purl.to_string()
        }
        Err(_) => format!("pkg:{ty}/{}@{version}", component.name),
    }
}

/// Component properties in insertion order, then the debug/stripped/system
/// flags.
fn properties_block(component: &ComponentInfo) -> Value {
    let mut properties: Vec<Value> = component
        .properties
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();
    properties.push(json!({
        "name": "debug_info",
        "value": component.contains_debug_info.to_string(),
    }));
    properties.push(json!({
        "name": "stripped",
        "value": component.is_stripped.to_string(),
    }));
    properties.push(json!({
        "name": "system_library",
        "value": component.is_system_library.to_string(),
    }));
    Value::Array(properties)
}

fn evidence_block(component: &ComponentInfo) -> Value {
    let license = if component.license.is_empty() || component.license == "UNKNOWN" {
        "NOASSERTION"
    } else {
        component.license.as_str()
    };
    json!({
        "licenses": [{
            "license": { "id": license },
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use heimdall_model::FileType;
    use pretty_assertions::assert_eq;

    fn sample_store() -> ComponentStore {
        let mut store = ComponentStore::new();

        let mut exe = ComponentInfo::from_path("/build/app");
        exe.file_type = FileType::Executable;
        exe.checksum = "ab".repeat(32);
        exe.contains_debug_info = true;
        exe.add_source_file("/src/main.c");
        exe.functions.insert("main".to_string());
        exe.compile_units.insert("main.c".to_string());
        exe.set_property("build.id", "deadbeef");
        store.enrol(exe).unwrap();

        let mut lib = ComponentInfo::from_path("/usr/lib/libssl.so.3");
        lib.file_type = FileType::SharedLibrary;
        lib.version = "3.0.13".into();
        lib.license = "Apache-2.0".into();
        lib.is_system_library = true;
        lib.package_manager = "system".into();
        store.enrol(lib).unwrap();

        store
    }

    fn render(version: CycloneDxVersion) -> Value {
        let info = CycloneDxDocumentInfo {
            timestamp: "2025-03-01T10:00:00.123Z".into(),
            tool_version: "2.0.0".into(),
            build_info: BuildInfo {
                target_name: "app".into(),
                build_id: "42".into(),
            },
        };
        let writer = CycloneDxWriter::new(version, info);
        let mut out = Vec::new();
        writer.write(&sample_store(), &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_document_skeleton() {
        let doc = render(CycloneDxVersion::V1_6);
        assert_eq!(doc["bomFormat"], "CycloneDX");
        assert_eq!(doc["specVersion"], "1.6");
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["metadata"]["timestamp"], "2025-03-01T10:00:00.123Z");
        assert_eq!(doc["metadata"]["tools"][0]["vendor"], "Heimdall");
        assert_eq!(doc["metadata"]["tools"][0]["name"], "SBOM Generator");
        assert_eq!(doc["metadata"]["tools"][0]["version"], "2.0.0");
        assert_eq!(doc["metadata"]["component"]["name"], "app");
    }

    #[test]
    fn test_components_in_insertion_order() {
        let doc = render(CycloneDxVersion::V1_6);
        let components = doc["components"].as_array().unwrap();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0]["name"], "app");
        assert_eq!(components[1]["name"], "libssl.so.3");
        assert_eq!(components[0]["type"], "library");
    }

    #[test]
    fn test_hashes_and_version_fallback() {
        let doc = render(CycloneDxVersion::V1_6);
        let components = doc["components"].as_array().unwrap();
        assert_eq!(components[0]["hashes"][0]["alg"], "SHA-256");
        assert_eq!(components[0]["hashes"][0]["content"], "ab".repeat(32));
        assert_eq!(components[0]["version"], "UNKNOWN");
        assert_eq!(components[1]["hashes"][0]["content"], "UNKNOWN");
        assert_eq!(components[1]["version"], "3.0.13");
    }

    #[test]
    fn test_purl_uses_package_manager_type() {
        let doc = render(CycloneDxVersion::V1_6);
        let components = doc["components"].as_array().unwrap();
        assert_eq!(components[0]["purl"], "pkg:generic/app@UNKNOWN");
        assert_eq!(components[1]["purl"], "pkg:system/libssl.so.3@3.0.13");
    }

    #[test]
    fn test_evidence_and_properties_only_in_1_6() {
        let v16 = render(CycloneDxVersion::V1_6);
        let v14 = render(CycloneDxVersion::V1_4);

        let c16 = &v16["components"][1];
        assert_eq!(c16["evidence"]["licenses"][0]["license"]["id"], "Apache-2.0");
        let c14 = &v14["components"][1];
        assert!(c14.get("evidence").is_none());
        assert!(c14.get("properties").is_none());
    }

    #[test]
    fn test_properties_carry_flags_and_map_entries() {
        let doc = render(CycloneDxVersion::V1_6);
        let properties = doc["components"][0]["properties"].as_array().unwrap();
        let find = |name: &str| {
            properties
                .iter()
                .find(|p| p["name"] == name)
                .map(|p| p["value"].as_str().unwrap().to_string())
        };
        assert_eq!(find("build.id").unwrap(), "deadbeef");
        assert_eq!(find("debug_info").unwrap(), "true");
        assert_eq!(find("stripped").unwrap(), "false");
        assert_eq!(find("system_library").unwrap(), "false");
        // Map entries come before the flags.
        assert_eq!(properties[0]["name"], "build.id");
    }

    #[test]
    fn test_dwarf_arrays_emitted_in_all_versions() {
        for version in [CycloneDxVersion::V1_4, CycloneDxVersion::V1_6] {
            let doc = render(version);
            let exe = &doc["components"][0];
            assert_eq!(exe["sourceFiles"][0], "/src/main.c");
            assert_eq!(exe["functions"][0], "main");
            assert_eq!(exe["compileUnits"][0], "main.c");
            // No debug info on the shared library: no arrays at all.
            assert!(doc["components"][1].get("sourceFiles").is_none());
        }
    }

    #[test]
    fn test_version_parse() {
        assert_eq!(CycloneDxVersion::parse("1.4"), Some(CycloneDxVersion::V1_4));
        assert_eq!(CycloneDxVersion::parse("1.6"), Some(CycloneDxVersion::V1_6));
        assert_eq!(CycloneDxVersion::parse("1.5"), None);
    }
}
