use heimdall_model::{BuildInfo, ComponentInfo, ComponentStore, FileType};
use heimdall_spdx::{SpdxDocumentInfo, SpdxVersion, SpdxWriter};
use std::fs;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn golden_store() -> ComponentStore {
    let mut store = ComponentStore::new();

    let mut archive = ComponentInfo::from_path("/build/libutils.a");
    archive.file_type = FileType::StaticLibrary;
    archive.checksum = "a".repeat(64);
    archive.set_property("hash.sha1", "b".repeat(40));
    store.enrol(archive).unwrap();

    let mut object = ComponentInfo::from_path("/src/main.o");
    object.file_type = FileType::Object;
    object.checksum = "c".repeat(64);
    object.license = "MIT".to_string();
    object.add_source_file("/src/main.c");
    store.enrol(object).unwrap();

    store
}

#[test]
fn tag_value_golden_output_matches_fixture() {
    let info = SpdxDocumentInfo {
        created: "2025-03-01T10:00:00Z".to_string(),
        tool_version: "2.0.0".to_string(),
        build_info: BuildInfo {
            target_name: "app".to_string(),
            build_id: "42".to_string(),
        },
        verification_code: "d6a770ba38583ed4bb4525bd96e50461655d2758".to_string(),
    };

    let mut out = Vec::new();
    SpdxWriter::new(SpdxVersion::V2_3, info)
        .write(&golden_store(), &mut out)
        .expect("tag-value writer should succeed");

    let actual = String::from_utf8(out).expect("writer should emit utf-8");
    let expected = fs::read_to_string(fixture_path("golden.spdx"))
        .expect("golden snapshot should exist");

    assert_eq!(actual, expected);
}
