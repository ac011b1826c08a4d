#![allow(clippy::cast_precision_loss)]
use std::io::Write;

use approx::assert_relative_eq;
use stemcube_core::{MetadataCategory, MetadataValue, OriginalMetadata};
use stemcube_io::{read_metadata_tree, read_reduction_plan, read_schema, Error, RawCubeReader, RawDtype};
use tempfile::NamedTempFile;

fn temp_with(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

fn f32_ramp(n: usize) -> NamedTempFile {
    let bytes: Vec<u8> = (0..n).flat_map(|i| (i as f32).to_le_bytes()).collect();
    temp_with(&bytes)
}

#[test]
fn test_raw_cube_with_json_metadata() {
    let raw = f32_ramp(2 * 3 * 4 * 4);
    let full = temp_with(
        br#"{"Acquisition": {"Microscope": {"beam_energy": 200, "camera_length": 80}},
             "original_filename": "scan_0042.dm4"}"#,
    );
    let shortlist = temp_with(br#"{"beam_energy": 300}"#);

    let original = OriginalMetadata::new(
        Some(read_metadata_tree(full.path()).unwrap()),
        Some(read_metadata_tree(shortlist.path()).unwrap()),
    );
    let reader = RawCubeReader::open(raw.path(), RawDtype::F32).unwrap();
    let cube = reader.read_cube((2, 3), (4, 4), original).unwrap();

    assert_eq!(cube.scan_shape(), (2, 3));
    assert_eq!(cube.filename(), Some(raw.path()));
    let n = (2 * 3 * 4 * 4) as f64;
    assert_relative_eq!(cube.total_intensity(), n * (n - 1.0) / 2.0);

    let metadata = cube.metadata();
    assert_eq!(
        metadata.get(MetadataCategory::Microscope, "accelerating_voltage_kV"),
        Some(&MetadataValue::from(300))
    );
    assert_eq!(
        metadata.get(MetadataCategory::Microscope, "camera_length_mm"),
        Some(&MetadataValue::from(80))
    );
    assert_eq!(
        metadata.get(MetadataCategory::Processing, "original_filename"),
        Some(&MetadataValue::from("scan_0042.dm4"))
    );
}

#[test]
fn test_raw_cube_shape_mismatch() {
    let raw = f32_ramp(30);
    let reader = RawCubeReader::open(raw.path(), RawDtype::F32).unwrap();
    let err = reader.read_cube((2, 2), (2, 2), OriginalMetadata::default()).unwrap_err();
    assert!(matches!(err, Error::CoreError(stemcube_core::Error::ShapeMismatch { .. })));
}

#[test]
fn test_document_order_decides_first_match() {
    let file = temp_with(br#"{"b": {"beam_energy": 120}, "a": {"beam_energy": 80}}"#);
    let tree = read_metadata_tree(file.path()).unwrap();
    assert_eq!(tree.search("beam_energy").unwrap(), Some(&MetadataValue::from(120)));
}

#[test]
fn test_schema_and_plan_files() {
    let schema_file = temp_with(br#"{"user": [{"name": "operator", "candidates": ["user_name"]}]}"#);
    let schema = read_schema(schema_file.path()).unwrap();
    assert_eq!(schema.fields(MetadataCategory::User).len(), 1);

    let plan_file = temp_with(br#"{"bin_q": 4, "crop_diffraction": {"rows": {"start": 0, "end": 8}, "cols": {"start": 0, "end": 8}}}"#);
    let plan = read_reduction_plan(plan_file.path()).unwrap();
    assert_eq!(plan.bin_q.get(), 4);
    assert!(plan.bin_r.is_identity());

    let bad_plan = temp_with(br#"{"bin_r": 1.5}"#);
    assert!(matches!(read_reduction_plan(bad_plan.path()), Err(Error::Json(_))));
}
