use stemcube_core::{
    BinningFactor, MetadataCategory, MetadataRecord, MetadataSchema, MetadataTree, OriginalMetadata,
    ReductionPlan,
};

#[test]
fn test_schema_from_json_keeps_missing_categories() {
    let schema: MetadataSchema = serde_json::from_str(
        r#"{"sample": [{"name": "grid", "candidates": ["grid_id"]}, {"name": "notes"}]}"#,
    )
    .unwrap();
    assert_eq!(schema.fields(MetadataCategory::Sample).len(), 2);
    assert!(schema.fields(MetadataCategory::Sample)[1].candidates.is_empty());
    assert_eq!(schema.microscope, MetadataSchema::default().microscope);
}

#[test]
fn test_plan_rejects_fractional_factor() {
    let err = serde_json::from_str::<ReductionPlan>(r#"{"bin_q": 2.5}"#).unwrap_err();
    assert!(err.to_string().contains("binning factor"));

    let plan: ReductionPlan = serde_json::from_str(
        r#"{"bin_q": 2, "bin_r": 1.0, "crop_real": {"rows": {"start": 0, "end": 4}, "cols": {"start": 1, "end": 3}}}"#,
    )
    .unwrap();
    assert_eq!(plan.bin_q, BinningFactor::new(2));
    assert!(plan.bin_r.is_identity());
    assert_eq!(plan.crop_real.unwrap().shape(), (4, 2));
}

#[test]
fn test_record_serializes_in_field_order() {
    let tree = MetadataTree::new().with_leaf("beam_energy", 300);
    let record = MetadataRecord::resolve(
        OriginalMetadata::new(Some(tree), None),
        &MetadataSchema::default(),
    )
    .unwrap();
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["microscope"]["accelerating_voltage_kV"], 300);
    assert_eq!(json["sample"]["sample_metadata_1"], "");
    assert!(json.get("original").is_none());
}
