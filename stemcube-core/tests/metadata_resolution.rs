use ndarray::Array4;
use stemcube_core::metadata::{resolve_category, search};
use stemcube_core::{
    DataCube, Error, FieldSpec, MetadataCategory, MetadataSchema, MetadataTree, MetadataValue,
    OriginalMetadata,
};

fn empty_data() -> Array4<f32> {
    Array4::zeros((2, 2, 2, 2))
}

#[test]
fn test_nested_key_resolves() {
    let tree = MetadataTree::new()
        .with_subtree("acquisition", MetadataTree::new().with_leaf("beam_energy", 200));
    let fields = vec![FieldSpec::new("accelerating_voltage_kV", &["beam_energy"])];
    let resolved = resolve_category(Some(&tree), &fields).unwrap();
    assert_eq!(resolved.get("accelerating_voltage_kV"), Some(&MetadataValue::from(200)));
}

#[test]
fn test_shortlist_wins_through_datacube() {
    let full = MetadataTree::new()
        .with_subtree("Microscope", MetadataTree::new().with_leaf("beam_energy", 200));
    let shortlist = MetadataTree::new().with_leaf("beam_energy", 300);
    let cube = DataCube::new(
        empty_data(),
        (2, 2),
        (2, 2),
        OriginalMetadata::new(Some(full), Some(shortlist)),
    )
    .unwrap();
    assert_eq!(
        cube.metadata().get(MetadataCategory::Microscope, "accelerating_voltage_kV"),
        Some(&MetadataValue::from(300))
    );
}

#[test]
fn test_full_tree_used_when_shortlist_absent() {
    let full = MetadataTree::new().with_leaf("camera_length", 150.5);
    let cube = DataCube::new(empty_data(), (2, 2), (2, 2), OriginalMetadata::new(Some(full), None)).unwrap();
    assert_eq!(
        cube.metadata().microscope.get("camera_length_mm"),
        Some(&MetadataValue::from(150.5))
    );
}

#[test]
fn test_placeholder_field_present_without_trees() {
    let schema = MetadataSchema::empty().with_field::<&str>(MetadataCategory::User, "operator", &[]);
    let cube = DataCube::with_schema(empty_data(), (2, 2), (2, 2), OriginalMetadata::default(), &schema).unwrap();
    let value = cube.metadata().user.get("operator").expect("field must exist");
    assert!(value.is_empty());
    assert_eq!(value, &MetadataValue::from(""));
}

#[test]
fn test_every_default_field_present() {
    let schema = MetadataSchema::default();
    let cube = DataCube::new(empty_data(), (2, 2), (2, 2), OriginalMetadata::default()).unwrap();
    for category in MetadataCategory::ALL {
        let names: Vec<_> = schema.fields(category).iter().map(|f| f.name.as_str()).collect();
        let resolved: Vec<_> = cube.metadata().category(category).keys().collect();
        assert_eq!(names, resolved, "{category} fields out of order");
    }
}

#[test]
fn test_deep_tree_fails_construction() {
    let mut tree = MetadataTree::new().with_leaf("leaf", 1);
    for i in 0..100 {
        tree = MetadataTree::new().with_subtree(format!("n{i}"), tree);
    }
    let result = DataCube::new(empty_data(), (2, 2), (2, 2), OriginalMetadata::new(Some(tree), None));
    assert!(matches!(result, Err(Error::MalformedMetadata { .. })));
}

#[test]
fn test_search_absent_tree() {
    assert!(search(None, "beam_energy").unwrap().is_none());
}
