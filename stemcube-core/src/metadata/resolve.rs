//! Field resolution against one or more metadata trees.

use crate::error::Result;
use crate::metadata::schema::FieldSpec;
use crate::metadata::tree::{search, MetadataTree};
use crate::metadata::MetadataValue;

#[cfg(feature = "serde")]
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Resolved fields of one category, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, MetadataValue)>,
}

impl FieldMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MetadataValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Sets a field, keeping its position if it already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<MetadataValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Returns true if the field exists and holds something other than the empty value.
    #[must_use]
    pub fn is_resolved(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_empty())
    }

    /// Iterates over fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(feature = "serde")]
impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Resolves a category's fields against a single tree.
///
/// # Errors
/// Returns [`crate::Error::MalformedMetadata`] if the tree is nested too deeply.
pub fn resolve_category(tree: Option<&MetadataTree>, fields: &[FieldSpec]) -> Result<FieldMap> {
    resolve_layered(&[tree], fields)
}

/// Resolves a category's fields against trees ordered from lowest to highest precedence.
///
/// Every field starts out empty. Within one tree the first candidate key
/// that is found wins; a later tree that finds the field overwrites the value
/// from an earlier tree, while a later tree that finds nothing leaves it alone.
///
/// # Errors
/// Returns [`crate::Error::MalformedMetadata`] if any tree is nested too deeply.
pub fn resolve_layered(trees: &[Option<&MetadataTree>], fields: &[FieldSpec]) -> Result<FieldMap> {
    let mut resolved = FieldMap::new();
    for field in fields {
        let mut value = MetadataValue::empty();
        for &tree in trees {
            if let Some(found) = first_candidate(tree, &field.candidates)? {
                value = found.clone();
            }
        }
        resolved.insert(field.name.clone(), value);
    }
    Ok(resolved)
}

fn first_candidate<'a>(
    tree: Option<&'a MetadataTree>,
    candidates: &[String],
) -> Result<Option<&'a MetadataValue>> {
    for candidate in candidates {
        if let Some(value) = search(tree, candidate)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voltage_field() -> Vec<FieldSpec> {
        vec![FieldSpec::new("accelerating_voltage_kV", &["beam_energy"])]
    }

    #[test]
    fn test_resolve_single_tree() {
        let tree = MetadataTree::new()
            .with_subtree("acquisition", MetadataTree::new().with_leaf("beam_energy", 200));
        let fields = resolve_category(Some(&tree), &voltage_field()).unwrap();
        assert_eq!(fields.get("accelerating_voltage_kV"), Some(&MetadataValue::from(200)));
    }

    #[test]
    fn test_earlier_candidate_wins() {
        let tree = MetadataTree::new().with_leaf("cl", 80).with_leaf("camera_length", 120);
        let fields = vec![FieldSpec::new("camera_length_mm", &["camera_length", "cl"])];
        let resolved = resolve_category(Some(&tree), &fields).unwrap();
        assert_eq!(resolved.get("camera_length_mm"), Some(&MetadataValue::from(120)));
    }

    #[test]
    fn test_later_tree_overrides() {
        let full = MetadataTree::new().with_leaf("beam_energy", 200);
        let shortlist = MetadataTree::new().with_leaf("beam_energy", 300);
        let resolved = resolve_layered(&[Some(&full), Some(&shortlist)], &voltage_field()).unwrap();
        assert_eq!(resolved.get("accelerating_voltage_kV"), Some(&MetadataValue::from(300)));
    }

    #[test]
    fn test_later_tree_miss_keeps_value() {
        let full = MetadataTree::new().with_leaf("beam_energy", 200);
        let shortlist = MetadataTree::new().with_leaf("unrelated", 1);
        let resolved = resolve_layered(&[Some(&full), Some(&shortlist)], &voltage_field()).unwrap();
        assert_eq!(resolved.get("accelerating_voltage_kV"), Some(&MetadataValue::from(200)));
    }

    #[test]
    fn test_unresolved_fields_are_empty() {
        let fields = vec![
            FieldSpec::placeholder("spot_size"),
            FieldSpec::new("accelerating_voltage_kV", &["beam_energy"]),
        ];
        let resolved = resolve_layered(&[None, None], &fields).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["spot_size", "accelerating_voltage_kV"]);
        assert!(resolved.get("spot_size").unwrap().is_empty());
        assert!(!resolved.is_resolved("accelerating_voltage_kV"));
    }
}
