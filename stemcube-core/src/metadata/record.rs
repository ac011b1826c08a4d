//! The resolved metadata record owned by a dataset.

use crate::error::Result;
use crate::metadata::resolve::{resolve_layered, FieldMap};
use crate::metadata::schema::{MetadataCategory, MetadataSchema};
use crate::metadata::tree::MetadataTree;
use crate::metadata::MetadataValue;

#[cfg(feature = "serde")]
use serde::Serialize;

/// The two metadata trees supplied by the upstream reader, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OriginalMetadata {
    /// Exhaustive dump of everything the reader found.
    pub full: Option<MetadataTree>,
    /// Curated subset; wins over `full` when both provide a field.
    pub shortlist: Option<MetadataTree>,
}

impl OriginalMetadata {
    /// Creates an instance from the two optional trees.
    #[must_use]
    pub fn new(full: Option<MetadataTree>, shortlist: Option<MetadataTree>) -> Self {
        Self { full, shortlist }
    }

    /// Trees ordered from lowest to highest precedence.
    #[must_use]
    pub fn by_precedence(&self) -> [Option<&MetadataTree>; 2] {
        [self.full.as_ref(), self.shortlist.as_ref()]
    }
}

/// Normalized metadata: six categories of canonical fields.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct MetadataRecord {
    pub microscope: FieldMap,
    pub sample: FieldMap,
    pub user: FieldMap,
    pub processing: FieldMap,
    pub calibration: FieldMap,
    pub comments: FieldMap,
    #[cfg_attr(feature = "serde", serde(skip))]
    original: OriginalMetadata,
}

impl MetadataRecord {
    /// Resolves every schema category against the original trees.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedMetadata`] if a tree is nested too deeply.
    pub fn resolve(original: OriginalMetadata, schema: &MetadataSchema) -> Result<Self> {
        let mut record = MetadataRecord::default();
        {
            let trees = original.by_precedence();
            for category in MetadataCategory::ALL {
                let fields = resolve_layered(&trees, schema.fields(category))?;
                log::debug!(
                    "resolved {} of {} {} fields",
                    fields.iter().filter(|(_, v)| !v.is_empty()).count(),
                    fields.len(),
                    category
                );
                *record.category_mut(category) = fields;
            }
        }
        record.original = original;
        Ok(record)
    }

    /// Returns the fields of a category.
    #[must_use]
    pub fn category(&self, category: MetadataCategory) -> &FieldMap {
        match category {
            MetadataCategory::Microscope => &self.microscope,
            MetadataCategory::Sample => &self.sample,
            MetadataCategory::User => &self.user,
            MetadataCategory::Processing => &self.processing,
            MetadataCategory::Calibration => &self.calibration,
            MetadataCategory::Comments => &self.comments,
        }
    }

    /// Returns the fields of a category for modification.
    pub fn category_mut(&mut self, category: MetadataCategory) -> &mut FieldMap {
        match category {
            MetadataCategory::Microscope => &mut self.microscope,
            MetadataCategory::Sample => &mut self.sample,
            MetadataCategory::User => &mut self.user,
            MetadataCategory::Processing => &mut self.processing,
            MetadataCategory::Calibration => &mut self.calibration,
            MetadataCategory::Comments => &mut self.comments,
        }
    }

    /// Looks up a single field.
    #[must_use]
    pub fn get(&self, category: MetadataCategory, name: &str) -> Option<&MetadataValue> {
        self.category(category).get(name)
    }

    /// Adds or replaces a single field by hand.
    pub fn insert(
        &mut self,
        category: MetadataCategory,
        name: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) {
        self.category_mut(category).insert(name, value);
    }

    /// The trees this record was resolved from.
    #[must_use]
    pub fn original(&self) -> &OriginalMetadata {
        &self.original
    }
}
