//! Canonical metadata fields and where to look for them.
//!
//! The schema is configuration only: for every canonical field it lists the
//! source keys to probe in the original metadata trees, in order of preference.
//! A field with no candidates is still emitted, with an empty value, so that
//! downstream editors always see it.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The six groups of a resolved metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MetadataCategory {
    /// Instrument parameters.
    Microscope,
    /// Sample description.
    Sample,
    /// User annotations.
    User,
    /// Processing provenance.
    Processing,
    /// Calibration values.
    Calibration,
    /// Free-text comments.
    Comments,
}

impl MetadataCategory {
    /// All categories in record order.
    pub const ALL: [MetadataCategory; 6] = [
        MetadataCategory::Microscope,
        MetadataCategory::Sample,
        MetadataCategory::User,
        MetadataCategory::Processing,
        MetadataCategory::Calibration,
        MetadataCategory::Comments,
    ];

    /// Lowercase category name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            MetadataCategory::Microscope => "microscope",
            MetadataCategory::Sample => "sample",
            MetadataCategory::User => "user",
            MetadataCategory::Processing => "processing",
            MetadataCategory::Calibration => "calibration",
            MetadataCategory::Comments => "comments",
        }
    }
}

impl fmt::Display for MetadataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One canonical field and its candidate source keys.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldSpec {
    /// Canonical field name in the resolved record.
    pub name: String,
    /// Source keys to try, most preferred first.
    #[cfg_attr(feature = "serde", serde(default))]
    pub candidates: Vec<String>,
}

impl FieldSpec {
    /// Creates a field spec.
    pub fn new<S: AsRef<str>>(name: impl Into<String>, candidates: &[S]) -> Self {
        Self {
            name: name.into(),
            candidates: candidates.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }

    /// Creates a field that is always present but never searched for.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: Vec::new(),
        }
    }
}

/// Field table for all six categories.
///
/// `Default` is the built-in table. With the `serde` feature, categories
/// missing from a deserialized document keep their built-in fields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MetadataSchema {
    pub microscope: Vec<FieldSpec>,
    pub sample: Vec<FieldSpec>,
    pub user: Vec<FieldSpec>,
    pub processing: Vec<FieldSpec>,
    pub calibration: Vec<FieldSpec>,
    pub comments: Vec<FieldSpec>,
}

fn numbered(prefix: &str) -> Vec<FieldSpec> {
    (1..=3)
        .map(|i| FieldSpec::placeholder(format!("{prefix}_metadata_{i}")))
        .collect()
}

impl Default for MetadataSchema {
    fn default() -> Self {
        let mut microscope = vec![
            FieldSpec::new("accelerating_voltage_kV", &["beam_energy"]),
            FieldSpec::new("camera_length_mm", &["camera_length"]),
        ];
        microscope.extend(
            [
                "C2_aperture",
                "convergence_semiangle_mrad",
                "spot_size",
                "scan_rotation_degrees",
                "dwell_time_ms",
                "scan_size_Ny",
                "scan_size_Nx",
                "R_pix_size",
                "R_units",
                "K_pix_size",
                "K_units",
                "probe_FWHM_nm",
            ]
            .into_iter()
            .map(FieldSpec::placeholder),
        );

        Self {
            microscope,
            sample: numbered("sample"),
            user: numbered("user"),
            processing: vec![FieldSpec::new("original_filename", &["original_filename"])],
            calibration: numbered("calibration"),
            comments: numbered("comments"),
        }
    }
}

impl MetadataSchema {
    /// Creates a schema with no fields in any category.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            microscope: Vec::new(),
            sample: Vec::new(),
            user: Vec::new(),
            processing: Vec::new(),
            calibration: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Returns the fields of a category in declaration order.
    #[must_use]
    pub fn fields(&self, category: MetadataCategory) -> &[FieldSpec] {
        match category {
            MetadataCategory::Microscope => &self.microscope,
            MetadataCategory::Sample => &self.sample,
            MetadataCategory::User => &self.user,
            MetadataCategory::Processing => &self.processing,
            MetadataCategory::Calibration => &self.calibration,
            MetadataCategory::Comments => &self.comments,
        }
    }

    fn fields_mut(&mut self, category: MetadataCategory) -> &mut Vec<FieldSpec> {
        match category {
            MetadataCategory::Microscope => &mut self.microscope,
            MetadataCategory::Sample => &mut self.sample,
            MetadataCategory::User => &mut self.user,
            MetadataCategory::Processing => &mut self.processing,
            MetadataCategory::Calibration => &mut self.calibration,
            MetadataCategory::Comments => &mut self.comments,
        }
    }

    /// Adds a field, or replaces the candidates of an existing field of the same name.
    pub fn add_field(&mut self, category: MetadataCategory, field: FieldSpec) {
        let fields = self.fields_mut(category);
        match fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => existing.candidates = field.candidates,
            None => fields.push(field),
        }
    }

    /// Builder form of [`MetadataSchema::add_field`].
    #[must_use]
    pub fn with_field<S: AsRef<str>>(
        mut self,
        category: MetadataCategory,
        name: impl Into<String>,
        candidates: &[S],
    ) -> Self {
        self.add_field(category, FieldSpec::new(name, candidates));
        self
    }

    /// Total number of fields across all categories.
    #[must_use]
    pub fn field_count(&self) -> usize {
        MetadataCategory::ALL
            .iter()
            .map(|&category| self.fields(category).len())
            .sum()
    }
}
