//! stemcube-core: Data model for four-dimensional scanning diffraction datasets.
//!
//! This crate provides the 4D scan container with shape management and
//! summation binning, together with the search-and-merge machinery that
//! normalizes nested instrument metadata into a fixed record.
//!

pub mod binning;
pub mod datacube;
pub mod error;
pub mod metadata;
pub mod reduction;
pub mod sample;
pub mod slice;

pub use binning::{AxisPair, BinningFactor};
pub use datacube::DataCube;
pub use error::{Error, Result, ScanAxis};
pub use metadata::{
    FieldMap, FieldSpec, MetadataCategory, MetadataNode, MetadataRecord, MetadataSchema,
    MetadataTree, MetadataValue, OriginalMetadata,
};
pub use reduction::{CropWindow, ReductionPlan};
pub use sample::Sample;
pub use slice::DiffractionSlice;
