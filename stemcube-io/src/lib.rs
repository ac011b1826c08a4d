//! stemcube-io: Ingest adapters for stemcube.
//!
//! This crate turns JSON documents into metadata trees, schemas and
//! reduction plans, and reads headerless raw scans through memory-mapped
//! files via memmap2.
//!

mod error;
pub mod json;
pub mod raw;

pub use error::{Error, Result};
pub use json::{
    parse_metadata_tree, read_metadata_tree, read_reduction_plan, read_schema, tree_from_json,
};
pub use raw::{RawCubeReader, RawDtype};
