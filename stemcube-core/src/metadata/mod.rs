//! Metadata search and normalization.
//!
//! Upstream readers hand over two nested trees, a full dump and a curated
//! shortlist. The [`MetadataSchema`] names the canonical fields to extract and
//! the source keys to look for; [`MetadataRecord::resolve`] searches both trees
//! and lets the shortlist win on conflicts.

pub mod record;
pub mod resolve;
pub mod schema;
pub mod tree;
mod value;

pub use record::{MetadataRecord, OriginalMetadata};
pub use resolve::{resolve_category, resolve_layered, FieldMap};
pub use schema::{FieldSpec, MetadataCategory, MetadataSchema};
pub use tree::{search, MetadataNode, MetadataTree, DEFAULT_MAX_DEPTH};
pub use value::MetadataValue;
