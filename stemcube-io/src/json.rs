//! JSON documents: metadata trees, schemas and reduction plans.
//!
//! Object keys keep their document order, which decides which leaf a
//! metadata search finds first.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;
use stemcube_core::{MetadataNode, MetadataSchema, MetadataTree, MetadataValue, ReductionPlan};

use crate::{Error, Result};

/// Converts a parsed JSON document into a metadata tree.
///
/// Objects become subtrees; every other value becomes a leaf. Objects nested
/// inside arrays are kept as their JSON text.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] if the document is not a JSON object.
pub fn tree_from_json(value: Value) -> Result<MetadataTree> {
    match value {
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, node_from_json(v))).collect()),
        other => Err(Error::InvalidFormat(format!(
            "metadata document must be a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn node_from_json(value: Value) -> MetadataNode {
    match value {
        Value::Object(map) => MetadataNode::Tree(map.into_iter().map(|(k, v)| (k, node_from_json(v))).collect()),
        other => MetadataNode::Leaf(value_from_json(other)),
    }
}

fn value_from_json(value: Value) -> MetadataValue {
    match value {
        Value::Null => MetadataValue::Null,
        Value::Bool(b) => MetadataValue::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => MetadataValue::Integer(i),
            None => MetadataValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => MetadataValue::String(s),
        Value::Array(items) => MetadataValue::List(items.into_iter().map(value_from_json).collect()),
        object @ Value::Object(_) => MetadataValue::String(object.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses a metadata tree from JSON text.
///
/// # Errors
/// Returns an error if the text is not valid JSON or not an object.
pub fn parse_metadata_tree(text: &str) -> Result<MetadataTree> {
    tree_from_json(serde_json::from_str(text)?)
}

/// Reads a metadata tree from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or does not hold a JSON object.
pub fn read_metadata_tree<P: AsRef<Path>>(path: P) -> Result<MetadataTree> {
    let value: Value = read_json(path.as_ref())?;
    let tree = tree_from_json(value)?;
    log::debug!(
        "read metadata tree with {} top-level entries from {}",
        tree.len(),
        path.as_ref().display()
    );
    Ok(tree)
}

/// Reads a metadata schema from a JSON file.
///
/// Categories the file leaves out keep their built-in fields.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_schema<P: AsRef<Path>>(path: P) -> Result<MetadataSchema> {
    read_json(path.as_ref())
}

/// Reads a reduction plan from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, including
/// non-integer binning factors.
pub fn read_reduction_plan<P: AsRef<Path>>(path: P) -> Result<ReductionPlan> {
    read_json(path.as_ref())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
