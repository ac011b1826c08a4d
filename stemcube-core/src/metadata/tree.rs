//! Nested metadata trees and key search.
//!
//! A [`MetadataTree`] is the already-parsed metadata produced by an upstream
//! reader: an ordered mapping from keys to either a leaf value or another tree.
//! Entry order is the reader's order and is significant for [`MetadataTree::search`].

use crate::error::{Error, Result};
use crate::metadata::MetadataValue;

#[cfg(feature = "serde")]
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Default nesting limit followed by [`MetadataTree::search`].
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A child of a metadata tree.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataNode {
    /// Terminal value.
    Leaf(MetadataValue),
    /// Nested group of entries.
    Tree(MetadataTree),
}

impl MetadataNode {
    /// Returns true if this node is a nested tree.
    #[must_use]
    pub fn is_tree(&self) -> bool {
        matches!(self, MetadataNode::Tree(_))
    }

    /// Returns the leaf value, if this node is a leaf.
    #[must_use]
    pub fn as_leaf(&self) -> Option<&MetadataValue> {
        match self {
            MetadataNode::Leaf(value) => Some(value),
            MetadataNode::Tree(_) => None,
        }
    }

    /// Returns the subtree, if this node is a tree.
    #[must_use]
    pub fn as_tree(&self) -> Option<&MetadataTree> {
        match self {
            MetadataNode::Tree(tree) => Some(tree),
            MetadataNode::Leaf(_) => None,
        }
    }
}

macro_rules! leaf_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for MetadataNode {
                fn from(value: $ty) -> Self {
                    MetadataNode::Leaf(value.into())
                }
            }
        )*
    };
}

leaf_from!(MetadataValue, &str, String, i64, i32, f64, bool);

impl From<MetadataTree> for MetadataNode {
    fn from(tree: MetadataTree) -> Self {
        MetadataNode::Tree(tree)
    }
}

/// Ordered, arbitrarily nested key-value metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTree {
    entries: Vec<(String, MetadataNode)>,
}

impl MetadataTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, replacing an existing entry with the same key in place.
    ///
    /// Returns the replaced node, if any.
    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<MetadataNode>) -> Option<MetadataNode> {
        let key = key.into();
        let node = node.into();
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(existing, node));
        }
        self.entries.push((key, node));
        None
    }

    /// Adds a leaf entry.
    #[must_use]
    pub fn with_leaf(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, MetadataNode::Leaf(value.into()));
        self
    }

    /// Adds a nested tree entry.
    #[must_use]
    pub fn with_subtree(mut self, key: impl Into<String>, tree: MetadataTree) -> Self {
        self.insert(key, MetadataNode::Tree(tree));
        self
    }

    /// Returns the immediate child stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetadataNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, node)| node)
    }

    /// Iterates over immediate children in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataNode)> {
        self.entries.iter().map(|(k, node)| (k.as_str(), node))
    }

    /// Iterates over immediate child keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Returns the number of immediate children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the tree has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Searches for the first leaf named `key`.
    ///
    /// Children are visited in order. A leaf whose key matches is returned
    /// immediately; a subtree is searched completely before its later
    /// siblings. Subtree keys never match.
    ///
    /// # Errors
    /// Returns [`Error::MalformedMetadata`] if the tree nests deeper than
    /// [`DEFAULT_MAX_DEPTH`].
    pub fn search(&self, key: &str) -> Result<Option<&MetadataValue>> {
        self.search_with_limit(key, DEFAULT_MAX_DEPTH)
    }

    /// Same as [`MetadataTree::search`] with an explicit nesting limit.
    ///
    /// # Errors
    /// Returns [`Error::MalformedMetadata`] if a subtree deeper than `limit`
    /// is reached before a match.
    pub fn search_with_limit(&self, key: &str, limit: usize) -> Result<Option<&MetadataValue>> {
        search_level(self, key, 0, limit)
    }
}

fn search_level<'a>(
    tree: &'a MetadataTree,
    key: &str,
    depth: usize,
    limit: usize,
) -> Result<Option<&'a MetadataValue>> {
    if depth > limit {
        return Err(Error::MalformedMetadata { depth, limit });
    }
    for (name, node) in &tree.entries {
        match node {
            MetadataNode::Leaf(value) => {
                if name == key {
                    return Ok(Some(value));
                }
            }
            MetadataNode::Tree(subtree) => {
                if let Some(value) = search_level(subtree, key, depth + 1, limit)? {
                    return Ok(Some(value));
                }
            }
        }
    }
    Ok(None)
}

/// Searches an optional tree for the first leaf named `key`.
///
/// An absent tree finds nothing.
///
/// # Errors
/// Propagates [`Error::MalformedMetadata`] from [`MetadataTree::search`].
pub fn search<'a>(tree: Option<&'a MetadataTree>, key: &str) -> Result<Option<&'a MetadataValue>> {
    match tree {
        Some(tree) => tree.search(key),
        None => Ok(None),
    }
}

impl<K: Into<String>, N: Into<MetadataNode>> FromIterator<(K, N)> for MetadataTree {
    fn from_iter<I: IntoIterator<Item = (K, N)>>(iter: I) -> Self {
        let mut tree = MetadataTree::new();
        for (key, node) in iter {
            tree.insert(key, node);
        }
        tree
    }
}

#[cfg(feature = "serde")]
impl Serialize for MetadataTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, node) in &self.entries {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl Serialize for MetadataNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MetadataNode::Leaf(value) => value.serialize(serializer),
            MetadataNode::Tree(tree) => tree.serialize(serializer),
        }
    }
}
