//! Property declarations.
//!
//! A [`PropSpec`] is built once per controller type. It fixes the key order,
//! each key's default and the bidirectional key ↔ attribute table, so both
//! lookups are a single hash probe.

use ahash::AHashMap;

use crate::case::attribute_name;
use crate::value::{PropKind, PropValue};

/// Errors from building a [`PropSpec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropSpecError {
    #[error("property key must not be empty")]
    EmptyKey,
    #[error("property `{0}` is declared twice")]
    DuplicateKey(String),
    /// Two keys map to the same attribute name (e.g. `maxCount` and `max_count`).
    #[error("properties `{first}` and `{second}` both map to attribute `{attribute}`")]
    AttributeCollision {
        attribute: String,
        first: String,
        second: String,
    },
}

/// One declared property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropEntry {
    key: String,
    attribute: String,
    default: PropValue,
}

impl PropEntry {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[must_use]
    pub fn default_value(&self) -> &PropValue {
        &self.default
    }

    /// Coercion rule, taken from the default.
    #[must_use]
    pub fn kind(&self) -> PropKind {
        self.default.kind()
    }
}

/// Ordered property declarations with key and attribute lookup tables.
#[derive(Debug, Clone, Default)]
pub struct PropSpec {
    entries: Vec<PropEntry>,
    by_key: AHashMap<String, usize>,
    by_attribute: AHashMap<String, usize>,
}

impl PropSpec {
    #[must_use]
    pub fn builder() -> PropSpecBuilder {
        PropSpecBuilder::default()
    }

    /// A spec with no properties.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &PropEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&PropEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn index_of_key(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    #[must_use]
    pub fn index_of_attribute(&self, attribute: &str) -> Option<usize> {
        self.by_attribute.get(attribute).copied()
    }

    #[must_use]
    pub fn attribute_for_key(&self, key: &str) -> Option<&str> {
        self.index_of_key(key).map(|i| self.entries[i].attribute())
    }

    #[must_use]
    pub fn key_for_attribute(&self, attribute: &str) -> Option<&str> {
        self.index_of_attribute(attribute).map(|i| self.entries[i].key())
    }

    /// Attribute names whose mutation the host must report.
    pub fn observed_attributes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(PropEntry::attribute)
    }
}

/// Builder for [`PropSpec`].
#[derive(Debug, Default)]
pub struct PropSpecBuilder {
    entries: Vec<(String, PropValue)>,
}

impl PropSpecBuilder {
    /// Declare `key` with `default`. The default's type fixes the coercion rule.
    #[must_use]
    pub fn prop(mut self, key: impl Into<String>, default: impl Into<PropValue>) -> Self {
        self.entries.push((key.into(), default.into()));
        self
    }

    pub fn build(self) -> Result<PropSpec, PropSpecError> {
        let mut spec = PropSpec::default();
        for (key, default) in self.entries {
            if key.is_empty() {
                return Err(PropSpecError::EmptyKey);
            }
            if spec.by_key.contains_key(&key) {
                return Err(PropSpecError::DuplicateKey(key));
            }
            let attribute = attribute_name(&key);
            if let Some(&other) = spec.by_attribute.get(&attribute) {
                return Err(PropSpecError::AttributeCollision {
                    attribute,
                    first: spec.entries[other].key.clone(),
                    second: key,
                });
            }
            let kind = default.kind();
            let default = default.conform(kind);
            let index = spec.entries.len();
            spec.by_key.insert(key.clone(), index);
            spec.by_attribute.insert(attribute.clone(), index);
            spec.entries.push(PropEntry {
                key,
                attribute,
                default,
            });
        }
        Ok(spec)
    }
}
