//! Manager for property indices
//!
//! Handles creation, deletion and access to property indices, and records
//! which of them enforce uniqueness.

use super::property_index::PropertyIndex;
use crate::graph::{Label, NodeId, PropertyValue};
use std::collections::{HashMap, HashSet};

/// Key for identifying a property index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyIndexKey {
    pub label: Label,
    pub property: String,
}

impl PropertyIndexKey {
    pub fn new(label: &Label, property: &str) -> Self {
        Self {
            label: label.clone(),
            property: property.to_string(),
        }
    }
}

/// Manager for all property indices
#[derive(Debug, Default)]
pub struct IndexManager {
    indices: HashMap<PropertyIndexKey, PropertyIndex>,
    unique: HashSet<PropertyIndexKey>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index for a label and property. No-op if it already exists.
    pub fn create_index(&mut self, label: Label, property: String) -> bool {
        let key = PropertyIndexKey { label, property };
        if self.indices.contains_key(&key) {
            return false;
        }
        self.indices.insert(key, PropertyIndex::new());
        true
    }

    /// Mark an existing index as enforcing uniqueness
    pub fn mark_unique(&mut self, label: &Label, property: &str) {
        self.unique.insert(PropertyIndexKey::new(label, property));
    }

    /// Drop an index (and its uniqueness constraint)
    pub fn drop_index(&mut self, label: &Label, property: &str) {
        let key = PropertyIndexKey::new(label, property);
        self.indices.remove(&key);
        self.unique.remove(&key);
    }

    /// Update index when a node property is set
    pub fn index_insert(&mut self, label: &Label, property: &str, value: PropertyValue, node_id: NodeId) {
        if let Some(index) = self.indices.get_mut(&PropertyIndexKey::new(label, property)) {
            index.insert(value, node_id);
        }
    }

    /// Update index when a node property is removed (or old value replaced)
    pub fn index_remove(&mut self, label: &Label, property: &str, value: &PropertyValue, node_id: NodeId) {
        if let Some(index) = self.indices.get_mut(&PropertyIndexKey::new(label, property)) {
            index.remove(value, node_id);
        }
    }

    /// Check if an index exists
    pub fn has_index(&self, label: &Label, property: &str) -> bool {
        self.indices.contains_key(&PropertyIndexKey::new(label, property))
    }

    /// Check if an index enforces uniqueness
    pub fn is_unique(&self, label: &Label, property: &str) -> bool {
        self.unique.contains(&PropertyIndexKey::new(label, property))
    }

    /// Get index for querying
    pub fn get_index(&self, label: &Label, property: &str) -> Option<&PropertyIndex> {
        self.indices.get(&PropertyIndexKey::new(label, property))
    }

    /// Unique keys declared for a label
    pub fn unique_properties<'a>(&'a self, label: &'a Label) -> impl Iterator<Item = &'a str> + 'a {
        self.unique
            .iter()
            .filter(move |key| &key.label == label)
            .map(|key| key.property.as_str())
    }

    /// All index keys, sorted
    pub fn keys(&self) -> Vec<&PropertyIndexKey> {
        let mut keys: Vec<_> = self.indices.keys().collect();
        keys.sort();
        keys
    }
}
