//! B-Tree based property index for fast lookups

use crate::graph::{NodeId, PropertyValue};
use std::collections::{BTreeMap, BTreeSet};

/// Index for a specific property on a specific label
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
    /// Value -> Set of NodeIds
    index: BTreeMap<PropertyValue, BTreeSet<NodeId>>,
}

impl PropertyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: PropertyValue, node_id: NodeId) {
        self.index.entry(value).or_default().insert(node_id);
    }

    pub fn remove(&mut self, value: &PropertyValue, node_id: NodeId) {
        if let Some(nodes) = self.index.get_mut(value) {
            nodes.remove(&node_id);
            if nodes.is_empty() {
                self.index.remove(value);
            }
        }
    }

    /// Nodes holding `value`, in id order
    pub fn get(&self, value: &PropertyValue) -> Vec<NodeId> {
        self.index
            .get(value)
            .map(|nodes| nodes.iter().copied().collect())
            .unwrap_or_default()
    }

    /// True if some node other than `except` already holds `value`
    pub fn contains_other(&self, value: &PropertyValue, except: Option<NodeId>) -> bool {
        self.index
            .get(value)
            .map(|nodes| nodes.iter().any(|id| Some(*id) != except))
            .unwrap_or(false)
    }

    /// Number of distinct indexed values
    pub fn distinct_values(&self) -> usize {
        self.index.len()
    }

    /// True if any value is held by more than one node
    pub fn has_duplicates(&self) -> bool {
        self.index.values().any(|nodes| nodes.len() > 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_index_ops() {
        let mut index = PropertyIndex::new();
        let n1 = NodeId::new(1);
        let n2 = NodeId::new(2);
        let zone = PropertyValue::String("A".into());

        index.insert(zone.clone(), n1);
        index.insert(zone.clone(), n2);
        assert_eq!(index.get(&zone), vec![n1, n2]);
        assert!(index.has_duplicates());
        assert!(index.contains_other(&zone, Some(n1)));

        index.remove(&zone, n1);
        assert_eq!(index.get(&zone), vec![n2]);
        assert!(!index.contains_other(&zone, Some(n2)));

        index.remove(&zone, n2);
        assert_eq!(index.distinct_values(), 0);
    }
}
