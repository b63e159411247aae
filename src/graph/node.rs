//! Graph nodes

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A labelled node and its properties
///
/// Equality is by handle only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub labels: HashSet<Label>,
    pub properties: PropertyMap,
}

impl Node {
    pub fn new(id: NodeId, labels: Vec<Label>, properties: PropertyMap) -> Self {
        Node {
            id,
            labels: labels.into_iter().collect(),
            properties,
        }
    }

    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Set a property, returning the value it replaced
    pub(crate) fn set_property(&mut self, key: String, value: PropertyValue) -> Option<PropertyValue> {
        self.properties.insert(key, value)
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get_property(key).and_then(PropertyValue::as_string)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get_property(key)
            .and_then(PropertyValue::as_integer)
            .and_then(|n| u32::try_from(n).ok())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: u64) -> Node {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), "Moncloa".into());
        props.insert("has_commuter_rail".to_string(), false.into());
        props.insert("fare_zone".to_string(), "A".into());
        Node::new(NodeId::new(id), vec![Label::new("Station")], props)
    }

    #[test]
    fn test_node_properties() {
        let mut node = station(2);
        assert!(node.has_label(&Label::new("Station")));
        assert!(!node.has_label(&Label::new("Campus")));
        assert_eq!(node.get_str("name"), Some("Moncloa"));
        assert_eq!(node.get_property("has_commuter_rail").and_then(PropertyValue::as_boolean), Some(false));

        let old = node.set_property("name".to_string(), "Moncloa Intercambiador".into());
        assert_eq!(old.as_ref().and_then(PropertyValue::as_string), Some("Moncloa"));
        assert_eq!(node.get_str("name"), Some("Moncloa Intercambiador"));
    }

    #[test]
    fn test_node_u32_property() {
        let mut node = Node::new(NodeId::new(1), vec![Label::new("Line")], PropertyMap::new());
        node.set_property("number".to_string(), 10u32.into());
        node.set_property("offset".to_string(), (-1i64).into());
        assert_eq!(node.get_u32("number"), Some(10));
        assert_eq!(node.get_u32("offset"), None);
    }

    #[test]
    fn test_node_equality_is_by_id() {
        assert_eq!(station(7), Node::new(NodeId::new(7), vec![Label::new("Campus")], PropertyMap::new()));
        assert_ne!(station(7), station(8));
    }
}
