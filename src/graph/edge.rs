//! Directed, typed edges
//!
//! Several edges may join the same pair of nodes: two lines running between
//! the same consecutive stations give two `NEXT` edges.

use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: EdgeType,
    pub properties: PropertyMap,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> Self {
        Edge {
            id,
            source,
            target,
            edge_type: edge_type.into(),
            properties,
        }
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Integer property narrowed to `u32`, as stored for minutes and line numbers
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get_property(key)
            .and_then(PropertyValue::as_integer)
            .and_then(|n| u32::try_from(n).ok())
    }

    pub fn is_type(&self, edge_type: &str) -> bool {
        self.edge_type.as_str() == edge_type
    }
}

// Identity is the handle; two parallel NEXT edges stay distinct
impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}
