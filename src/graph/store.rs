//! In-memory graph storage
//!
//! Nodes and edges live in dense arenas addressed by their ids; adjacency
//! lists, a label index, an edge-type index and optional property indices
//! sit beside them.

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, Label, NodeId};
use crate::index::IndexManager;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Unique constraint on :{label}({property}) violated by {value}")]
    ConstraintViolation {
        label: Label,
        property: String,
        value: String,
    },

    #[error("Graph store is closed")]
    Closed,
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory graph storage
///
/// - nodes: arena slot per NodeId
/// - edges: arena slot per EdgeId
/// - outgoing / incoming: adjacency lists per node slot
/// - label_index: Label -> NodeIds
/// - edge_type_index: EdgeType -> EdgeIds
#[derive(Debug)]
pub struct GraphStore {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,

    /// Freed slots, reused before the arena grows
    free_node_ids: Vec<u64>,
    free_edge_ids: Vec<u64>,

    label_index: HashMap<Label, HashSet<NodeId>>,
    edge_type_index: HashMap<EdgeType, HashSet<EdgeId>>,
    property_index: IndexManager,

    next_node_id: u64,
    next_edge_id: u64,

    /// A closed store rejects every write
    open: bool,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            nodes: Vec::with_capacity(128),
            edges: Vec::with_capacity(512),
            outgoing: Vec::with_capacity(128),
            incoming: Vec::with_capacity(128),
            free_node_ids: Vec::new(),
            free_edge_ids: Vec::new(),
            label_index: HashMap::new(),
            edge_type_index: HashMap::new(),
            property_index: IndexManager::new(),
            next_node_id: 1,
            next_edge_id: 1,
            open: true,
        }
    }

    /// Whether the store still accepts operations
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Close the store; later writes fail with [`GraphError::Closed`]
    pub fn close(&mut self) {
        self.open = false;
    }

    fn ensure_open(&self) -> GraphResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(GraphError::Closed)
        }
    }

    /// Read access to the property indices
    pub fn property_index(&self) -> &IndexManager {
        &self.property_index
    }

    /// Create a node with auto-generated ID and single label
    pub fn create_node(&mut self, label: impl Into<Label>) -> GraphResult<NodeId> {
        self.create_node_with_properties(vec![label.into()], PropertyMap::new())
    }

    /// Create a node with labels and properties
    pub fn create_node_with_properties(
        &mut self,
        labels: Vec<Label>,
        properties: PropertyMap,
    ) -> GraphResult<NodeId> {
        self.ensure_open()?;
        self.check_unique(&labels, &properties, None)?;

        let node_id_u64 = if let Some(id) = self.free_node_ids.pop() {
            id
        } else {
            let id = self.next_node_id;
            self.next_node_id += 1;
            id
        };
        let node_id = NodeId::new(node_id_u64);
        let idx = node_id_u64 as usize;

        for label in &labels {
            self.label_index
                .entry(label.clone())
                .or_default()
                .insert(node_id);
            for (key, value) in &properties {
                self.property_index.index_insert(label, key, value.clone(), node_id);
            }
        }

        // Ensure storage capacity
        if idx >= self.nodes.len() {
            self.nodes.resize(idx + 1, None);
            self.outgoing.resize(idx + 1, Vec::new());
            self.incoming.resize(idx + 1, Vec::new());
        }

        self.nodes[idx] = Some(Node::new(node_id, labels, properties));
        Ok(node_id)
    }

    fn check_unique(
        &self,
        labels: &[Label],
        properties: &PropertyMap,
        except: Option<NodeId>,
    ) -> GraphResult<()> {
        for label in labels {
            for property in self.property_index.unique_properties(label) {
                let Some(value) = properties.get(property) else {
                    continue;
                };
                let taken = self
                    .property_index
                    .get_index(label, property)
                    .map(|index| index.contains_other(value, except))
                    .unwrap_or(false);
                if taken {
                    return Err(GraphError::ConstraintViolation {
                        label: label.clone(),
                        property: property.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.slot()).and_then(Option::as_ref)
    }

    /// Check if a node exists
    pub fn has_node(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    /// Set a property on a node, keeping property indices current
    pub fn set_node_property(
        &mut self,
        node_id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        self.ensure_open()?;
        let key = key.into();
        let value = value.into();

        let labels: Vec<Label> = self
            .get_node(node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?
            .labels
            .iter()
            .cloned()
            .collect();

        let mut candidate = PropertyMap::new();
        candidate.insert(key.clone(), value.clone());
        self.check_unique(&labels, &candidate, Some(node_id))?;

        let node = self
            .nodes
            .get_mut(node_id.slot())
            .and_then(Option::as_mut)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let old = node.set_property(key.clone(), value.clone());

        for label in &labels {
            if let Some(old) = &old {
                self.property_index.index_remove(label, &key, old, node_id);
            }
            self.property_index.index_insert(label, &key, value.clone(), node_id);
        }
        Ok(old)
    }

    /// Delete a node and all its connected edges
    pub fn delete_node(&mut self, id: NodeId) -> GraphResult<Node> {
        self.ensure_open()?;
        let idx = id.slot();
        let node = self
            .nodes
            .get_mut(idx)
            .and_then(Option::take)
            .ok_or(GraphError::NodeNotFound(id))?;

        for label in &node.labels {
            if let Some(node_set) = self.label_index.get_mut(label) {
                node_set.remove(&id);
            }
            for (key, value) in &node.properties {
                self.property_index.index_remove(label, key, value, id);
            }
        }

        // Self-relations appear in both lists
        let connected: BTreeSet<EdgeId> = std::mem::take(&mut self.outgoing[idx])
            .into_iter()
            .chain(std::mem::take(&mut self.incoming[idx]))
            .collect();
        for edge_id in connected {
            self.delete_edge(edge_id)?;
        }

        self.free_node_ids.push(id.as_u64());
        Ok(node)
    }

    /// Create an edge between two nodes
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
    ) -> GraphResult<EdgeId> {
        self.create_edge_with_properties(source, target, edge_type, PropertyMap::new())
    }

    /// Create an edge with properties
    pub fn create_edge_with_properties(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        self.ensure_open()?;
        if !self.has_node(source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.has_node(target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        let edge_id_u64 = if let Some(id) = self.free_edge_ids.pop() {
            id
        } else {
            let id = self.next_edge_id;
            self.next_edge_id += 1;
            id
        };
        let edge_id = EdgeId::new(edge_id_u64);
        let idx = edge_id_u64 as usize;

        let edge_type = edge_type.into();
        let edge = Edge::new(edge_id, source, target, edge_type.clone(), properties);

        self.outgoing[source.slot()].push(edge_id);
        self.incoming[target.slot()].push(edge_id);

        if idx >= self.edges.len() {
            self.edges.resize(idx + 1, None);
        }

        self.edge_type_index
            .entry(edge_type)
            .or_default()
            .insert(edge_id);

        self.edges[idx] = Some(edge);
        Ok(edge_id)
    }

    /// Get an edge by ID
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.slot()).and_then(Option::as_ref)
    }

    /// Delete an edge
    pub fn delete_edge(&mut self, id: EdgeId) -> GraphResult<Edge> {
        self.ensure_open()?;
        let idx = id.slot();
        let edge = self
            .edges
            .get_mut(idx)
            .and_then(Option::take)
            .ok_or(GraphError::EdgeNotFound(id))?;

        self.free_edge_ids.push(id.as_u64());

        if let Some(edge_set) = self.edge_type_index.get_mut(&edge.edge_type) {
            edge_set.remove(&id);
        }
        if let Some(adj) = self.outgoing.get_mut(edge.source.slot()) {
            adj.retain(|&eid| eid != id);
        }
        if let Some(adj) = self.incoming.get_mut(edge.target.slot()) {
            adj.retain(|&eid| eid != id);
        }

        Ok(edge)
    }

    /// Get all outgoing edges from a node, in creation order
    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(node_id.slot())
            .map(|edge_ids| edge_ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Get all incoming edges to a node, in creation order
    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.incoming
            .get(node_id.slot())
            .map(|edge_ids| edge_ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Get all nodes with a specific label, ordered by id
    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self
            .label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|&id| self.get_node(id)).collect())
            .unwrap_or_default();
        nodes.sort_by_key(|n| n.id);
        nodes
    }

    /// Get all edges of a specific type, ordered by id
    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self
            .edge_type_index
            .get(edge_type)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default();
        edges.sort_by_key(|e| e.id);
        edges
    }

    /// Find nodes of `label` whose `property` equals `value`
    ///
    /// Uses the property index when one exists, otherwise scans the label.
    pub fn find_nodes(&self, label: &Label, property: &str, value: &PropertyValue) -> Vec<NodeId> {
        if let Some(index) = self.property_index.get_index(label, property) {
            return index.get(value);
        }
        self.get_nodes_by_label(label)
            .into_iter()
            .filter(|n| n.get_property(property) == Some(value))
            .map(|n| n.id)
            .collect()
    }

    /// First node of `label` whose `property` equals `value`
    pub fn find_node(&self, label: &Label, property: &str, value: &PropertyValue) -> Option<&Node> {
        self.find_nodes(label, property, value)
            .into_iter()
            .next()
            .and_then(|id| self.get_node(id))
    }

    /// Get-or-create a node keyed on a composite of properties
    ///
    /// Returns the node id and whether it was created. `on_create` properties
    /// are only applied when a new node is made.
    pub fn merge_node(
        &mut self,
        label: impl Into<Label>,
        key: PropertyMap,
        on_create: PropertyMap,
    ) -> GraphResult<(NodeId, bool)> {
        self.ensure_open()?;
        let label = label.into();

        let existing = self
            .get_nodes_by_label(&label)
            .into_iter()
            .find(|node| key.iter().all(|(k, v)| node.get_property(k) == Some(v)))
            .map(|node| node.id);
        if let Some(id) = existing {
            return Ok((id, false));
        }

        let mut properties = on_create;
        properties.extend(key);
        let id = self.create_node_with_properties(vec![label.clone()], properties)?;
        debug!("Merged new :{} node {}", label, id);
        Ok((id, true))
    }

    /// Create a property index, backfilling existing nodes
    ///
    /// Returns false if the index already existed.
    pub fn create_index(&mut self, label: impl Into<Label>, property: &str) -> GraphResult<bool> {
        self.ensure_open()?;
        let label = label.into();
        if !self.property_index.create_index(label.clone(), property.to_string()) {
            return Ok(false);
        }

        let entries: Vec<(NodeId, PropertyValue)> = self
            .get_nodes_by_label(&label)
            .into_iter()
            .filter_map(|n| n.get_property(property).map(|v| (n.id, v.clone())))
            .collect();
        for (id, value) in entries {
            self.property_index.index_insert(&label, property, value, id);
        }
        Ok(true)
    }

    /// Create a uniqueness constraint (backed by a property index)
    pub fn create_unique_constraint(&mut self, label: impl Into<Label>, property: &str) -> GraphResult<()> {
        let label = label.into();
        let created = self.create_index(label.clone(), property)?;

        let duplicated = self
            .property_index
            .get_index(&label, property)
            .map(|index| index.has_duplicates())
            .unwrap_or(false);
        if duplicated {
            if created {
                self.property_index.drop_index(&label, property);
            }
            return Err(GraphError::ConstraintViolation {
                label,
                property: property.to_string(),
                value: "existing duplicate values".to_string(),
            });
        }

        self.property_index.mark_unique(&label, property);
        Ok(())
    }

    /// Delete every node carrying `label`, together with its edges
    pub fn detach_delete_label(&mut self, label: &Label) -> GraphResult<usize> {
        self.ensure_open()?;
        let ids: Vec<NodeId> = self.get_nodes_by_label(label).iter().map(|n| n.id).collect();
        for id in &ids {
            self.delete_node(*id)?;
        }
        Ok(ids.len())
    }

    /// Get total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Get total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.iter().flatten().count()
    }

    /// Number of nodes carrying `label`
    pub fn label_count(&self, label: &Label) -> usize {
        self.label_index.get(label).map(HashSet::len).unwrap_or(0)
    }

    /// Number of edges of `edge_type`
    pub fn edge_type_count(&self, edge_type: &EdgeType) -> usize {
        self.edge_type_index.get(edge_type).map(HashSet::len).unwrap_or(0)
    }

    /// Node count per label, for statistics output
    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        self.label_index
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(label, ids)| (label.to_string(), ids.len()))
            .collect()
    }

    /// Edge count per type, for statistics output
    pub fn edge_type_counts(&self) -> BTreeMap<String, usize> {
        self.edge_type_index
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(edge_type, ids)| (edge_type.to_string(), ids.len()))
            .collect()
    }

    /// Get all nodes in the graph, ordered by id
    pub fn all_nodes(&self) -> Vec<&Node> {
        self.nodes.iter().flatten().collect()
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_create_and_get_node() {
        let mut store = GraphStore::new();
        let node_id = store.create_node("Station").unwrap();

        assert_eq!(store.node_count(), 1);
        let node = store.get_node(node_id).unwrap();
        assert_eq!(node.id, node_id);
        assert!(node.has_label(&Label::new("Station")));
    }

    #[test]
    fn test_create_and_get_edge() {
        let mut store = GraphStore::new();
        let sol = store.create_node("Station").unwrap();
        let callao = store.create_node("Station").unwrap();

        let edge_id = store.create_edge(sol, callao, "NEXT").unwrap();

        assert_eq!(store.edge_count(), 1);
        let edge = store.get_edge(edge_id).unwrap();
        assert_eq!(edge.source, sol);
        assert_eq!(edge.target, callao);
        assert_eq!(store.get_outgoing_edges(sol).len(), 1);
        assert_eq!(store.get_incoming_edges(callao).len(), 1);
    }

    #[test]
    fn test_edge_validation() {
        let mut store = GraphStore::new();
        let node = store.create_node("Station").unwrap();
        let invalid = NodeId::new(999);

        assert_eq!(
            store.create_edge(invalid, node, "NEXT"),
            Err(GraphError::InvalidEdgeSource(invalid))
        );
        assert_eq!(
            store.create_edge(node, invalid, "NEXT"),
            Err(GraphError::InvalidEdgeTarget(invalid))
        );
    }

    #[test]
    fn test_delete_node_detaches_edges_and_loops() {
        let mut store = GraphStore::new();
        let a = store.create_node("Station").unwrap();
        let b = store.create_node("Station").unwrap();
        store.create_edge(a, b, "NEXT").unwrap();
        store.create_edge(b, a, "NEXT").unwrap();
        store.create_edge(a, a, "INTERCHANGE").unwrap();

        store.delete_node(a).unwrap();
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.edge_count(), 0);
        assert_eq!(store.edge_type_count(&EdgeType::new("INTERCHANGE")), 0);
        assert!(store.get_outgoing_edges(b).is_empty());

        // Freed slot is reused
        let c = store.create_node("Station").unwrap();
        assert_eq!(c, a);

        // The loop was released once, so three new edges get three slots
        let reused: BTreeSet<EdgeId> = (0..3).map(|_| store.create_edge(b, c, "NEXT").unwrap()).collect();
        assert_eq!(reused.len(), 3);
        assert_eq!(store.edge_count(), 3);
        assert_eq!(store.get_outgoing_edges(b).len(), 3);
    }

    #[test]
    fn test_merge_node_is_idempotent() {
        let mut store = GraphStore::new();
        let key = props(&[
            ("name", "Grado en Derecho".into()),
            ("type", "UNDERGRADUATE".into()),
        ]);
        let extra = props(&[("credits", 240i64.into())]);

        let (first, created) = store.merge_node("Program", key.clone(), extra.clone()).unwrap();
        assert!(created);
        let (second, created) = store.merge_node("Program", key, PropertyMap::new()).unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(store.label_count(&Label::new("Program")), 1);
        assert_eq!(
            store.get_node(first).unwrap().get_property("credits").unwrap().as_integer(),
            Some(240)
        );

        let other_type = props(&[
            ("name", "Grado en Derecho".into()),
            ("type", "GRADUATE".into()),
        ]);
        let (third, created) = store.merge_node("Program", other_type, PropertyMap::new()).unwrap();
        assert!(created);
        assert_ne!(first, third);
    }

    #[test]
    fn test_unique_constraint() {
        let mut store = GraphStore::new();
        store.create_unique_constraint("Station", "slug").unwrap();

        store
            .create_node_with_properties(vec![Label::new("Station")], props(&[("slug", "sol".into())]))
            .unwrap();
        let err = store
            .create_node_with_properties(vec![Label::new("Station")], props(&[("slug", "sol".into())]))
            .unwrap_err();
        assert!(matches!(err, GraphError::ConstraintViolation { .. }));

        let found = store.find_node(&Label::new("Station"), "slug", &"sol".into());
        assert!(found.is_some());
    }

    #[test]
    fn test_unique_constraint_rejects_existing_duplicates() {
        let mut store = GraphStore::new();
        for _ in 0..2 {
            store
                .create_node_with_properties(vec![Label::new("Line")], props(&[("number", 1i64.into())]))
                .unwrap();
        }
        assert!(store.create_unique_constraint("Line", "number").is_err());
        assert!(!store.property_index().has_index(&Label::new("Line"), "number"));
    }

    #[test]
    fn test_index_backfill_and_set_property() {
        let mut store = GraphStore::new();
        let id = store
            .create_node_with_properties(vec![Label::new("Station")], props(&[("fare_zone", "A".into())]))
            .unwrap();
        assert!(store.create_index("Station", "fare_zone").unwrap());
        assert!(!store.create_index("Station", "fare_zone").unwrap());
        assert_eq!(store.find_nodes(&Label::new("Station"), "fare_zone", &"A".into()), vec![id]);

        store.set_node_property(id, "fare_zone", "B1").unwrap();
        assert!(store.find_nodes(&Label::new("Station"), "fare_zone", &"A".into()).is_empty());
        assert_eq!(store.find_nodes(&Label::new("Station"), "fare_zone", &"B1".into()), vec![id]);
    }

    #[test]
    fn test_detach_delete_label_and_counts() {
        let mut store = GraphStore::new();
        let line = store.create_node("Line").unwrap();
        let station = store.create_node("Station").unwrap();
        store.create_edge(line, station, "HAS_STATION").unwrap();

        assert_eq!(store.detach_delete_label(&Label::new("Line")).unwrap(), 1);
        assert_eq!(store.label_count(&Label::new("Line")), 0);
        assert_eq!(store.label_counts().get("Station"), Some(&1));
        assert!(store.edge_type_counts().is_empty());
    }

    #[test]
    fn test_closed_store_rejects_writes() {
        let mut store = GraphStore::new();
        store.close();
        assert!(!store.is_open());
        assert_eq!(store.create_node("Station"), Err(GraphError::Closed));
    }
}
