//! Core graph store
//!
//! Property graph data model used as the graph-oriented load target:
//! - Nodes with labels and properties
//! - Directed, typed edges with properties
//! - Multiple edges between the same nodes
//! - Label, edge-type and property indices

pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{EdgeId, EdgeType, Label, NodeId};
