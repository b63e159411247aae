//! Metro Campus Loader
//!
//! Loads the Madrid metro and university campus dataset (lines, stations,
//! campuses with their degree programs) into two target stores: an
//! in-memory property graph and an in-memory document store.
//!
//! # Architecture
//!
//! - `dataset`: source records and their JSON reader
//! - `resolver`: natural key -> store identifier, scoped to one load run
//! - `loader`: the phased loader over the `TargetStore` capability trait,
//!   with graph and document implementations
//! - `topology`: derived adjacency and interchange relations
//! - `verify`: expected against actual counts after a load
//! - `queries`: example queries over both stores
//! - `maintenance`: inserts, updates and reference-preserving deletes on a
//!   loaded store
//!
//! ## Example Usage
//!
//! ```rust
//! use metrocampus::dataset::{Campus, Line, Proximity, ProximityRole, RecordSet, Station};
//! use metrocampus::loader::{GraphTarget, PhasedLoader};
//! use metrocampus::topology::TopologyConfig;
//!
//! let mut campus = Campus::new("Campus Sur", "UPM");
//! campus.nearby_stations.push(Proximity::new("y", 5, ProximityRole::Primary));
//!
//! let records = RecordSet::new(
//!     vec![Line::new(1, "L1", &["x", "y", "z"])],
//!     vec![Station::new("x", "X", &[1]), Station::new("y", "Y", &[1]), Station::new("z", "Z", &[1])],
//!     vec![campus],
//! );
//!
//! let mut target = GraphTarget::new();
//! let report = PhasedLoader::new(&mut target, TopologyConfig::default())
//!     .load(&records)
//!     .unwrap();
//! assert!(report.is_clean());
//! assert_eq!(target.store().node_count(), 5);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod config;
pub mod dataset;
pub mod document;
pub mod error;
pub mod graph;
pub mod index;
pub mod loader;
pub mod maintenance;
pub mod queries;
pub mod resolver;
pub mod topology;
pub mod verify;

// Re-export main types for convenience
pub use config::{LoaderConfig, TargetKind};
pub use dataset::RecordSet;
pub use document::{DocumentError, DocumentId, DocumentStore};
pub use error::{LoadError, LoadResult, StoreError, StoreResult};
pub use graph::{
    Edge, EdgeId, EdgeType, GraphError, GraphResult, GraphStore, Label, Node, NodeId, PropertyMap, PropertyValue,
};
pub use loader::{load_and_verify, DocumentTarget, GraphTarget, LoadOutcome, LoadReport, PhasedLoader, TargetStore};
pub use resolver::{EntityKind, KeyResolver, NaturalKey};
pub use verify::{ExpectedCounts, IntegrityReporter, VerificationResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
