//! Phased dataset loading
//!
//! A single [`PhasedLoader`] drives any [`TargetStore`]; [`GraphTarget`] and
//! [`DocumentTarget`] differ only in how they attach relations.

pub mod document;
pub mod graph;
pub mod phased;
pub mod report;
pub mod target;

pub use document::DocumentTarget;
pub use graph::GraphTarget;
pub use phased::{load_and_verify, LoadOutcome, PhasedLoader};
pub use report::{LoadFailure, LoadReport, Phase, RelationKind, Subject};
pub use target::{Capabilities, TargetStore};
