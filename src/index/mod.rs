//! Property indexing
//!
//! B-tree indices over (label, property) used for lookups by natural key and
//! for uniqueness constraints.

pub mod manager;
pub mod property_index;

pub use manager::{IndexManager, PropertyIndexKey};
pub use property_index::PropertyIndex;
