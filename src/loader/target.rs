//! Target store capability interface
//!
//! The phased loader drives any store through [`TargetStore`]. Stores that
//! have no independent program entities or derived topology leave those
//! operations at their `Unsupported` default and say so in
//! [`Capabilities`].

use crate::dataset::{Campus, Line, Program, Proximity, Station};
use crate::error::{StoreError, StoreResult};
use crate::topology::{Adjacency, Interchange};
use crate::verify::StoreCounts;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// What a target store models beyond the shared entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Programs are get-or-create entities linked to campuses,
    /// rather than embedded per campus
    pub program_entities: bool,
    /// Adjacency and interchange relations are materialized
    pub derived_topology: bool,
}

/// A store the phased loader can write into
pub trait TargetStore {
    /// Opaque store-assigned identifier
    type Id: Copy + Eq + Hash + Debug;

    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Remove every entity and relation this loader manages
    fn clear(&mut self) -> StoreResult<()>;

    /// Insert a line without its stop sequence
    fn insert_line(&mut self, line: &Line) -> StoreResult<Self::Id>;

    fn insert_station(&mut self, station: &Station) -> StoreResult<Self::Id>;

    /// Insert a campus without its proximity references
    fn insert_campus(&mut self, campus: &Campus) -> StoreResult<Self::Id>;

    /// Get-or-create a program keyed on (name, type); returns whether it was created
    fn get_or_create_program(&mut self, _program: &Program) -> StoreResult<(Self::Id, bool)> {
        Err(StoreError::Unsupported("program entities"))
    }

    /// Attach a line's resolved stop sequence, preserving order
    fn attach_stops(&mut self, line: Self::Id, stops: &[Self::Id]) -> StoreResult<()>;

    /// Attach one resolved proximity entry to a campus
    fn attach_proximity(&mut self, campus: Self::Id, station: Self::Id, proximity: &Proximity) -> StoreResult<()>;

    fn attach_program(&mut self, _campus: Self::Id, _program: Self::Id) -> StoreResult<()> {
        Err(StoreError::Unsupported("program relations"))
    }

    fn attach_adjacency(&mut self, _from: Self::Id, _to: Self::Id, _adjacency: &Adjacency) -> StoreResult<()> {
        Err(StoreError::Unsupported("adjacency relations"))
    }

    fn attach_interchange(&mut self, _from: Self::Id, _to: Self::Id, _interchange: &Interchange) -> StoreResult<()> {
        Err(StoreError::Unsupported("interchange relations"))
    }

    /// Create constraints and secondary indices over loaded data
    fn create_indexes(&mut self) -> StoreResult<()>;

    /// Entity and relation counts actually present in the store
    fn counts(&self) -> StoreResult<StoreCounts>;
}
