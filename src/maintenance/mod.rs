//! Maintenance of a loaded store
//!
//! Inserts, updates and deletes applied after a load, addressed by natural
//! keys (station slug or name, line number, campus name and university).
//! Deletes keep references consistent: a removed station disappears from
//! every line's stop list and every campus's nearby stations.

pub mod document;
pub mod graph;

use crate::document::DocumentError;
use crate::graph::GraphError;
use crate::queries::contains_ci;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum MaintenanceError {
    #[error("Unknown station: {0}")]
    UnknownStation(String),

    #[error("Unknown line: {0}")]
    UnknownLine(u32),

    #[error("Unknown campus: {name} ({university})")]
    UnknownCampus { name: String, university: String },

    #[error("Campus {campus} does not offer {program}")]
    UnknownProgram { campus: String, program: String },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a graduate program: {0}")]
    NotGraduate(String),

    #[error("Station {0} already has a commuter-rail interchange")]
    CommuterRailPresent(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MaintenanceError {
    fn from(err: serde_json::Error) -> Self {
        MaintenanceError::Serialization(err.to_string())
    }
}

pub type MaintenanceResult<T> = Result<T, MaintenanceError>;

/// Campus addressed by exact name and a case-insensitive university fragment
#[derive(Debug, Clone, Copy)]
pub struct CampusRef<'a> {
    pub name: &'a str,
    pub university: &'a str,
}

impl<'a> CampusRef<'a> {
    pub fn new(name: &'a str, university: &'a str) -> Self {
        CampusRef { name, university }
    }

    fn matches(&self, name: &str, university: &str) -> bool {
        name == self.name && contains_ci(university, self.university)
    }

    fn unknown(&self) -> MaintenanceError {
        MaintenanceError::UnknownCampus {
            name: self.name.to_string(),
            university: self.university.to_string(),
        }
    }
}
