//! Source dataset
//!
//! Typed records for lines, stations and campuses (with embedded programs),
//! the JSON reader, and self-consistency validation.

pub mod reader;
pub mod records;
pub mod validate;

pub use reader::DatasetFiles;
pub use records::{
    Campus, ColocatedGroup, CommuterRail, Coordinates, Line, Program, ProgramType, Proximity, ProximityRole,
    RecordSet, Station,
};
pub use validate::DatasetIssue;
