//! Example queries over the loaded stores
//!
//! The same questions asked of both targets: which stations a line visits,
//! which campuses sit near a station or offer a program, how far apart two
//! stops are, and which campus offering a program is easiest to reach.

pub mod document;
pub mod graph;

use crate::dataset::ProgramType;
use crate::document::DocumentError;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    #[error("Unknown station: {0}")]
    UnknownStation(String),

    #[error("Unknown line: {0}")]
    UnknownLine(u32),

    #[error("Station {station} is not on line {line}")]
    NotOnLine { station: String, line: u32 },

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// A campus within walking distance of a station
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NearbyCampus {
    pub campus: String,
    pub university: String,
    pub walking_minutes: u32,
    pub role: String,
}

/// One program offered at one campus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampusOffer {
    pub campus: String,
    pub university: String,
    pub program: String,
    pub program_type: ProgramType,
}

/// Undergraduate and graduate program counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgramTally {
    pub undergraduate: usize,
    pub graduate: usize,
}

impl ProgramTally {
    pub fn add(&mut self, program_type: ProgramType) {
        match program_type {
            ProgramType::Undergraduate => self.undergraduate += 1,
            ProgramType::Graduate => self.graduate += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.undergraduate + self.graduate
    }
}

/// Stops and estimated time between two stations of one line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SameLineTrip {
    pub from: String,
    pub to: String,
    pub line: u32,
    pub from_position: usize,
    pub to_position: usize,
    pub stops: usize,
    pub estimated_minutes: f64,
}

/// How a campus is reached from the origin station
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampusAccess {
    /// Station nearest the campus along this access
    pub station: String,
    pub role: String,
    pub walking_minutes: u32,
    /// Lines ridden, in order
    pub lines: Vec<u32>,
    pub stops: usize,
    pub line_changes: usize,
    /// Riding plus walking
    pub total_minutes: f64,
}

/// A campus offering the requested program, with its best access
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampusRecommendation {
    pub campus: String,
    pub university: String,
    pub program: String,
    pub capacity: Option<u32>,
    pub cutoff_score: Option<f64>,
    /// `None` when no nearby station can be reached
    pub access: Option<CampusAccess>,
}

impl CampusRecommendation {
    pub fn is_reachable(&self) -> bool {
        self.access.is_some()
    }
}

/// Reachable campuses first, quickest first, then by name
pub(crate) fn rank(recommendations: &mut [CampusRecommendation]) {
    recommendations.sort_by(|a, b| {
        let minutes = |r: &CampusRecommendation| r.access.as_ref().map_or(f64::INFINITY, |a| a.total_minutes);
        minutes(a).total_cmp(&minutes(b)).then_with(|| a.campus.cmp(&b.campus))
    });
}

/// Keep the quicker of two accesses
pub(crate) fn quicker(best: Option<CampusAccess>, candidate: CampusAccess) -> Option<CampusAccess> {
    match best {
        Some(current) if current.total_minutes <= candidate.total_minutes => Some(current),
        _ => Some(candidate),
    }
}

/// Per-type totals of a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub store: String,
    pub entities: BTreeMap<String, usize>,
    pub relations: BTreeMap<String, usize>,
}

/// Case-insensitive substring match
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
