//! Source record types
//!
//! Field names follow the on-disk JSON; relationships are expressed by
//! natural keys (line numbers, station slugs).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A metro line with its ordered stop sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub number: u32,
    pub name: String,
    pub color: String,
    /// Station slugs in stop order
    pub stations: Vec<String>,
    /// Minutes between consecutive stops; empty means "use the default"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub travel_minutes: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_km: Option<f64>,
    /// The last stop connects back to the first
    #[serde(default)]
    pub circular: bool,
}

impl Line {
    pub fn new(number: u32, name: impl Into<String>, stations: &[&str]) -> Self {
        Line {
            number,
            name: name.into(),
            color: String::new(),
            stations: stations.iter().map(|s| s.to_string()).collect(),
            travel_minutes: Vec::new(),
            length_km: None,
            circular: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Commuter-rail (Cercanías) interchange detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuterRail {
    pub name: String,
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub slug: String,
    pub name: String,
    pub fare_zone: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub has_commuter_rail: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commuter_rail: Option<CommuterRail>,
    /// Line numbers serving this station
    #[serde(default)]
    pub lines: Vec<u32>,
    /// Ordinal of this station within each line's stop sequence
    #[serde(default)]
    pub line_positions: BTreeMap<u32, usize>,
}

impl Station {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, lines: &[u32]) -> Self {
        Station {
            slug: slug.into(),
            name: name.into(),
            fare_zone: "A".to_string(),
            coordinates: Coordinates { lat: 0.0, lng: 0.0 },
            has_commuter_rail: false,
            commuter_rail: None,
            lines: lines.to_vec(),
            line_positions: BTreeMap::new(),
        }
    }

    /// Distinct lines serving the station
    pub fn distinct_lines(&self) -> Vec<u32> {
        let mut lines = self.lines.clone();
        lines.sort_unstable();
        lines.dedup();
        lines
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgramType {
    #[serde(alias = "GRADO")]
    Undergraduate,
    #[serde(alias = "MASTER")]
    Graduate,
}

impl ProgramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramType::Undergraduate => "UNDERGRADUATE",
            ProgramType::Graduate => "GRADUATE",
        }
    }
}

impl fmt::Display for ProgramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A degree or master programme offered at a campus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    #[serde(rename = "type")]
    pub program_type: ProgramType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_months: Option<u32>,
}

impl Program {
    pub fn new(name: impl Into<String>, program_type: ProgramType) -> Self {
        Program {
            name: name.into(),
            program_type,
            field: None,
            credits: None,
            capacity: None,
            cutoff_score: None,
            duration_years: None,
            duration_months: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProximityRole {
    Primary,
    Alternate,
}

impl ProximityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProximityRole::Primary => "primary",
            ProximityRole::Alternate => "alternate",
        }
    }
}

/// A station within walking distance of a campus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proximity {
    #[serde(alias = "station_id")]
    pub station: String,
    pub walking_minutes: u32,
    pub role: ProximityRole,
}

impl Proximity {
    pub fn new(station: impl Into<String>, walking_minutes: u32, role: ProximityRole) -> Self {
        Proximity {
            station: station.into(),
            walking_minutes,
            role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campus {
    pub name: String,
    pub university: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub nearby_stations: Vec<Proximity>,
}

impl Campus {
    pub fn new(name: impl Into<String>, university: impl Into<String>) -> Self {
        Campus {
            name: name.into(),
            university: university.into(),
            address: String::new(),
            programs: Vec::new(),
            nearby_stations: Vec::new(),
        }
    }
}

/// Distinct stations close enough to change between on foot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColocatedGroup {
    pub stations: Vec<String>,
    #[serde(default)]
    pub change_minutes: Option<u32>,
}

/// The complete, immutable input of one load run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub lines: Vec<Line>,
    pub stations: Vec<Station>,
    pub campuses: Vec<Campus>,
    #[serde(default)]
    pub colocated: Vec<ColocatedGroup>,
}

impl RecordSet {
    pub fn new(lines: Vec<Line>, stations: Vec<Station>, campuses: Vec<Campus>) -> Self {
        RecordSet {
            lines,
            stations,
            campuses,
            colocated: Vec::new(),
        }
    }

    pub fn with_colocated(mut self, colocated: Vec<ColocatedGroup>) -> Self {
        self.colocated = colocated;
        self
    }

    /// Total embedded program records across campuses
    pub fn embedded_program_count(&self) -> usize {
        self.campuses.iter().map(|c| c.programs.len()).sum()
    }
}
