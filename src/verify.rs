//! Integrity reporter
//!
//! Compares entity and relation counts read back from a target store with
//! the counts expected from the consumed record set. Mismatches are
//! reported, never repaired.

use crate::dataset::RecordSet;
use crate::error::{LoadError, LoadResult, StoreResult};
use crate::loader::{Capabilities, RelationKind, TargetStore};
use crate::resolver::EntityKind;
use crate::topology::{derive_all_adjacency, derive_interchanges, TopologyConfig};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{info, warn};

/// A countable entity or relation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CountKey {
    Lines,
    Stations,
    Campuses,
    Programs,
    LineStops,
    Proximities,
    Offers,
    Adjacencies,
    Interchanges,
}

impl CountKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountKey::Lines => "lines",
            CountKey::Stations => "stations",
            CountKey::Campuses => "campuses",
            CountKey::Programs => "programs",
            CountKey::LineStops => "line stops",
            CountKey::Proximities => "proximities",
            CountKey::Offers => "offers",
            CountKey::Adjacencies => "adjacencies",
            CountKey::Interchanges => "interchanges",
        }
    }
}

impl fmt::Display for CountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EntityKind> for CountKey {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Line => CountKey::Lines,
            EntityKind::Station => CountKey::Stations,
            EntityKind::Campus => CountKey::Campuses,
            EntityKind::Program => CountKey::Programs,
        }
    }
}

impl From<RelationKind> for CountKey {
    fn from(kind: RelationKind) -> Self {
        match kind {
            RelationKind::LineStops => CountKey::LineStops,
            RelationKind::Proximities => CountKey::Proximities,
            RelationKind::Offers => CountKey::Offers,
            RelationKind::Adjacencies => CountKey::Adjacencies,
            RelationKind::Interchanges => CountKey::Interchanges,
        }
    }
}

/// Counts per type; only the types a store models are present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StoreCounts(BTreeMap<CountKey, usize>);

impl StoreCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: CountKey, count: usize) {
        self.0.insert(key, count);
    }

    pub fn get(&self, key: CountKey) -> Option<usize> {
        self.0.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CountKey, usize)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// Counts a complete load of a record set should produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExpectedCounts(StoreCounts);

impl ExpectedCounts {
    pub fn new(counts: StoreCounts) -> Self {
        ExpectedCounts(counts)
    }

    /// Derive expectations from the records a store with `caps` consumes
    pub fn from_records(records: &RecordSet, caps: Capabilities, topology: &TopologyConfig) -> Self {
        let mut counts = StoreCounts::new();
        counts.set(CountKey::Lines, records.lines.len());
        counts.set(CountKey::Stations, records.stations.len());
        counts.set(CountKey::Campuses, records.campuses.len());
        counts.set(
            CountKey::LineStops,
            records.lines.iter().map(|l| l.stations.len()).sum(),
        );
        counts.set(
            CountKey::Proximities,
            records.campuses.iter().map(|c| c.nearby_stations.len()).sum(),
        );

        if caps.program_entities {
            let distinct: HashSet<(&str, _)> = records
                .campuses
                .iter()
                .flat_map(|c| c.programs.iter().map(|p| (p.name.as_str(), p.program_type)))
                .collect();
            let offers: HashSet<(&str, &str, _)> = records
                .campuses
                .iter()
                .flat_map(|c| {
                    c.programs
                        .iter()
                        .map(move |p| (c.name.as_str(), p.name.as_str(), p.program_type))
                })
                .collect();
            counts.set(CountKey::Programs, distinct.len());
            counts.set(CountKey::Offers, offers.len());
        } else {
            counts.set(CountKey::Programs, records.embedded_program_count());
        }

        if caps.derived_topology {
            counts.set(
                CountKey::Adjacencies,
                derive_all_adjacency(&records.lines, topology).len(),
            );
            counts.set(
                CountKey::Interchanges,
                derive_interchanges(&records.stations, &records.colocated, topology).len(),
            );
        }

        ExpectedCounts(counts)
    }

    pub fn get(&self, key: CountKey) -> Option<usize> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CountKey, usize)> + '_ {
        self.0.iter()
    }
}

/// Expected against actual for one type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountCheck {
    pub key: CountKey,
    pub expected: usize,
    /// `None` when the store reported no count for the type
    pub actual: Option<usize>,
}

impl CountCheck {
    pub fn matches(&self) -> bool {
        self.actual == Some(self.expected)
    }
}

impl fmt::Display for CountCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.actual {
            Some(actual) => write!(f, "{}: expected {}, found {}", self.key, self.expected, actual),
            None => write!(f, "{}: expected {}, not reported", self.key, self.expected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub store: String,
    pub checks: Vec<CountCheck>,
}

impl VerificationResult {
    pub fn mismatches(&self) -> Vec<&CountCheck> {
        self.checks.iter().filter(|c| !c.matches()).collect()
    }

    pub fn is_consistent(&self) -> bool {
        self.checks.iter().all(CountCheck::matches)
    }

    /// `VerificationMismatch` listing every disagreeing count
    pub fn into_result(self) -> LoadResult<Self> {
        if self.is_consistent() {
            return Ok(self);
        }
        let mismatches = self.checks.into_iter().filter(|c| !c.matches()).collect();
        Err(LoadError::VerificationMismatch { mismatches })
    }
}

/// Post-load read-back verification
#[derive(Debug, Clone)]
pub struct IntegrityReporter {
    expected: ExpectedCounts,
}

impl IntegrityReporter {
    pub fn new(expected: ExpectedCounts) -> Self {
        IntegrityReporter { expected }
    }

    pub fn expected(&self) -> &ExpectedCounts {
        &self.expected
    }

    /// Read counts back from `target` and compare
    pub fn verify<T: TargetStore>(&self, target: &T) -> StoreResult<VerificationResult> {
        let actual = target.counts()?;
        let checks: Vec<CountCheck> = self
            .expected
            .iter()
            .map(|(key, expected)| CountCheck {
                key,
                expected,
                actual: actual.get(key),
            })
            .collect();

        let result = VerificationResult {
            store: target.name().to_string(),
            checks,
        };
        for mismatch in result.mismatches() {
            warn!("[{}] count mismatch: {}", result.store, mismatch);
        }
        if result.is_consistent() {
            info!("[{}] verified {} counts", result.store, result.checks.len());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Campus, Line, Program, ProgramType, Station};

    fn records() -> RecordSet {
        let mut a = Campus::new("A", "UCM");
        a.programs = vec![
            Program::new("Grado en Derecho", ProgramType::Undergraduate),
            Program::new("Máster en Derecho", ProgramType::Graduate),
        ];
        let mut b = Campus::new("B", "URJC");
        b.programs = vec![Program::new("Grado en Derecho", ProgramType::Undergraduate)];

        RecordSet::new(
            vec![Line::new(1, "L1", &["x", "y", "z"])],
            vec![
                Station::new("x", "X", &[1]),
                Station::new("y", "Y", &[1, 6]),
                Station::new("z", "Z", &[1]),
            ],
            vec![a, b],
        )
    }

    #[test]
    fn test_expected_counts_graph() {
        let caps = Capabilities {
            program_entities: true,
            derived_topology: true,
        };
        let expected = ExpectedCounts::from_records(&records(), caps, &TopologyConfig::default());
        assert_eq!(expected.get(CountKey::Programs), Some(2));
        assert_eq!(expected.get(CountKey::Offers), Some(3));
        assert_eq!(expected.get(CountKey::LineStops), Some(3));
        assert_eq!(expected.get(CountKey::Adjacencies), Some(4));
        assert_eq!(expected.get(CountKey::Interchanges), Some(1));
    }

    #[test]
    fn test_expected_counts_document() {
        let caps = Capabilities {
            program_entities: false,
            derived_topology: false,
        };
        let expected = ExpectedCounts::from_records(&records(), caps, &TopologyConfig::default());
        assert_eq!(expected.get(CountKey::Programs), Some(3));
        assert_eq!(expected.get(CountKey::Offers), None);
        assert_eq!(expected.get(CountKey::Adjacencies), None);
    }

    #[test]
    fn test_mismatches_surface_as_error() {
        let result = VerificationResult {
            store: "graph".into(),
            checks: vec![
                CountCheck {
                    key: CountKey::Lines,
                    expected: 4,
                    actual: Some(4),
                },
                CountCheck {
                    key: CountKey::Stations,
                    expected: 60,
                    actual: Some(59),
                },
            ],
        };
        assert_eq!(result.mismatches().len(), 1);

        match result.into_result() {
            Err(LoadError::VerificationMismatch { mismatches }) => {
                assert_eq!(mismatches[0].key, CountKey::Stations);
                assert_eq!(mismatches[0].to_string(), "stations: expected 60, found 59");
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }
}
