//! Dataset self-consistency checks
//!
//! A line's stop sequence is authoritative; the redundant per-station data
//! (line list, per-line ordinal) is checked against it.

use super::records::RecordSet;
use crate::error::{LoadError, LoadResult};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::warn;

/// One inconsistency found in the source records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum DatasetIssue {
    /// The station's recorded ordinal on a line differs from its stop index
    PositionMismatch {
        station: String,
        line: u32,
        recorded: usize,
        actual: usize,
    },
    /// The station is a stop of the line but has no ordinal for it
    MissingPosition { station: String, line: u32 },
    /// The line stops at the station but the station does not list the line
    UnlistedLine { station: String, line: u32 },
    /// The station lists a line whose stop sequence omits it
    StrayLine { station: String, line: u32 },
    /// The line visits the same station twice
    RepeatedStop { station: String, line: u32 },
    /// Explicit travel times do not match the number of segments
    TravelTimeCount {
        line: u32,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for DatasetIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetIssue::PositionMismatch {
                station,
                line,
                recorded,
                actual,
            } => write!(
                f,
                "station {} records position {} on line {} but is stop {}",
                station, recorded, line, actual
            ),
            DatasetIssue::MissingPosition { station, line } => {
                write!(f, "station {} has no position on line {}", station, line)
            }
            DatasetIssue::UnlistedLine { station, line } => {
                write!(f, "line {} stops at {} which does not list it", line, station)
            }
            DatasetIssue::StrayLine { station, line } => {
                write!(f, "station {} lists line {} which does not stop there", station, line)
            }
            DatasetIssue::RepeatedStop { station, line } => {
                write!(f, "line {} visits {} more than once", line, station)
            }
            DatasetIssue::TravelTimeCount { line, expected, found } => write!(
                f,
                "line {} has {} travel times for {} segments",
                line, found, expected
            ),
        }
    }
}

impl RecordSet {
    /// Check redundant station data against line stop sequences
    ///
    /// Issues are logged and returned; none of them blocks a load.
    pub fn validate(&self) -> Vec<DatasetIssue> {
        let mut issues = Vec::new();

        // slug -> line -> stop index
        let mut stops: HashMap<&str, HashMap<u32, usize>> = HashMap::new();
        for line in &self.lines {
            let mut seen = BTreeSet::new();
            for (index, slug) in line.stations.iter().enumerate() {
                if !seen.insert(slug.as_str()) {
                    issues.push(DatasetIssue::RepeatedStop {
                        station: slug.clone(),
                        line: line.number,
                    });
                    continue;
                }
                stops.entry(slug.as_str()).or_default().insert(line.number, index);
            }

            let segments = line.stations.len().saturating_sub(1) + usize::from(line.circular && line.stations.len() > 2);
            if !line.travel_minutes.is_empty() && line.travel_minutes.len() != segments {
                issues.push(DatasetIssue::TravelTimeCount {
                    line: line.number,
                    expected: segments,
                    found: line.travel_minutes.len(),
                });
            }
        }

        for station in &self.stations {
            let served = stops.get(station.slug.as_str());
            let listed: BTreeSet<u32> = station.lines.iter().copied().collect();

            for line in &listed {
                if served.map_or(true, |s| !s.contains_key(line)) {
                    issues.push(DatasetIssue::StrayLine {
                        station: station.slug.clone(),
                        line: *line,
                    });
                }
            }

            let mut served_lines: Vec<(u32, usize)> = served
                .map(|s| s.iter().map(|(l, i)| (*l, *i)).collect())
                .unwrap_or_default();
            served_lines.sort_unstable();

            for (line, actual) in served_lines {
                if !listed.contains(&line) {
                    issues.push(DatasetIssue::UnlistedLine {
                        station: station.slug.clone(),
                        line,
                    });
                }
                match station.line_positions.get(&line) {
                    None => issues.push(DatasetIssue::MissingPosition {
                        station: station.slug.clone(),
                        line,
                    }),
                    Some(&recorded) if recorded != actual => issues.push(DatasetIssue::PositionMismatch {
                        station: station.slug.clone(),
                        line,
                        recorded,
                        actual,
                    }),
                    Some(_) => {}
                }
            }
        }

        for issue in &issues {
            warn!("Dataset issue: {}", issue);
        }
        issues
    }

    /// Fail with [`LoadError::Dataset`] if [`validate`](Self::validate) finds anything
    pub fn ensure_consistent(&self) -> LoadResult<()> {
        let issues = self.validate();
        match issues.first() {
            None => Ok(()),
            Some(first) => Err(LoadError::Dataset(format!(
                "{} consistency issue(s), first: {}",
                issues.len(),
                first
            ))),
        }
    }
}
