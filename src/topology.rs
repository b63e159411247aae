//! Topology derivation
//!
//! Relations implied by the dataset rather than stated in it: adjacency
//! between consecutive stops of a line, and interchange at stations where
//! a passenger can change line.

use crate::dataset::{ColocatedGroup, Line, Station};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Minute values used when the dataset does not supply one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub default_travel_minutes: u32,
    pub interchange_minutes: u32,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        TopologyConfig {
            default_travel_minutes: 2,
            interchange_minutes: 3,
        }
    }
}

/// Directed "next stop on this line" relation between station slugs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Adjacency {
    pub from: String,
    pub to: String,
    pub line: u32,
    pub travel_minutes: u32,
}

/// Directed "can change line here" relation; `from == to` for a station
/// served by several lines
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Interchange {
    pub from: String,
    pub to: String,
    pub change_minutes: u32,
}

impl Interchange {
    pub fn is_self(&self) -> bool {
        self.from == self.to
    }
}

/// Adjacencies of one line, both directions per consecutive pair
///
/// Segment `i` takes `line.travel_minutes[i]` when present. A circular line
/// with more than two stops also joins its last stop to the first. Fewer
/// than two stops yields nothing.
pub fn derive_adjacency(line: &Line, config: &TopologyConfig) -> Vec<Adjacency> {
    let stops = &line.stations;
    if stops.len() < 2 {
        return Vec::new();
    }

    let mut segments: Vec<(&String, &String)> = stops.windows(2).map(|pair| (&pair[0], &pair[1])).collect();
    if line.circular && stops.len() > 2 {
        segments.push((&stops[stops.len() - 1], &stops[0]));
    }

    segments
        .into_iter()
        .enumerate()
        .flat_map(|(i, (a, b))| {
            let minutes = line
                .travel_minutes
                .get(i)
                .copied()
                .unwrap_or(config.default_travel_minutes);
            [
                Adjacency {
                    from: a.clone(),
                    to: b.clone(),
                    line: line.number,
                    travel_minutes: minutes,
                },
                Adjacency {
                    from: b.clone(),
                    to: a.clone(),
                    line: line.number,
                    travel_minutes: minutes,
                },
            ]
        })
        .collect()
}

/// Interchanges for a station set
///
/// A station on two or more distinct lines gets one self-interchange. Every
/// pair of distinct stations in a co-located group gets an interchange in
/// each direction. Duplicates are dropped; order follows the input.
pub fn derive_interchanges(
    stations: &[Station],
    colocated: &[ColocatedGroup],
    config: &TopologyConfig,
) -> Vec<Interchange> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::new();
    let mut emit = |from: &str, to: &str, change_minutes: u32| {
        if seen.insert((from.to_string(), to.to_string())) {
            out.push(Interchange {
                from: from.to_string(),
                to: to.to_string(),
                change_minutes,
            });
        }
    };

    for station in stations {
        if station.distinct_lines().len() >= 2 {
            emit(&station.slug, &station.slug, config.interchange_minutes);
        }
    }

    for group in colocated {
        let minutes = group.change_minutes.unwrap_or(config.interchange_minutes);
        for (i, a) in group.stations.iter().enumerate() {
            for b in &group.stations[i + 1..] {
                if a != b {
                    emit(a, b, minutes);
                    emit(b, a, minutes);
                }
            }
        }
    }

    out
}

/// All adjacencies of a line set
pub fn derive_all_adjacency(lines: &[Line], config: &TopologyConfig) -> Vec<Adjacency> {
    lines.iter().flat_map(|line| derive_adjacency(line, config)).collect()
}
