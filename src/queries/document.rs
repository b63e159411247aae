//! Document store queries

use super::{
    contains_ci, quicker, rank, CampusAccess, CampusOffer, CampusRecommendation, NearbyCampus, ProgramTally,
    QueryError, QueryResult, SameLineTrip, StoreStats,
};
use crate::dataset::{Program, ProgramType, ProximityRole};
use crate::document::{Document, DocumentStore, ID_FIELD};
use crate::loader::document::{CAMPUSES, LINES, STATIONS};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Ride time per stop assumed where documents carry no segment timings
pub const ESTIMATED_MINUTES_PER_STOP: f64 = 2.5;

fn text<'a>(doc: &'a Document, field: &str) -> &'a str {
    doc.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn names(docs: Vec<&Document>) -> Vec<String> {
    docs.into_iter().map(|d| text(d, "name").to_string()).collect()
}

fn programs_of(campus: &Document) -> Vec<Program> {
    campus
        .get("programs")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// Station documents keyed by their `_id` value
fn stations_by_id(store: &DocumentStore) -> QueryResult<HashMap<String, &Document>> {
    Ok(store
        .find(STATIONS, |_| true)?
        .into_iter()
        .map(|doc| (text(doc, ID_FIELD).to_string(), doc))
        .collect())
}

fn uint(doc: &Document, field: &str) -> u32 {
    doc.get(field)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or_default()
}

/// Station by slug, or by case-insensitive name
fn find_station<'a>(store: &'a DocumentStore, query: &str) -> QueryResult<&'a Document> {
    store
        .find(STATIONS, |doc| text(doc, "slug") == query || text(doc, "name").to_lowercase() == query.to_lowercase())?
        .into_iter()
        .next()
        .ok_or_else(|| QueryError::UnknownStation(query.to_string()))
}

fn find_line(store: &DocumentStore, number: u32) -> QueryResult<&Document> {
    store
        .find_by_field(LINES, "number", &json!(number))?
        .into_iter()
        .next()
        .ok_or(QueryError::UnknownLine(number))
}

fn station_ids(line: &Document) -> Vec<&str> {
    line.get("station_ids")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect()
}

/// Stops between two ordinals; a circular line may go either way round
fn stops_between(line: &Document, len: usize, from: usize, to: usize) -> usize {
    let direct = from.abs_diff(to);
    if line.get("circular").and_then(Value::as_bool).unwrap_or(false) {
        direct.min(len - direct)
    } else {
        direct
    }
}

/// Station names of a line, following its ordered `station_ids`
pub fn stations_on_line(store: &DocumentStore, number: u32) -> QueryResult<Vec<String>> {
    let line = find_line(store, number)?;
    let stations = stations_by_id(store)?;
    Ok(station_ids(line)
        .into_iter()
        .filter_map(|id| stations.get(id))
        .map(|doc| text(doc, "name").to_string())
        .collect())
}

/// Stops and estimated minutes between two stations of the same line
///
/// Positions come from the line's ordered `station_ids`.
pub fn compare_same_line(store: &DocumentStore, from: &str, to: &str, number: u32) -> QueryResult<SameLineTrip> {
    let line = find_line(store, number)?;
    let ids = station_ids(line);
    let position = |query: &str| -> QueryResult<(String, usize)> {
        let station = find_station(store, query)?;
        let name = text(station, "name").to_string();
        match ids.iter().position(|id| *id == text(station, ID_FIELD)) {
            Some(position) => Ok((name, position)),
            None => Err(QueryError::NotOnLine { station: name, line: number }),
        }
    };
    let (from, from_position) = position(from)?;
    let (to, to_position) = position(to)?;

    let stops = stops_between(line, ids.len(), from_position, to_position);
    Ok(SameLineTrip {
        from,
        to,
        line: number,
        from_position,
        to_position,
        stops,
        estimated_minutes: stops as f64 * ESTIMATED_MINUTES_PER_STOP,
    })
}

/// Campuses offering a matching program, ranked by how quickly they are
/// reached from `origin` without changing line
///
/// Campuses whose nearby stations share no line with the origin are kept,
/// unranked, at the end.
pub fn recommend_campuses(
    store: &DocumentStore,
    origin: &str,
    needle: &str,
    program_type: ProgramType,
) -> QueryResult<Vec<CampusRecommendation>> {
    let origin_id = text(find_station(store, origin)?, ID_FIELD);
    let stations = stations_by_id(store)?;
    let lines = store.find(LINES, |_| true)?;

    let mut recommendations = Vec::new();
    for campus in store.find(CAMPUSES, |_| true)? {
        let Some(program) = programs_of(campus)
            .into_iter()
            .find(|p| p.program_type == program_type && contains_ci(&p.name, needle))
        else {
            continue;
        };

        let mut best = None;
        let entries = campus.get("nearby_stations").and_then(Value::as_array).into_iter().flatten();
        for entry in entries {
            let Some(station) = entry.get("station_id").and_then(Value::as_str).and_then(|id| stations.get(id)) else {
                continue;
            };
            let walking_minutes = entry
                .get("walking_minutes")
                .and_then(Value::as_u64)
                .and_then(|m| u32::try_from(m).ok())
                .unwrap_or(0);

            for line in &lines {
                let ids = station_ids(line);
                let from = ids.iter().position(|id| *id == origin_id);
                let to = ids.iter().position(|id| *id == text(station, ID_FIELD));
                let (Some(from), Some(to)) = (from, to) else {
                    continue;
                };
                let stops = stops_between(line, ids.len(), from, to);
                best = quicker(
                    best,
                    CampusAccess {
                        station: text(station, "name").to_string(),
                        role: entry.get("role").and_then(Value::as_str).unwrap_or_default().to_string(),
                        walking_minutes,
                        lines: if stops == 0 { Vec::new() } else { vec![uint(line, "number")] },
                        stops,
                        line_changes: 0,
                        total_minutes: stops as f64 * ESTIMATED_MINUTES_PER_STOP + f64::from(walking_minutes),
                    },
                );
            }
        }

        recommendations.push(CampusRecommendation {
            campus: text(campus, "name").to_string(),
            university: text(campus, "university").to_string(),
            program: program.name,
            capacity: program.capacity,
            cutoff_score: program.cutoff_score,
            access: best,
        });
    }
    rank(&mut recommendations);
    Ok(recommendations)
}

/// Stations with a commuter-rail interchange
pub fn commuter_rail_stations(store: &DocumentStore) -> QueryResult<Vec<String>> {
    Ok(names(store.find_by_field(STATIONS, "has_commuter_rail", &json!(true))?))
}

pub fn stations_in_zone(store: &DocumentStore, zone: &str) -> QueryResult<Vec<String>> {
    Ok(names(store.find_by_field(STATIONS, "fare_zone", &json!(zone))?))
}

pub fn campuses_of_university(store: &DocumentStore, university: &str) -> QueryResult<Vec<String>> {
    Ok(names(store.find_by_field(CAMPUSES, "university", &json!(university))?))
}

/// Campuses whose primary station is the named one
pub fn campuses_near_station(store: &DocumentStore, station_name: &str) -> QueryResult<Vec<NearbyCampus>> {
    let station = find_station(store, station_name)?;
    let station_id = station.get(ID_FIELD).cloned().unwrap_or(Value::Null);
    let primary = json!(ProximityRole::Primary);

    let mut nearby = Vec::new();
    for campus in store.find_by_field(CAMPUSES, "nearby_stations.station_id", &station_id)? {
        let entries = campus.get("nearby_stations").and_then(Value::as_array).into_iter().flatten();
        for entry in entries {
            if entry.get("station_id") != Some(&station_id) || entry.get("role") != Some(&primary) {
                continue;
            }
            nearby.push(NearbyCampus {
                campus: text(campus, "name").to_string(),
                university: text(campus, "university").to_string(),
                walking_minutes: entry
                    .get("walking_minutes")
                    .and_then(Value::as_u64)
                    .and_then(|m| u32::try_from(m).ok())
                    .unwrap_or(0),
                role: ProximityRole::Primary.as_str().to_string(),
            });
        }
    }
    nearby.sort_by(|a, b| (a.walking_minutes, &a.campus).cmp(&(b.walking_minutes, &b.campus)));
    Ok(nearby)
}

/// Campuses offering a program whose name contains `needle` (any case);
/// only the matching programs are listed
pub fn campuses_offering(store: &DocumentStore, needle: &str) -> QueryResult<Vec<CampusOffer>> {
    let mut offers = Vec::new();
    for campus in store.find(CAMPUSES, |_| true)? {
        for program in programs_of(campus) {
            if contains_ci(&program.name, needle) {
                offers.push(CampusOffer {
                    campus: text(campus, "name").to_string(),
                    university: text(campus, "university").to_string(),
                    program: program.name,
                    program_type: program.program_type,
                });
            }
        }
    }
    Ok(offers)
}

/// (line number, line name, number of stops) in line-number order
pub fn station_count_per_line(store: &DocumentStore) -> QueryResult<Vec<(u32, String, usize)>> {
    let mut counts: Vec<(u32, String, usize)> = store
        .find(LINES, |_| true)?
        .into_iter()
        .map(|line| {
            let number = uint(line, "number");
            let stops = line.get("station_ids").and_then(Value::as_array).map_or(0, Vec::len);
            (number, text(line, "name").to_string(), stops)
        })
        .collect();
    counts.sort();
    Ok(counts)
}

/// Distinct stations near any campus, counted per fare zone
pub fn university_stations_per_zone(store: &DocumentStore) -> QueryResult<BTreeMap<String, usize>> {
    let stations = stations_by_id(store)?;
    let near: BTreeSet<&str> = store
        .find(CAMPUSES, |_| true)?
        .into_iter()
        .flat_map(|campus| campus.get("nearby_stations").and_then(Value::as_array).into_iter().flatten())
        .filter_map(|entry| entry.get("station_id").and_then(Value::as_str))
        .collect();

    let mut per_zone = BTreeMap::new();
    for id in near {
        if let Some(station) = stations.get(id) {
            *per_zone.entry(text(station, "fare_zone").to_string()).or_default() += 1;
        }
    }
    Ok(per_zone)
}

/// Undergraduate and graduate program counts per university
pub fn programs_per_university(store: &DocumentStore) -> QueryResult<BTreeMap<String, ProgramTally>> {
    let mut tallies: BTreeMap<String, ProgramTally> = BTreeMap::new();
    for campus in store.find(CAMPUSES, |_| true)? {
        let tally = tallies.entry(text(campus, "university").to_string()).or_default();
        for program in programs_of(campus) {
            tally.add(program.program_type);
        }
    }
    Ok(tallies)
}

/// Documents per collection and embedded programs
pub fn stats(store: &DocumentStore) -> QueryResult<StoreStats> {
    let mut entities = BTreeMap::new();
    for collection in [LINES, STATIONS, CAMPUSES] {
        entities.insert(collection.to_string(), store.count(collection)?);
    }

    let mut relations = BTreeMap::new();
    let campuses = store.find(CAMPUSES, |_| true)?;
    relations.insert(
        "programs".to_string(),
        campuses.iter().map(|c| programs_of(c).len()).sum(),
    );
    relations.insert(
        "nearby_stations".to_string(),
        campuses
            .iter()
            .filter_map(|c| c.get("nearby_stations").and_then(Value::as_array))
            .map(Vec::len)
            .sum(),
    );
    relations.insert(
        "station_ids".to_string(),
        store
            .find(LINES, |_| true)?
            .iter()
            .filter_map(|l| l.get("station_ids").and_then(Value::as_array))
            .map(Vec::len)
            .sum(),
    );

    Ok(StoreStats {
        store: "document".to_string(),
        entities,
        relations,
    })
}
