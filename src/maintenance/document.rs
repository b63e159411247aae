//! Document store maintenance

use super::{CampusRef, MaintenanceError, MaintenanceResult};
use crate::dataset::{Campus, CommuterRail, Line, Program, ProgramType, Station};
use crate::document::{Document, DocumentId, DocumentStore, UpdateOp};
use crate::loader::document::{campus_document, line_document, proximity_entry, CAMPUSES, LINES, STATIONS};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Documents that referenced a removed station
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StationRemoval {
    pub station: String,
    /// Lines whose `station_ids` held it
    pub lines: Vec<u32>,
    /// Campuses that listed it among `nearby_stations`
    pub campuses: Vec<String>,
}

fn text<'a>(doc: &'a Document, field: &str) -> &'a str {
    doc.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn id_of(doc: &Document, collection: &str) -> MaintenanceResult<DocumentId> {
    DocumentId::of(doc).ok_or_else(|| MaintenanceError::Serialization(format!("{} document without an id", collection)))
}

fn find_station<'a>(store: &'a DocumentStore, query: &str) -> MaintenanceResult<(DocumentId, &'a Document)> {
    let wanted = query.to_lowercase();
    let doc = store
        .find(STATIONS, |doc| text(doc, "slug") == query || text(doc, "name").to_lowercase() == wanted)?
        .into_iter()
        .next()
        .ok_or_else(|| MaintenanceError::UnknownStation(query.to_string()))?;
    Ok((id_of(doc, STATIONS)?, doc))
}

fn find_line(store: &DocumentStore, number: u32) -> MaintenanceResult<Option<(DocumentId, &Document)>> {
    match store.find_by_field(LINES, "number", &json!(number))?.into_iter().next() {
        Some(doc) => Ok(Some((id_of(doc, LINES)?, doc))),
        None => Ok(None),
    }
}

fn find_campus<'a>(store: &'a DocumentStore, campus: CampusRef<'_>) -> MaintenanceResult<(DocumentId, &'a Document)> {
    let doc = store
        .find(CAMPUSES, |doc| campus.matches(text(doc, "name"), text(doc, "university")))?
        .into_iter()
        .next()
        .ok_or_else(|| campus.unknown())?;
    Ok((id_of(doc, CAMPUSES)?, doc))
}

fn programs(doc: &Document) -> Vec<Value> {
    doc.get("programs").and_then(Value::as_array).cloned().unwrap_or_default()
}

fn resolve_station_id(store: &DocumentStore, slug: &str) -> MaintenanceResult<DocumentId> {
    let doc = store
        .find_by_field(STATIONS, "slug", &json!(slug))?
        .into_iter()
        .next()
        .ok_or_else(|| MaintenanceError::UnknownStation(slug.to_string()))?;
    id_of(doc, STATIONS)
}

/// Insert a line; any stops it lists must already be stations
pub fn add_line(store: &mut DocumentStore, line: &Line) -> MaintenanceResult<DocumentId> {
    if find_line(store, line.number)?.is_some() {
        return Err(MaintenanceError::AlreadyExists(format!("line {}", line.number)));
    }
    let stops = line
        .stations
        .iter()
        .map(|slug| resolve_station_id(store, slug).map(|id| id.to_value()))
        .collect::<MaintenanceResult<Vec<Value>>>()?;

    let mut doc = line_document(line);
    doc["station_ids"] = Value::Array(stops);
    let id = store.insert_one(LINES, doc)?;
    info!("Added line {} ({} stops)", line.number, line.stations.len());
    Ok(id)
}

/// Insert several lines independently; one result per line, in order
pub fn add_lines(store: &mut DocumentStore, lines: &[Line]) -> Vec<MaintenanceResult<DocumentId>> {
    lines.iter().map(|line| add_line(store, line)).collect()
}

/// Insert a station and splice it into each of its lines' stop lists
///
/// The station goes at its `line_positions` ordinal, or last when it has
/// none. Lines not in the store are skipped.
pub fn register_station(store: &mut DocumentStore, station: &Station) -> MaintenanceResult<DocumentId> {
    if !store.find_by_field(STATIONS, "slug", &json!(station.slug))?.is_empty() {
        return Err(MaintenanceError::AlreadyExists(format!("station {}", station.slug)));
    }
    let id = store.insert_one(STATIONS, serde_json::to_value(station)?)?;

    for number in station.distinct_lines() {
        let Some((line_id, line)) = find_line(store, number)? else {
            warn!("Station {} names unknown line {}", station.slug, number);
            continue;
        };
        let len = line.get("station_ids").and_then(Value::as_array).map_or(0, Vec::len);
        let position = station.line_positions.get(&number).copied().unwrap_or(len);
        store.update_by_id(
            LINES,
            line_id,
            &[UpdateOp::InsertAt("station_ids".to_string(), position, id.to_value())],
        )?;
    }
    info!("Registered station {}", station.slug);
    Ok(id)
}

/// Insert a campus with its programs and nearby stations
///
/// Every nearby station must exist; nothing is written otherwise.
pub fn add_campus(store: &mut DocumentStore, campus: &Campus) -> MaintenanceResult<DocumentId> {
    let exists = store
        .find(CAMPUSES, |doc| text(doc, "name") == campus.name && text(doc, "university") == campus.university)?
        .into_iter()
        .next()
        .is_some();
    if exists {
        return Err(MaintenanceError::AlreadyExists(format!("campus {}", campus.name)));
    }

    let nearby = campus
        .nearby_stations
        .iter()
        .map(|proximity| resolve_station_id(store, &proximity.station).map(|id| proximity_entry(id, proximity)))
        .collect::<MaintenanceResult<Vec<Value>>>()?;

    let mut doc = campus_document(campus)?;
    doc["nearby_stations"] = Value::Array(nearby);
    let id = store.insert_one(CAMPUSES, doc)?;
    info!("Added campus {} with {} program(s)", campus.name, campus.programs.len());
    Ok(id)
}

/// Set one field of an embedded program, returning its previous value
fn update_program(
    store: &mut DocumentStore,
    campus: CampusRef<'_>,
    program: &str,
    field: &str,
    value: Value,
) -> MaintenanceResult<Option<Value>> {
    let (id, doc) = find_campus(store, campus)?;
    let mut entries = programs(doc);
    let entry = entries
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|p| p.get("name").and_then(Value::as_str) == Some(program))
        .ok_or_else(|| MaintenanceError::UnknownProgram {
            campus: campus.name.to_string(),
            program: program.to_string(),
        })?;
    let previous = entry.insert(field.to_string(), value);

    store.update_by_id(CAMPUSES, id, &[UpdateOp::Set("programs".to_string(), Value::Array(entries))])?;
    Ok(previous)
}

/// Change a program's admission cutoff score; returns the previous score
pub fn set_cutoff_score(
    store: &mut DocumentStore,
    campus: CampusRef<'_>,
    program: &str,
    score: f64,
) -> MaintenanceResult<Option<f64>> {
    let previous = update_program(store, campus, program, "cutoff_score", json!(score))?;
    Ok(previous.as_ref().and_then(Value::as_f64))
}

/// Change a program's number of places; returns the previous capacity
pub fn set_program_capacity(
    store: &mut DocumentStore,
    campus: CampusRef<'_>,
    program: &str,
    capacity: u32,
) -> MaintenanceResult<Option<u32>> {
    let previous = update_program(store, campus, program, "capacity", json!(capacity))?;
    Ok(previous
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|c| u32::try_from(c).ok()))
}

/// Append a graduate program to a campus
pub fn add_graduate_program(store: &mut DocumentStore, campus: CampusRef<'_>, program: &Program) -> MaintenanceResult<()> {
    if program.program_type != ProgramType::Graduate {
        return Err(MaintenanceError::NotGraduate(program.name.clone()));
    }
    let (id, doc) = find_campus(store, campus)?;
    let offered = programs(doc)
        .iter()
        .any(|p| p.get("name").and_then(Value::as_str) == Some(program.name.as_str()));
    if offered {
        return Err(MaintenanceError::AlreadyExists(format!("{} at {}", program.name, campus.name)));
    }

    store.update_by_id(CAMPUSES, id, &[UpdateOp::Push("programs".to_string(), serde_json::to_value(program)?)])?;
    Ok(())
}

/// Drop a program from a campus
pub fn remove_program(store: &mut DocumentStore, campus: CampusRef<'_>, program: &str) -> MaintenanceResult<()> {
    let (id, doc) = find_campus(store, campus)?;
    let offered = programs(doc)
        .iter()
        .any(|p| p.get("name").and_then(Value::as_str) == Some(program));
    if !offered {
        return Err(MaintenanceError::UnknownProgram {
            campus: campus.name.to_string(),
            program: program.to_string(),
        });
    }

    store.update_by_id(CAMPUSES, id, &[UpdateOp::Pull("programs".to_string(), json!({ "name": program }))])?;
    Ok(())
}

/// Give a station a commuter-rail interchange it did not have
pub fn add_commuter_rail(store: &mut DocumentStore, station: &str, rail: &CommuterRail) -> MaintenanceResult<()> {
    let (id, doc) = find_station(store, station)?;
    if doc.get("has_commuter_rail").and_then(Value::as_bool).unwrap_or(false) {
        return Err(MaintenanceError::CommuterRailPresent(text(doc, "name").to_string()));
    }

    store.update_by_id(
        STATIONS,
        id,
        &[
            UpdateOp::Set("has_commuter_rail".to_string(), Value::Bool(true)),
            UpdateOp::Set("commuter_rail".to_string(), serde_json::to_value(rail)?),
        ],
    )?;
    Ok(())
}

/// Move a station to another fare zone; returns the previous zone
pub fn set_fare_zone(store: &mut DocumentStore, station: &str, zone: &str) -> MaintenanceResult<String> {
    let (id, doc) = find_station(store, station)?;
    let previous = text(doc, "fare_zone").to_string();
    store.update_by_id(STATIONS, id, &[UpdateOp::Set("fare_zone".to_string(), json!(zone))])?;
    Ok(previous)
}

/// Delete a station and every reference to it
pub fn remove_station(store: &mut DocumentStore, station: &str) -> MaintenanceResult<StationRemoval> {
    let (id, doc) = find_station(store, station)?;
    let mut removal = StationRemoval {
        station: text(doc, "name").to_string(),
        ..StationRemoval::default()
    };
    let reference = id.to_value();
    store.delete_one(STATIONS, id)?;

    let lines: Vec<(DocumentId, u32)> = store
        .find(LINES, |line| {
            line.get("station_ids")
                .and_then(Value::as_array)
                .map_or(false, |ids| ids.contains(&reference))
        })?
        .into_iter()
        .filter_map(|line| {
            let number = line.get("number").and_then(Value::as_u64)?;
            Some((DocumentId::of(line)?, u32::try_from(number).ok()?))
        })
        .collect();
    for (line_id, number) in lines {
        store.update_by_id(LINES, line_id, &[UpdateOp::Pull("station_ids".to_string(), reference.clone())])?;
        removal.lines.push(number);
    }

    let campuses: Vec<(DocumentId, String)> = store
        .find_by_field(CAMPUSES, "nearby_stations.station_id", &reference)?
        .into_iter()
        .filter_map(|campus| Some((DocumentId::of(campus)?, text(campus, "name").to_string())))
        .collect();
    for (campus_id, name) in campuses {
        store.update_by_id(
            CAMPUSES,
            campus_id,
            &[UpdateOp::Pull("nearby_stations".to_string(), json!({ "station_id": reference.clone() }))],
        )?;
        removal.campuses.push(name);
    }

    info!(
        "Removed station {} from {} line(s) and {} campus(es)",
        removal.station,
        removal.lines.len(),
        removal.campuses.len()
    );
    Ok(removal)
}

/// Delete a campus with its embedded programs
pub fn remove_campus(store: &mut DocumentStore, campus: CampusRef<'_>) -> MaintenanceResult<()> {
    let (id, _) = find_campus(store, campus)?;
    store.delete_one(CAMPUSES, id)?;
    info!("Removed campus {}", campus.name);
    Ok(())
}

/// Delete a line and strip it from its stations' line lists
///
/// Returns the number of stations updated.
pub fn remove_line(store: &mut DocumentStore, number: u32) -> MaintenanceResult<usize> {
    let (id, _) = find_line(store, number)?.ok_or(MaintenanceError::UnknownLine(number))?;
    store.delete_one(LINES, id)?;

    let served: Vec<(DocumentId, Value)> = store
        .find_by_field(STATIONS, "lines", &json!(number))?
        .into_iter()
        .filter_map(|station| {
            let mut positions = station.get("line_positions").cloned().unwrap_or_else(|| json!({}));
            if let Some(map) = positions.as_object_mut() {
                map.remove(&number.to_string());
            }
            Some((DocumentId::of(station)?, positions))
        })
        .collect();
    for (station_id, positions) in &served {
        store.update_by_id(
            STATIONS,
            *station_id,
            &[
                UpdateOp::Pull("lines".to_string(), json!(number)),
                UpdateOp::Set("line_positions".to_string(), positions.clone()),
            ],
        )?;
    }

    info!("Removed line {} from {} station(s)", number, served.len());
    Ok(served.len())
}
