//! Document store target
//!
//! Collections `lines`, `stations` and `campuses`. Programs stay embedded
//! in their campus document. Pass 2 patches references in as document ids:
//! `lines.station_ids` (ordered) and `campuses.nearby_stations[].station_id`.

use super::target::{Capabilities, TargetStore};
use crate::dataset::{Campus, Line, Proximity, Station};
use crate::document::{Document, DocumentId, DocumentStore, UpdateOp};
use crate::error::{StoreError, StoreResult};
use crate::verify::{CountKey, StoreCounts};
use serde_json::{json, Value};

pub const LINES: &str = "lines";
pub const STATIONS: &str = "stations";
pub const CAMPUSES: &str = "campuses";

/// (collection, field, unique)
const INDEXES: [(&str, &str, bool); 8] = [
    (LINES, "number", true),
    (STATIONS, "slug", true),
    (CAMPUSES, "name", true),
    (STATIONS, "name", false),
    (STATIONS, "fare_zone", false),
    (STATIONS, "has_commuter_rail", false),
    (CAMPUSES, "university", false),
    (CAMPUSES, "nearby_stations.station_id", false),
];

fn array_len(doc: &Document, field: &str) -> usize {
    doc.get(field).and_then(Value::as_array).map(Vec::len).unwrap_or(0)
}

/// Line document without its stops
pub(crate) fn line_document(line: &Line) -> Value {
    let mut doc = json!({
        "number": line.number,
        "name": line.name,
        "color": line.color,
        "circular": line.circular,
    });
    if let Some(length) = line.length_km {
        doc["length_km"] = json!(length);
    }
    doc
}

/// Campus document with embedded programs and no nearby stations yet
pub(crate) fn campus_document(campus: &Campus) -> serde_json::Result<Value> {
    Ok(json!({
        "name": campus.name,
        "university": campus.university,
        "address": campus.address,
        "programs": serde_json::to_value(&campus.programs)?,
        "nearby_stations": [],
    }))
}

/// `nearby_stations` element referencing a station document
pub(crate) fn proximity_entry(station: DocumentId, proximity: &Proximity) -> Value {
    json!({
        "station_id": station.to_value(),
        "walking_minutes": proximity.walking_minutes,
        "role": proximity.role,
    })
}

/// [`TargetStore`] over an owned [`DocumentStore`]
#[derive(Debug, Default)]
pub struct DocumentTarget {
    store: DocumentStore,
}

impl DocumentTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: DocumentStore) -> Self {
        DocumentTarget { store }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DocumentStore {
        &mut self.store
    }

    pub fn into_store(self) -> DocumentStore {
        self.store
    }

    fn sum_arrays(&self, collection: &str, field: &str) -> StoreResult<usize> {
        Ok(self
            .store
            .find(collection, |_| true)?
            .into_iter()
            .map(|doc| array_len(doc, field))
            .sum())
    }
}

impl TargetStore for DocumentTarget {
    type Id = DocumentId;

    fn name(&self) -> &'static str {
        "document"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            program_entities: false,
            derived_topology: false,
        }
    }

    fn clear(&mut self) -> StoreResult<()> {
        for collection in [LINES, STATIONS, CAMPUSES] {
            self.store.drop_collection(collection)?;
        }
        Ok(())
    }

    fn insert_line(&mut self, line: &Line) -> StoreResult<DocumentId> {
        Ok(self.store.insert_one(LINES, line_document(line))?)
    }

    fn insert_station(&mut self, station: &Station) -> StoreResult<DocumentId> {
        let doc = serde_json::to_value(station)?;
        Ok(self.store.insert_one(STATIONS, doc)?)
    }

    fn insert_campus(&mut self, campus: &Campus) -> StoreResult<DocumentId> {
        Ok(self.store.insert_one(CAMPUSES, campus_document(campus)?)?)
    }

    fn attach_stops(&mut self, line: DocumentId, stops: &[DocumentId]) -> StoreResult<()> {
        let ids: Vec<Value> = stops.iter().map(DocumentId::to_value).collect();
        self.store
            .update_by_id(LINES, line, &[UpdateOp::Set("station_ids".to_string(), Value::Array(ids))])?;
        Ok(())
    }

    fn attach_proximity(&mut self, campus: DocumentId, station: DocumentId, proximity: &Proximity) -> StoreResult<()> {
        let entry = proximity_entry(station, proximity);
        self.store
            .update_by_id(CAMPUSES, campus, &[UpdateOp::Push("nearby_stations".to_string(), entry)])?;
        Ok(())
    }

    fn create_indexes(&mut self) -> StoreResult<()> {
        for (collection, field, unique) in INDEXES {
            self.store.create_index(collection, field, unique)?;
        }
        Ok(())
    }

    fn counts(&self) -> StoreResult<StoreCounts> {
        if !self.store.is_open() {
            return Err(StoreError::Unavailable("document store is closed".to_string()));
        }
        let mut counts = StoreCounts::new();
        counts.set(CountKey::Lines, self.store.count(LINES)?);
        counts.set(CountKey::Stations, self.store.count(STATIONS)?);
        counts.set(CountKey::Campuses, self.store.count(CAMPUSES)?);
        counts.set(CountKey::Programs, self.sum_arrays(CAMPUSES, "programs")?);
        counts.set(CountKey::LineStops, self.sum_arrays(LINES, "station_ids")?);
        counts.set(CountKey::Proximities, self.sum_arrays(CAMPUSES, "nearby_stations")?);
        Ok(counts)
    }
}
