//! Graph store target
//!
//! Schema:
//! - `(:Line {number, name, color, length_km, circular})`
//! - `(:Station {slug, name, fare_zone, lat, lng, has_commuter_rail, ...})`
//! - `(:Campus {name, university, address})`
//! - `(:Program {name, type, field, credits, ...})`, one per (name, type)
//! - `(:Line)-[:HAS_STATION {position}]->(:Station)`
//! - `(:Campus)-[:NEAR {walking_minutes, role}]->(:Station)`
//! - `(:Campus)-[:OFFERS]->(:Program)`
//! - `(:Station)-[:NEXT {line, travel_minutes}]->(:Station)`
//! - `(:Station)-[:INTERCHANGE {change_minutes}]->(:Station)`

use super::target::{Capabilities, TargetStore};
use crate::dataset::{Campus, Line, Program, Proximity, Station};
use crate::error::{StoreError, StoreResult};
use crate::graph::{EdgeType, GraphStore, Label, NodeId, PropertyMap, PropertyValue};
use crate::topology::{Adjacency, Interchange};
use crate::verify::{CountKey, StoreCounts};
use tracing::debug;

pub const LINE: &str = "Line";
pub const STATION: &str = "Station";
pub const CAMPUS: &str = "Campus";
pub const PROGRAM: &str = "Program";

pub const HAS_STATION: &str = "HAS_STATION";
pub const NEAR: &str = "NEAR";
pub const OFFERS: &str = "OFFERS";
pub const NEXT: &str = "NEXT";
pub const INTERCHANGE: &str = "INTERCHANGE";

const UNIQUE_KEYS: [(&str, &str); 3] = [(LINE, "number"), (STATION, "slug"), (CAMPUS, "name")];

const SECONDARY_INDEXES: [(&str, &str); 5] = [
    (STATION, "name"),
    (STATION, "fare_zone"),
    (STATION, "has_commuter_rail"),
    (CAMPUS, "university"),
    (PROGRAM, "name"),
];

fn props<const N: usize>(entries: [(&str, PropertyValue); N]) -> PropertyMap {
    entries
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// [`TargetStore`] over an owned [`GraphStore`]
#[derive(Debug, Default)]
pub struct GraphTarget {
    store: GraphStore,
}

impl GraphTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: GraphStore) -> Self {
        GraphTarget { store }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn into_store(self) -> GraphStore {
        self.store
    }

    fn relate(&mut self, from: NodeId, to: NodeId, edge_type: &str, properties: PropertyMap) -> StoreResult<()> {
        self.store
            .create_edge_with_properties(from, to, edge_type, properties)?;
        Ok(())
    }
}

impl TargetStore for GraphTarget {
    type Id = NodeId;

    fn name(&self) -> &'static str {
        "graph"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            program_entities: true,
            derived_topology: true,
        }
    }

    fn clear(&mut self) -> StoreResult<()> {
        for label in [LINE, STATION, CAMPUS, PROGRAM] {
            let removed = self.store.detach_delete_label(&Label::new(label))?;
            debug!("Removed {} :{} nodes", removed, label);
        }
        Ok(())
    }

    fn insert_line(&mut self, line: &Line) -> StoreResult<NodeId> {
        let properties = props([
            ("number", line.number.into()),
            ("name", line.name.as_str().into()),
            ("color", line.color.as_str().into()),
            ("length_km", line.length_km.into()),
            ("circular", line.circular.into()),
        ]);
        Ok(self
            .store
            .create_node_with_properties(vec![Label::new(LINE)], properties)?)
    }

    fn insert_station(&mut self, station: &Station) -> StoreResult<NodeId> {
        let lines: Vec<PropertyValue> = station.lines.iter().map(|l| (*l).into()).collect();
        let properties = props([
            ("slug", station.slug.as_str().into()),
            ("name", station.name.as_str().into()),
            ("fare_zone", station.fare_zone.as_str().into()),
            ("lat", station.coordinates.lat.into()),
            ("lng", station.coordinates.lng.into()),
            ("has_commuter_rail", station.has_commuter_rail.into()),
            (
                "commuter_rail_name",
                station.commuter_rail.as_ref().map(|c| c.name.as_str()).into(),
            ),
            (
                "commuter_rail_lines",
                station.commuter_rail.as_ref().map(|c| c.lines.as_slice()).into(),
            ),
            ("lines", lines.into()),
        ]);
        Ok(self
            .store
            .create_node_with_properties(vec![Label::new(STATION)], properties)?)
    }

    fn insert_campus(&mut self, campus: &Campus) -> StoreResult<NodeId> {
        let properties = props([
            ("name", campus.name.as_str().into()),
            ("university", campus.university.as_str().into()),
            ("address", campus.address.as_str().into()),
        ]);
        Ok(self
            .store
            .create_node_with_properties(vec![Label::new(CAMPUS)], properties)?)
    }

    fn get_or_create_program(&mut self, program: &Program) -> StoreResult<(NodeId, bool)> {
        let key = props([
            ("name", program.name.as_str().into()),
            ("type", program.program_type.as_str().into()),
        ]);
        let on_create = props([
            ("field", program.field.as_deref().into()),
            ("credits", program.credits.into()),
            ("capacity", program.capacity.into()),
            ("cutoff_score", program.cutoff_score.into()),
            ("duration_years", program.duration_years.into()),
            ("duration_months", program.duration_months.into()),
        ]);
        Ok(self.store.merge_node(PROGRAM, key, on_create)?)
    }

    fn attach_stops(&mut self, line: NodeId, stops: &[NodeId]) -> StoreResult<()> {
        if !self.store.has_node(line) {
            return Err(StoreError::NotFound(format!("line node {}", line)));
        }
        for (position, station) in stops.iter().enumerate() {
            self.relate(line, *station, HAS_STATION, props([("position", position.into())]))?;
        }
        Ok(())
    }

    fn attach_proximity(&mut self, campus: NodeId, station: NodeId, proximity: &Proximity) -> StoreResult<()> {
        let properties = props([
            ("walking_minutes", proximity.walking_minutes.into()),
            ("role", proximity.role.as_str().into()),
        ]);
        self.relate(campus, station, NEAR, properties)
    }

    fn attach_program(&mut self, campus: NodeId, program: NodeId) -> StoreResult<()> {
        self.relate(campus, program, OFFERS, PropertyMap::new())
    }

    fn attach_adjacency(&mut self, from: NodeId, to: NodeId, adjacency: &Adjacency) -> StoreResult<()> {
        let properties = props([
            ("line", adjacency.line.into()),
            ("travel_minutes", adjacency.travel_minutes.into()),
        ]);
        self.relate(from, to, NEXT, properties)
    }

    fn attach_interchange(&mut self, from: NodeId, to: NodeId, interchange: &Interchange) -> StoreResult<()> {
        self.relate(
            from,
            to,
            INTERCHANGE,
            props([("change_minutes", interchange.change_minutes.into())]),
        )
    }

    fn create_indexes(&mut self) -> StoreResult<()> {
        for (label, property) in UNIQUE_KEYS {
            self.store.create_unique_constraint(label, property)?;
        }
        for (label, property) in SECONDARY_INDEXES {
            self.store.create_index(label, property)?;
        }
        debug!("Graph indexes: {}", self.store.property_index().keys().len());
        Ok(())
    }

    fn counts(&self) -> StoreResult<StoreCounts> {
        if !self.store.is_open() {
            return Err(StoreError::Unavailable("graph store is closed".to_string()));
        }
        let labels = |l: &str| self.store.label_count(&Label::new(l));
        let edges = |t: &str| self.store.edge_type_count(&EdgeType::new(t));

        let mut counts = StoreCounts::new();
        counts.set(CountKey::Lines, labels(LINE));
        counts.set(CountKey::Stations, labels(STATION));
        counts.set(CountKey::Campuses, labels(CAMPUS));
        counts.set(CountKey::Programs, labels(PROGRAM));
        counts.set(CountKey::LineStops, edges(HAS_STATION));
        counts.set(CountKey::Proximities, edges(NEAR));
        counts.set(CountKey::Offers, edges(OFFERS));
        counts.set(CountKey::Adjacencies, edges(NEXT));
        counts.set(CountKey::Interchanges, edges(INTERCHANGE));
        Ok(counts)
    }
}
