//! Graph store maintenance
//!
//! Deletes detach every relation of the removed node, so a removed station
//! takes its `HAS_STATION`, `NEXT`, `NEAR` and `INTERCHANGE` edges with it.
//! Program nodes left without an `OFFERS` edge are removed too.

use super::{CampusRef, MaintenanceError, MaintenanceResult};
use crate::dataset::CommuterRail;
use crate::graph::{EdgeId, EdgeType, GraphStore, Label, NodeId, PropertyValue};
use crate::loader::graph::{CAMPUS, LINE, NEXT, OFFERS, STATION};
use crate::queries::graph::find_station;
use std::collections::BTreeSet;
use tracing::info;

fn station(store: &GraphStore, query: &str) -> MaintenanceResult<NodeId> {
    find_station(store, query).map_err(|_| MaintenanceError::UnknownStation(query.to_string()))
}

fn campus_node(store: &GraphStore, campus: CampusRef<'_>) -> MaintenanceResult<NodeId> {
    store
        .get_nodes_by_label(&Label::new(CAMPUS))
        .into_iter()
        .find(|n| campus.matches(n.get_str("name").unwrap_or_default(), n.get_str("university").unwrap_or_default()))
        .map(|n| n.id)
        .ok_or_else(|| campus.unknown())
}

fn is_offered(store: &GraphStore, program: NodeId) -> bool {
    store.get_incoming_edges(program).iter().any(|e| e.is_type(OFFERS))
}

/// Delete a station with all its relations; returns how many were removed
pub fn remove_station(store: &mut GraphStore, query: &str) -> MaintenanceResult<usize> {
    let id = station(store, query)?;
    let relations: BTreeSet<EdgeId> = store
        .get_outgoing_edges(id)
        .into_iter()
        .chain(store.get_incoming_edges(id))
        .map(|e| e.id)
        .collect();

    let node = store.delete_node(id)?;
    info!(
        "Removed station {} with {} relation(s)",
        node.get_str("name").unwrap_or_default(),
        relations.len()
    );
    Ok(relations.len())
}

/// Delete a campus; returns how many programs it left unoffered and removed
pub fn remove_campus(store: &mut GraphStore, campus: CampusRef<'_>) -> MaintenanceResult<usize> {
    let id = campus_node(store, campus)?;
    let programs: Vec<NodeId> = store
        .get_outgoing_edges(id)
        .into_iter()
        .filter(|e| e.is_type(OFFERS))
        .map(|e| e.target)
        .collect();
    store.delete_node(id)?;

    let mut orphaned = 0;
    for program in programs {
        if !is_offered(store, program) {
            store.delete_node(program)?;
            orphaned += 1;
        }
    }
    info!("Removed campus {} and {} program(s)", campus.name, orphaned);
    Ok(orphaned)
}

/// Stop offering a program at a campus
///
/// Returns whether the program node itself went away because no campus
/// offers it any more.
pub fn remove_program(store: &mut GraphStore, campus: CampusRef<'_>, program: &str) -> MaintenanceResult<bool> {
    let campus_id = campus_node(store, campus)?;
    let offer = store
        .get_outgoing_edges(campus_id)
        .into_iter()
        .find(|e| {
            e.is_type(OFFERS)
                && store
                    .get_node(e.target)
                    .map_or(false, |p| p.get_str("name") == Some(program))
        })
        .map(|e| (e.id, e.target))
        .ok_or_else(|| MaintenanceError::UnknownProgram {
            campus: campus.name.to_string(),
            program: program.to_string(),
        })?;

    let (edge, program_id) = offer;
    store.delete_edge(edge)?;
    if is_offered(store, program_id) {
        return Ok(false);
    }
    store.delete_node(program_id)?;
    Ok(true)
}

/// Delete a line, its `NEXT` segments and its entry in station line lists
///
/// Returns the number of `NEXT` edges removed.
pub fn remove_line(store: &mut GraphStore, number: u32) -> MaintenanceResult<usize> {
    let line = store
        .find_node(&Label::new(LINE), "number", &number.into())
        .map(|n| n.id)
        .ok_or(MaintenanceError::UnknownLine(number))?;
    store.delete_node(line)?;

    let segments: Vec<EdgeId> = store
        .get_edges_by_type(&EdgeType::new(NEXT))
        .into_iter()
        .filter(|e| e.get_u32("line") == Some(number))
        .map(|e| e.id)
        .collect();
    for edge in &segments {
        store.delete_edge(*edge)?;
    }

    let served = PropertyValue::from(number);
    let stations: Vec<(NodeId, Vec<PropertyValue>)> = store
        .get_nodes_by_label(&Label::new(STATION))
        .into_iter()
        .filter_map(|n| {
            let lines = n.get_property("lines")?.as_array()?;
            lines
                .contains(&served)
                .then(|| (n.id, lines.iter().filter(|l| **l != served).cloned().collect()))
        })
        .collect();
    for (id, lines) in stations {
        store.set_node_property(id, "lines", lines)?;
    }

    info!("Removed line {} with {} segment(s)", number, segments.len());
    Ok(segments.len())
}

/// Move a station to another fare zone; returns the previous zone
pub fn set_fare_zone(store: &mut GraphStore, query: &str, zone: &str) -> MaintenanceResult<Option<String>> {
    let id = station(store, query)?;
    let previous = store.set_node_property(id, "fare_zone", zone)?;
    Ok(previous.and_then(|p| p.as_string().map(str::to_string)))
}

/// Give a station a commuter-rail interchange it did not have
pub fn add_commuter_rail(store: &mut GraphStore, query: &str, rail: &CommuterRail) -> MaintenanceResult<()> {
    let id = station(store, query)?;
    if let Some(node) = store.get_node(id) {
        if node.get_property("has_commuter_rail").and_then(PropertyValue::as_boolean) == Some(true) {
            return Err(MaintenanceError::CommuterRailPresent(
                node.get_str("name").unwrap_or_default().to_string(),
            ));
        }
    }
    store.set_node_property(id, "has_commuter_rail", true)?;
    store.set_node_property(id, "commuter_rail_name", rail.name.as_str())?;
    store.set_node_property(id, "commuter_rail_lines", rail.lines.as_slice())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Campus, Line, Program, ProgramType, Proximity, ProximityRole, RecordSet, Station};
    use crate::loader::graph::{HAS_STATION, INTERCHANGE, NEAR, PROGRAM};
    use crate::loader::{GraphTarget, PhasedLoader};
    use crate::queries;
    use crate::topology::TopologyConfig;

    /// x - y - z on line 1, y - w on line 2; two campuses share one program
    fn loaded() -> GraphStore {
        let shared = Program::new("Grado en Derecho", ProgramType::Undergraduate);
        let mut near_y = Campus::new("Campus Y", "UPM");
        near_y.programs.push(shared.clone());
        near_y.programs.push(Program::new("Grado en Arquitectura", ProgramType::Undergraduate));
        near_y.nearby_stations.push(Proximity::new("y", 4, ProximityRole::Primary));
        let mut near_w = Campus::new("Campus W", "UCM");
        near_w.programs.push(shared);
        near_w.nearby_stations.push(Proximity::new("w", 2, ProximityRole::Primary));

        let records = RecordSet::new(
            vec![Line::new(1, "L1", &["x", "y", "z"]), Line::new(2, "L2", &["y", "w"])],
            vec![
                Station::new("x", "X", &[1]),
                Station::new("y", "Y", &[1, 2]),
                Station::new("z", "Z", &[1]),
                Station::new("w", "W", &[2]),
            ],
            vec![near_y, near_w],
        );
        let mut target = GraphTarget::new();
        let report = PhasedLoader::new(&mut target, TopologyConfig::default())
            .load(&records)
            .unwrap();
        assert!(report.is_clean());
        target.into_store()
    }

    fn edges(store: &GraphStore, edge_type: &str) -> usize {
        store.edge_type_count(&EdgeType::new(edge_type))
    }

    #[test]
    fn test_remove_station_detaches_everything() {
        let mut store = loaded();
        assert_eq!(edges(&store, NEXT), 6);
        assert_eq!(edges(&store, INTERCHANGE), 1);

        // 2 HAS_STATION, 6 NEXT in and out, 1 INTERCHANGE loop, 1 NEAR
        assert_eq!(remove_station(&mut store, "Y"), Ok(10));
        assert_eq!(edges(&store, HAS_STATION), 3);
        assert_eq!(edges(&store, NEXT), 0);
        assert_eq!(edges(&store, INTERCHANGE), 0);
        assert_eq!(edges(&store, NEAR), 1);
        assert_eq!(queries::graph::stations_on_line(&store, 1).unwrap(), vec!["X", "Z"]);
        assert_eq!(queries::graph::shortest_route(&store, "x", "z").unwrap(), None);

        assert_eq!(
            remove_station(&mut store, "y"),
            Err(MaintenanceError::UnknownStation("y".into()))
        );
    }

    #[test]
    fn test_shared_program_survives_until_last_campus() {
        let mut store = loaded();
        assert_eq!(store.label_count(&Label::new(PROGRAM)), 2);

        let campus_y = CampusRef::new("Campus Y", "upm");
        assert_eq!(remove_program(&mut store, campus_y, "Grado en Derecho"), Ok(false));
        assert_eq!(queries::graph::campuses_offering(&store, "derecho").len(), 1);
        assert!(matches!(
            remove_program(&mut store, campus_y, "Grado en Derecho"),
            Err(MaintenanceError::UnknownProgram { .. })
        ));

        // Arquitectura was only offered at Campus Y
        assert_eq!(remove_campus(&mut store, campus_y), Ok(1));
        assert_eq!(store.label_count(&Label::new(PROGRAM)), 1);
        assert_eq!(remove_campus(&mut store, CampusRef::new("Campus W", "UCM")), Ok(1));
        assert_eq!(store.label_count(&Label::new(PROGRAM)), 0);
        assert_eq!(edges(&store, OFFERS), 0);
    }

    #[test]
    fn test_remove_line() {
        let mut store = loaded();
        assert_eq!(remove_line(&mut store, 2), Ok(2));
        assert_eq!(remove_line(&mut store, 2), Err(MaintenanceError::UnknownLine(2)));
        assert_eq!(edges(&store, NEXT), 4);
        assert_eq!(edges(&store, HAS_STATION), 3);

        let y = store.find_node(&Label::new(STATION), "slug", &"y".into()).unwrap();
        assert_eq!(y.get_property("lines"), Some(&PropertyValue::Array(vec![1u32.into()])));
    }

    #[test]
    fn test_station_updates() {
        let mut store = loaded();
        assert_eq!(set_fare_zone(&mut store, "z", "B2"), Ok(Some("A".to_string())));
        let zoned = store.find_nodes(&Label::new(STATION), "fare_zone", &"B2".into());
        assert_eq!(zoned.len(), 1);

        let rail = CommuterRail {
            name: "Z-Cercanías".into(),
            lines: vec!["C-1".into(), "C-10".into()],
        };
        add_commuter_rail(&mut store, "z", &rail).unwrap();
        assert_eq!(
            add_commuter_rail(&mut store, "Z", &rail),
            Err(MaintenanceError::CommuterRailPresent("Z".into()))
        );
        let commuter = store.find_nodes(&Label::new(STATION), "has_commuter_rail", &true.into());
        assert_eq!(commuter.len(), 1);
    }
}
