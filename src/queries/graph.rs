//! Graph store queries
//!
//! Routes follow `NEXT` edges only; a route reports the line used for each
//! hop, staying on the previous hop's line whenever it continues.

use super::{
    contains_ci, quicker, rank, CampusAccess, CampusOffer, CampusRecommendation, NearbyCampus, QueryError,
    QueryResult, StoreStats,
};
use crate::algo::{all_shortest_paths, bfs, bounded_paths, dijkstra, PathResult};
use crate::dataset::ProgramType;
use crate::graph::{Edge, GraphStore, Label, Node, NodeId, PropertyValue};
use crate::loader::graph::{CAMPUS, HAS_STATION, LINE, NEAR, NEXT, OFFERS, PROGRAM, STATION};
use serde::Serialize;

/// A journey between two stations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Station names, origin first
    pub stations: Vec<String>,
    /// Line taken for each hop
    pub lines: Vec<u32>,
    pub hops: usize,
    pub line_changes: usize,
    pub total_minutes: u32,
}

fn name_of(node: &Node) -> String {
    node.get_str("name").unwrap_or_default().to_string()
}

/// Resolve a station by slug, or by case-insensitive name
pub fn find_station(store: &GraphStore, query: &str) -> QueryResult<NodeId> {
    let label = Label::new(STATION);
    if let Some(node) = store.find_node(&label, "slug", &query.into()) {
        return Ok(node.id);
    }
    let wanted = query.to_lowercase();
    store
        .get_nodes_by_label(&label)
        .into_iter()
        .find(|n| n.get_str("name").map(str::to_lowercase).as_deref() == Some(wanted.as_str()))
        .map(|n| n.id)
        .ok_or_else(|| QueryError::UnknownStation(query.to_string()))
}

fn route_from_path(store: &GraphStore, path: &[NodeId]) -> Route {
    let mut lines: Vec<u32> = Vec::with_capacity(path.len().saturating_sub(1));
    let mut total_minutes = 0;

    for hop in path.windows(2) {
        let candidates: Vec<&Edge> = store
            .get_outgoing_edges(hop[0])
            .into_iter()
            .filter(|e| e.is_type(NEXT) && e.target == hop[1])
            .collect();

        let previous = lines.last().copied();
        let chosen = candidates
            .iter()
            .find(|e| previous.is_some() && e.get_u32("line") == previous)
            .or_else(|| {
                candidates.iter().min_by_key(|e| {
                    (
                        e.get_u32("travel_minutes").unwrap_or(u32::MAX),
                        e.get_u32("line"),
                    )
                })
            });

        if let Some(edge) = chosen {
            if let Some(line) = edge.get_u32("line") {
                lines.push(line);
            }
            total_minutes += edge.get_u32("travel_minutes").unwrap_or(0);
        }
    }

    let line_changes = lines.windows(2).filter(|w| w[0] != w[1]).count();
    Route {
        stations: path
            .iter()
            .filter_map(|id| store.get_node(*id))
            .map(name_of)
            .collect(),
        lines,
        hops: path.len().saturating_sub(1),
        line_changes,
        total_minutes,
    }
}

fn routes(store: &GraphStore, paths: Vec<PathResult>) -> Vec<Route> {
    paths.iter().map(|p| route_from_path(store, &p.path)).collect()
}

/// Fewest-stops route between two stations
pub fn shortest_route(store: &GraphStore, from: &str, to: &str) -> QueryResult<Option<Route>> {
    let (source, target) = (find_station(store, from)?, find_station(store, to)?);
    Ok(bfs(store, source, target, Some(NEXT)).map(|p| route_from_path(store, &p.path)))
}

/// Route minimising total `travel_minutes`
pub fn fastest_route(store: &GraphStore, from: &str, to: &str) -> QueryResult<Option<Route>> {
    let (source, target) = (find_station(store, from)?, find_station(store, to)?);
    Ok(dijkstra(store, source, target, "travel_minutes", Some(NEXT)).map(|p| route_from_path(store, &p.path)))
}

/// Every fewest-stops route
pub fn all_shortest_routes(store: &GraphStore, from: &str, to: &str) -> QueryResult<Vec<Route>> {
    let (source, target) = (find_station(store, from)?, find_station(store, to)?);
    Ok(routes(store, all_shortest_paths(store, source, target, Some(NEXT))))
}

/// Routes of at most `max_hops` stops that never revisit a station
pub fn routes_within(store: &GraphStore, from: &str, to: &str, max_hops: usize) -> QueryResult<Vec<Route>> {
    let (source, target) = (find_station(store, from)?, find_station(store, to)?);
    Ok(routes(store, bounded_paths(store, source, target, max_hops, Some(NEXT))))
}

/// Station names of a line in stop order
pub fn stations_on_line(store: &GraphStore, number: u32) -> QueryResult<Vec<String>> {
    let line = store
        .find_node(&Label::new(LINE), "number", &number.into())
        .ok_or(QueryError::UnknownLine(number))?;

    let mut stops: Vec<(i64, NodeId)> = store
        .get_outgoing_edges(line.id)
        .into_iter()
        .filter(|e| e.is_type(HAS_STATION))
        .map(|e| {
            let position = e.get_property("position").and_then(PropertyValue::as_integer);
            (position.unwrap_or(i64::MAX), e.target)
        })
        .collect();
    stops.sort();

    Ok(stops
        .into_iter()
        .filter_map(|(_, id)| store.get_node(id))
        .map(name_of)
        .collect())
}

/// Campuses offering a program whose name contains `needle` (any case)
pub fn campuses_offering(store: &GraphStore, needle: &str) -> Vec<CampusOffer> {
    let mut offers = Vec::new();
    for program in store.get_nodes_by_label(&Label::new(PROGRAM)) {
        let name = name_of(program);
        if !contains_ci(&name, needle) {
            continue;
        }
        let program_type = match program.get_str("type") {
            Some("GRADUATE") => ProgramType::Graduate,
            _ => ProgramType::Undergraduate,
        };
        for edge in store.get_incoming_edges(program.id) {
            if !edge.is_type(OFFERS) {
                continue;
            }
            if let Some(campus) = store.get_node(edge.source) {
                offers.push(CampusOffer {
                    campus: name_of(campus),
                    university: campus.get_str("university").unwrap_or_default().to_string(),
                    program: name.clone(),
                    program_type,
                });
            }
        }
    }
    offers.sort_by(|a, b| (&a.campus, &a.program).cmp(&(&b.campus, &b.program)));
    offers
}

/// Campuses offering a matching program, ranked by the fastest ride from
/// `origin` to one of their nearby stations plus the walk from it
///
/// Program nodes are shared between campuses, so per-campus capacity and
/// cutoff score are left out; the document store holds them.
pub fn recommend_campuses(
    store: &GraphStore,
    origin: &str,
    needle: &str,
    program_type: ProgramType,
) -> QueryResult<Vec<CampusRecommendation>> {
    let origin = find_station(store, origin)?;
    let mut recommendations: Vec<CampusRecommendation> = Vec::new();

    for program in store.get_nodes_by_label(&Label::new(PROGRAM)) {
        let program_name = name_of(program);
        if program.get_str("type") != Some(program_type.as_str()) || !contains_ci(&program_name, needle) {
            continue;
        }
        for offer in store.get_incoming_edges(program.id) {
            let Some(campus) = store.get_node(offer.source).filter(|_| offer.is_type(OFFERS)) else {
                continue;
            };
            let campus_name = name_of(campus);
            if recommendations.iter().any(|r| r.campus == campus_name) {
                continue;
            }

            let mut best = None;
            for near in store.get_outgoing_edges(campus.id) {
                if !near.is_type(NEAR) {
                    continue;
                }
                let Some(path) = dijkstra(store, origin, near.target, "travel_minutes", Some(NEXT)) else {
                    continue;
                };
                let route = route_from_path(store, &path.path);
                let walking_minutes = near.get_u32("walking_minutes").unwrap_or(0);
                best = quicker(
                    best,
                    CampusAccess {
                        station: route.stations.last().cloned().unwrap_or_default(),
                        role: near
                            .get_property("role")
                            .and_then(PropertyValue::as_string)
                            .unwrap_or_default()
                            .to_string(),
                        walking_minutes,
                        lines: route.lines,
                        stops: route.hops,
                        line_changes: route.line_changes,
                        total_minutes: path.cost + f64::from(walking_minutes),
                    },
                );
            }

            recommendations.push(CampusRecommendation {
                campus: campus_name,
                university: campus.get_str("university").unwrap_or_default().to_string(),
                program: program_name.clone(),
                capacity: None,
                cutoff_score: None,
                access: best,
            });
        }
    }
    rank(&mut recommendations);
    Ok(recommendations)
}

/// Campuses within walking distance of a station, closest first
pub fn campuses_near_station(store: &GraphStore, station: &str) -> QueryResult<Vec<NearbyCampus>> {
    let station_id = find_station(store, station)?;
    let mut nearby: Vec<NearbyCampus> = store
        .get_incoming_edges(station_id)
        .into_iter()
        .filter(|e| e.is_type(NEAR))
        .filter_map(|e| {
            let campus = store.get_node(e.source)?;
            campus.has_label(&Label::new(CAMPUS)).then(|| NearbyCampus {
                campus: name_of(campus),
                university: campus.get_str("university").unwrap_or_default().to_string(),
                walking_minutes: e.get_u32("walking_minutes").unwrap_or(0),
                role: e
                    .get_property("role")
                    .and_then(PropertyValue::as_string)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect();
    nearby.sort_by(|a, b| (a.walking_minutes, &a.campus).cmp(&(b.walking_minutes, &b.campus)));
    Ok(nearby)
}

/// Node count per label and edge count per type
pub fn stats(store: &GraphStore) -> StoreStats {
    StoreStats {
        store: "graph".to_string(),
        entities: store.label_counts(),
        relations: store.edge_type_counts(),
    }
}

/// Line changes needed along the fewest-stops route
pub fn line_changes(store: &GraphStore, from: &str, to: &str) -> QueryResult<Option<usize>> {
    Ok(shortest_route(store, from, to)?.map(|r| r.line_changes))
}

