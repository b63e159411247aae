use metrocampus::dataset::{DatasetFiles, ProgramType, RecordSet};
use metrocampus::loader::{load_and_verify, DocumentTarget, GraphTarget, RelationKind, TargetStore};
use metrocampus::maintenance;
use metrocampus::queries::{self, QueryError};
use metrocampus::topology::TopologyConfig;
use metrocampus::verify::CountKey;
use metrocampus::{EntityKind, LoadError};
use std::path::PathBuf;

fn bundled() -> RecordSet {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    RecordSet::from_dir(&dir, &DatasetFiles::default()).unwrap()
}

fn loaded_graph(records: &RecordSet) -> GraphTarget {
    let mut target = GraphTarget::new();
    let outcome = load_and_verify(&mut target, records, &TopologyConfig::default(), true).unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.report.failures);
    target
}

fn loaded_documents(records: &RecordSet) -> DocumentTarget {
    let mut target = DocumentTarget::new();
    let outcome = load_and_verify(&mut target, records, &TopologyConfig::default(), true).unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.report.failures);
    target
}

#[test]
fn test_bundled_dataset_is_consistent() {
    let records = bundled();
    assert_eq!(records.lines.len(), 4);
    assert_eq!(records.stations.len(), 60);
    assert_eq!(records.campuses.len(), 6);
    assert_eq!(records.embedded_program_count(), 29);
    assert!(records.validate().is_empty());
}

#[test]
fn test_graph_load_counts() {
    let records = bundled();
    let mut target = GraphTarget::new();
    let outcome = load_and_verify(&mut target, &records, &TopologyConfig::default(), true).unwrap();
    let report = &outcome.report;

    assert!(report.is_clean());
    assert_eq!(report.inserted(EntityKind::Line), 4);
    assert_eq!(report.inserted(EntityKind::Station), 60);
    assert_eq!(report.inserted(EntityKind::Campus), 6);
    assert_eq!(report.inserted(EntityKind::Program), 21);
    assert_eq!(report.relationships(RelationKind::LineStops), 72);
    assert_eq!(report.relationships(RelationKind::Proximities), 13);
    assert_eq!(report.relationships(RelationKind::Offers), 29);
    assert_eq!(report.relationships(RelationKind::Adjacencies), 138);
    assert_eq!(report.relationships(RelationKind::Interchanges), 14);

    let verification = outcome.verification.unwrap();
    assert!(verification.is_consistent());
    let counts = target.counts().unwrap();
    assert_eq!(counts.get(CountKey::Programs), Some(21));
    assert_eq!(counts.get(CountKey::Adjacencies), Some(138));
}

#[test]
fn test_document_load_counts() {
    let records = bundled();
    let mut target = DocumentTarget::new();
    let outcome = load_and_verify(&mut target, &records, &TopologyConfig::default(), true).unwrap();
    let report = &outcome.report;

    assert!(report.is_clean());
    assert_eq!(report.inserted(EntityKind::Station), 60);
    assert_eq!(report.inserted(EntityKind::Program), 29);
    assert_eq!(report.relationships(RelationKind::LineStops), 72);
    assert_eq!(report.relationships(RelationKind::Proximities), 13);
    assert_eq!(report.relationships(RelationKind::Adjacencies), 0);

    let verification = outcome.verification.unwrap();
    assert!(verification.is_consistent());
    assert!(verification.checks.iter().all(|c| c.key != CountKey::Interchanges));
}

#[test]
fn test_no_unresolved_references() {
    let records = bundled();
    for report in [
        load_and_verify(&mut GraphTarget::new(), &records, &TopologyConfig::default(), false)
            .unwrap()
            .report,
        load_and_verify(&mut DocumentTarget::new(), &records, &TopologyConfig::default(), false)
            .unwrap()
            .report,
    ] {
        assert_eq!(
            report
                .failures
                .iter()
                .filter(|f| f.error == "UnresolvedReference")
                .count(),
            0
        );
    }
}

#[test]
fn test_document_queries() {
    let records = bundled();
    let target = loaded_documents(&records);
    let store = target.store();

    let per_line: Vec<(u32, usize)> = queries::document::station_count_per_line(store)
        .unwrap()
        .into_iter()
        .map(|(n, _, stops)| (n, stops))
        .collect();
    assert_eq!(per_line, vec![(1, 22), (3, 11), (6, 28), (10, 11)]);

    assert_eq!(queries::document::commuter_rail_stations(store).unwrap().len(), 9);
    assert_eq!(queries::document::stations_in_zone(store, "A").unwrap().len(), 60);

    let zones = queries::document::university_stations_per_zone(store).unwrap();
    assert_eq!(zones.get("A"), Some(&10));
    assert_eq!(zones.len(), 1);

    let derecho = queries::document::campuses_offering(store, "DERECHO").unwrap();
    assert_eq!(derecho.len(), 4);
    assert!(derecho.iter().all(|o| o.program == "Grado en Derecho"));

    let tallies = queries::document::programs_per_university(store).unwrap();
    let ucm = &tallies["UCM"];
    assert_eq!((ucm.undergraduate, ucm.graduate), (4, 2));
    assert_eq!(tallies.values().map(|t| t.total()).sum::<usize>(), 29);

    let near = queries::document::campuses_near_station(store, "Ciudad Universitaria").unwrap();
    let near: Vec<(&str, u32)> = near.iter().map(|n| (n.university.as_str(), n.walking_minutes)).collect();
    assert_eq!(near, vec![("UCM", 5), ("UPM", 8)]);

    assert_eq!(queries::document::stations_on_line(store, 3).unwrap().last().map(String::as_str), Some("Moncloa"));
    assert!(queries::document::stations_on_line(store, 99).is_err());
}

#[test]
fn test_graph_queries() {
    let records = bundled();
    let target = loaded_graph(&records);
    let store = target.store();

    let derecho = queries::graph::campuses_offering(store, "derecho");
    assert_eq!(derecho.len(), 4);
    assert!(derecho.iter().all(|o| o.program_type == ProgramType::Undergraduate));

    let near = queries::graph::campuses_near_station(store, "moncloa").unwrap();
    let near: Vec<(&str, u32)> = near.iter().map(|n| (n.university.as_str(), n.walking_minutes)).collect();
    assert_eq!(near, vec![("UPM", 12), ("UCM", 15)]);

    assert_eq!(queries::graph::stations_on_line(store, 1).unwrap().len(), 22);

    let stats = queries::graph::stats(store);
    assert_eq!(stats.entities.get("Station"), Some(&60));
    assert_eq!(stats.relations.get("NEXT"), Some(&138));
}

#[test]
fn test_routes() {
    let records = bundled();
    let target = loaded_graph(&records);
    let store = target.store();

    let route = queries::graph::shortest_route(store, "Sol", "Moncloa").unwrap().unwrap();
    let fewest_stops_minutes = route.total_minutes;
    assert_eq!(route.hops, 5);
    assert_eq!(route.line_changes, 0);
    assert!(route.lines.iter().all(|&l| l == 3));
    assert_eq!(route.stations.first().map(String::as_str), Some("Sol"));
    assert_eq!(route.stations.last().map(String::as_str), Some("Moncloa"));

    let route = queries::graph::shortest_route(store, "bilbao", "arguelles").unwrap().unwrap();
    assert_eq!(route.hops, 4);
    assert_eq!(route.lines, vec![1, 10, 3, 3]);
    assert_eq!(route.line_changes, 2);
    assert_eq!(queries::graph::line_changes(store, "Bilbao", "Argüelles").unwrap(), Some(2));

    let fastest = queries::graph::fastest_route(store, "sol", "moncloa").unwrap().unwrap();
    assert!(fastest.total_minutes <= fewest_stops_minutes);
    assert_eq!(fastest.stations.last().map(String::as_str), Some("Moncloa"));

    let all = queries::graph::all_shortest_routes(store, "sol", "moncloa").unwrap();
    assert!(!all.is_empty());
    assert!(all.iter().all(|r| r.hops == 5));

    let within = queries::graph::routes_within(store, "sol", "moncloa", 5).unwrap();
    assert!(within.iter().all(|r| r.hops <= 5));
    assert!(!within.is_empty());

    assert!(matches!(
        queries::graph::shortest_route(store, "sol", "atlantis"),
        Err(QueryError::UnknownStation(_))
    ));
}

#[test]
fn test_same_line_comparison() {
    let records = bundled();
    let target = loaded_documents(&records);
    let store = target.store();

    let trip = queries::document::compare_same_line(store, "Sol", "Moncloa", 3).unwrap();
    assert_eq!((trip.from_position, trip.to_position, trip.stops), (5, 10, 5));
    assert_eq!(trip.estimated_minutes, 12.5);

    // Circular line 6: the first and last stops are neighbours
    let trip = queries::document::compare_same_line(store, "laguna", "lucero", 6).unwrap();
    assert_eq!((trip.from_position, trip.to_position, trip.stops), (0, 27, 1));

    assert_eq!(
        queries::document::compare_same_line(store, "sol", "moncloa", 6),
        Err(QueryError::NotOnLine {
            station: "Sol".to_string(),
            line: 6
        })
    );
    assert_eq!(
        queries::document::compare_same_line(store, "sol", "moncloa", 99),
        Err(QueryError::UnknownLine(99))
    );
}

#[test]
fn test_document_recommendation_stays_on_one_line() {
    let records = bundled();
    let target = loaded_documents(&records);

    let ranked =
        queries::document::recommend_campuses(target.store(), "Sol", "derecho", ProgramType::Undergraduate).unwrap();
    let order: Vec<&str> = ranked.iter().map(|r| r.university.as_str()).collect();
    assert_eq!(order, vec!["Comillas", "UC3M", "UCM", "URJC"]);

    let best = &ranked[0];
    assert_eq!(best.program, "Grado en Derecho");
    assert_eq!((best.capacity, best.cutoff_score), (Some(250), Some(9.0)));
    let access = best.access.as_ref().unwrap();
    assert_eq!(access.station, "Ventura Rodríguez");
    assert_eq!((access.stops, access.lines.clone()), (3, vec![3]));
    assert_eq!(access.total_minutes, 14.5);

    assert_eq!(ranked[2].access.as_ref().unwrap().station, "Moncloa");
    // Manuel Becerra and O'Donnell share no line with Sol
    assert!(!ranked[3].is_reachable());

    assert!(queries::document::recommend_campuses(target.store(), "Sol", "derecho", ProgramType::Graduate)
        .unwrap()
        .is_empty());
}

#[test]
fn test_graph_recommendation_follows_routes() {
    let records = bundled();
    let target = loaded_graph(&records);

    let ranked =
        queries::graph::recommend_campuses(target.store(), "sol", "derecho", ProgramType::Undergraduate).unwrap();
    let summary: Vec<(&str, &str, f64)> = ranked
        .iter()
        .map(|r| {
            let access = r.access.as_ref().unwrap();
            (r.university.as_str(), access.station.as_str(), access.total_minutes)
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Comillas", "Argüelles", 10.0),
            ("UC3M", "Embajadores", 13.0),
            ("UCM", "Ciudad Universitaria", 14.0),
            ("URJC", "Manuel Becerra", 20.0),
        ]
    );

    let to_ucm = ranked[2].access.as_ref().unwrap();
    assert!(to_ucm.line_changes >= 1);
    assert_eq!(to_ucm.lines.last(), Some(&6));

    assert!(matches!(
        queries::graph::recommend_campuses(target.store(), "atlantis", "derecho", ProgramType::Undergraduate),
        Err(QueryError::UnknownStation(_))
    ));
}

#[test]
fn test_removing_a_station_keeps_both_stores_consistent() {
    let records = bundled();

    let mut documents = loaded_documents(&records);
    let mut removal = maintenance::document::remove_station(documents.store_mut(), "moncloa").unwrap();
    removal.campuses.sort();
    assert_eq!(removal.lines, vec![3, 6]);
    assert_eq!(removal.campuses, vec!["Campus de Moncloa (UPM)", "Ciudad Universitaria (UCM)"]);

    let line_3 = queries::document::stations_on_line(documents.store(), 3).unwrap();
    assert_eq!(line_3.len(), 10);
    assert_eq!(line_3.last().map(String::as_str), Some("Argüelles"));
    assert!(matches!(
        queries::document::compare_same_line(documents.store(), "sol", "moncloa", 3),
        Err(QueryError::UnknownStation(_))
    ));
    // Ciudad Universitaria is now reachable only through line 6
    let ranked =
        queries::document::recommend_campuses(documents.store(), "Sol", "derecho", ProgramType::Undergraduate).unwrap();
    let ucm = ranked.iter().find(|r| r.university == "UCM").unwrap();
    assert!(!ucm.is_reachable());

    let mut graph = loaded_graph(&records);
    maintenance::graph::remove_station(graph.store_mut(), "moncloa").unwrap();
    let line_3 = queries::graph::stations_on_line(graph.store(), 3).unwrap();
    assert_eq!(line_3.len(), 10);
    assert!(!line_3.iter().any(|s| s == "Moncloa"));
    assert!(queries::graph::shortest_route(graph.store(), "sol", "ciudad-universitaria")
        .unwrap()
        .is_some());
}

#[test]
fn test_missing_dataset_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = RecordSet::from_dir(dir.path(), &DatasetFiles::default()).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}
