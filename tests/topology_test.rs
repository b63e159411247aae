use metrocampus::dataset::{ColocatedGroup, Line, RecordSet, Station};
use metrocampus::graph::{EdgeType, Label};
use metrocampus::loader::graph::{INTERCHANGE, NEXT, STATION};
use metrocampus::loader::{GraphTarget, PhasedLoader, RelationKind};
use metrocampus::topology::{derive_adjacency, derive_all_adjacency, derive_interchanges, TopologyConfig};
use std::collections::HashSet;

fn pairs(line: &Line) -> HashSet<(String, String)> {
    derive_adjacency(line, &TopologyConfig::default())
        .into_iter()
        .map(|a| (a.from, a.to))
        .collect()
}

#[test]
fn test_adjacency_is_symmetric() {
    let line = Line::new(1, "L1", &["a", "b", "c"]);
    let adj = pairs(&line);

    let expected: HashSet<(String, String)> = [("a", "b"), ("b", "a"), ("b", "c"), ("c", "b")]
        .iter()
        .map(|(f, t)| (f.to_string(), t.to_string()))
        .collect();
    assert_eq!(adj, expected);
    for (from, to) in &adj {
        assert!(adj.contains(&(to.clone(), from.clone())));
    }
}

#[test]
fn test_adjacency_carries_line_and_minutes() {
    let mut line = Line::new(10, "L10", &["a", "b", "c"]);
    line.travel_minutes = vec![3, 5];
    let config = TopologyConfig {
        default_travel_minutes: 9,
        interchange_minutes: 1,
    };
    for adj in derive_adjacency(&line, &config) {
        assert_eq!(adj.line, 10);
        let expected = if adj.from == "c" || adj.to == "c" { 5 } else { 3 };
        assert_eq!(adj.travel_minutes, expected);
    }
}

#[test]
fn test_all_adjacency_spans_lines() {
    let lines = vec![
        Line::new(1, "L1", &["a", "b", "c"]),
        Line::new(2, "L2", &["b", "d"]),
        Line::new(3, "L3", &["e"]),
    ];
    let adj = derive_all_adjacency(&lines, &TopologyConfig::default());
    assert_eq!(adj.len(), 6);
    assert_eq!(adj.iter().filter(|a| a.line == 2).count(), 2);
}

#[test]
fn test_interchange_completeness() {
    let stations = vec![
        Station::new("sol", "Sol", &[1, 2, 3]),
        Station::new("opera", "Ópera", &[2, 5]),
        Station::new("tirso", "Tirso de Molina", &[1]),
        Station::new("noviciado", "Noviciado", &[2]),
        Station::new("san-bernardo", "San Bernardo", &[2, 4]),
    ];
    let colocated = vec![ColocatedGroup {
        stations: vec!["noviciado".to_string(), "san-bernardo".to_string()],
        change_minutes: Some(6),
    }];
    let config = TopologyConfig::default();
    let interchanges = derive_interchanges(&stations, &colocated, &config);

    let selfs: HashSet<&str> = interchanges
        .iter()
        .filter(|i| i.is_self())
        .map(|i| i.from.as_str())
        .collect();
    let multi_line: HashSet<&str> = stations
        .iter()
        .filter(|s| s.distinct_lines().len() >= 2)
        .map(|s| s.slug.as_str())
        .collect();
    assert_eq!(selfs, multi_line);
    assert!(interchanges
        .iter()
        .filter(|i| i.is_self())
        .all(|i| i.change_minutes == config.interchange_minutes));

    let walk: Vec<_> = interchanges.iter().filter(|i| !i.is_self()).collect();
    assert_eq!(walk.len(), 2);
    assert!(walk.iter().all(|i| i.change_minutes == 6));
    assert!(walk.iter().any(|i| i.from == "noviciado" && i.to == "san-bernardo"));
    assert!(walk.iter().any(|i| i.from == "san-bernardo" && i.to == "noviciado"));
}

#[test]
fn test_repeated_line_number_is_not_an_interchange() {
    let stations = vec![Station::new("a", "A", &[1, 1])];
    assert!(derive_interchanges(&stations, &[], &TopologyConfig::default()).is_empty());
}

#[test]
fn test_topology_materialized_in_graph() {
    let mut circular = Line::new(6, "L6", &["p", "q", "r"]);
    circular.circular = true;
    let records = RecordSet::new(
        vec![Line::new(1, "L1", &["a", "p"]), circular],
        vec![
            Station::new("a", "A", &[1]),
            Station::new("p", "P", &[1, 6]),
            Station::new("q", "Q", &[6]),
            Station::new("r", "R", &[6]),
        ],
        vec![],
    );

    let mut target = GraphTarget::new();
    let report = PhasedLoader::new(&mut target, TopologyConfig::default())
        .load(&records)
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.relationships(RelationKind::Adjacencies), 8);
    assert_eq!(report.relationships(RelationKind::Interchanges), 1);

    let store = target.store();
    assert_eq!(store.edge_type_count(&EdgeType::new(NEXT)), 8);

    let p = store
        .find_node(&Label::new(STATION), "slug", &"p".into())
        .unwrap()
        .id;
    let loops: Vec<_> = store
        .get_outgoing_edges(p)
        .into_iter()
        .filter(|e| e.edge_type.as_str() == INTERCHANGE)
        .collect();
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].target, p);
}
