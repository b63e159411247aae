use metrocampus::dataset::{Campus, Line, Program, Proximity, ProximityRole, RecordSet, Station};
use metrocampus::loader::target::Capabilities;
use metrocampus::loader::{DocumentTarget, GraphTarget, PhasedLoader, TargetStore};
use metrocampus::topology::{Adjacency, Interchange, TopologyConfig};
use metrocampus::verify::StoreCounts;
use metrocampus::{LoadError, StoreError, StoreResult};

/// Forwards to an inner target until `budget` writes have gone through
struct FlakyTarget<T> {
    inner: T,
    budget: usize,
}

impl<T> FlakyTarget<T> {
    fn new(inner: T, budget: usize) -> Self {
        FlakyTarget { inner, budget }
    }

    fn spend(&mut self) -> StoreResult<()> {
        if self.budget == 0 {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.budget -= 1;
        Ok(())
    }
}

impl<T: TargetStore> TargetStore for FlakyTarget<T> {
    type Id = T::Id;

    fn name(&self) -> &'static str {
        "flaky"
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.inner.clear()
    }

    fn insert_line(&mut self, line: &Line) -> StoreResult<T::Id> {
        self.spend()?;
        self.inner.insert_line(line)
    }

    fn insert_station(&mut self, station: &Station) -> StoreResult<T::Id> {
        self.spend()?;
        self.inner.insert_station(station)
    }

    fn insert_campus(&mut self, campus: &Campus) -> StoreResult<T::Id> {
        self.spend()?;
        self.inner.insert_campus(campus)
    }

    fn get_or_create_program(&mut self, program: &Program) -> StoreResult<(T::Id, bool)> {
        self.spend()?;
        self.inner.get_or_create_program(program)
    }

    fn attach_stops(&mut self, line: T::Id, stops: &[T::Id]) -> StoreResult<()> {
        self.spend()?;
        self.inner.attach_stops(line, stops)
    }

    fn attach_proximity(&mut self, campus: T::Id, station: T::Id, proximity: &Proximity) -> StoreResult<()> {
        self.spend()?;
        self.inner.attach_proximity(campus, station, proximity)
    }

    fn attach_program(&mut self, campus: T::Id, program: T::Id) -> StoreResult<()> {
        self.spend()?;
        self.inner.attach_program(campus, program)
    }

    fn attach_adjacency(&mut self, from: T::Id, to: T::Id, adjacency: &Adjacency) -> StoreResult<()> {
        self.spend()?;
        self.inner.attach_adjacency(from, to, adjacency)
    }

    fn attach_interchange(&mut self, from: T::Id, to: T::Id, interchange: &Interchange) -> StoreResult<()> {
        self.spend()?;
        self.inner.attach_interchange(from, to, interchange)
    }

    fn create_indexes(&mut self) -> StoreResult<()> {
        self.inner.create_indexes()
    }

    fn counts(&self) -> StoreResult<StoreCounts> {
        self.inner.counts()
    }
}

fn records() -> RecordSet {
    let mut campus = Campus::new("Campus Y", "UPM");
    campus.nearby_stations.push(Proximity::new("y", 4, ProximityRole::Primary));
    RecordSet::new(
        vec![Line::new(1, "L1", &["x", "y", "z"])],
        vec![
            Station::new("x", "X", &[1]),
            Station::new("y", "Y", &[1]),
            Station::new("z", "Z", &[1]),
        ],
        vec![campus],
    )
}

#[test]
fn test_unavailable_during_entity_pass_aborts() {
    let mut target = FlakyTarget::new(GraphTarget::new(), 2);
    let result = PhasedLoader::new(&mut target, TopologyConfig::default()).load(&records());
    assert!(matches!(result, Err(LoadError::StoreUnavailable(_))));
}

#[test]
fn test_unavailable_during_relationship_pass_aborts() {
    // 1 line + 3 stations + 1 campus get through
    let mut target = FlakyTarget::new(DocumentTarget::new(), 5);
    let result = PhasedLoader::new(&mut target, TopologyConfig::default()).load(&records());
    assert!(matches!(result, Err(LoadError::StoreUnavailable(_))));
}

#[test]
fn test_unavailable_during_topology_pass_aborts() {
    // Entities (5), stops (1) and proximity (1) succeed
    let mut target = FlakyTarget::new(GraphTarget::new(), 7);
    let result = PhasedLoader::new(&mut target, TopologyConfig::default()).load(&records());
    assert!(matches!(result, Err(LoadError::StoreUnavailable(_))));

    // Enough budget and the same load is clean
    let mut target = FlakyTarget::new(GraphTarget::new(), 100);
    let report = PhasedLoader::new(&mut target, TopologyConfig::default())
        .load(&records())
        .unwrap();
    assert!(report.is_clean());
}

#[test]
fn test_closed_graph_store() {
    let mut target = GraphTarget::new();
    target.store_mut().close();
    let result = PhasedLoader::new(&mut target, TopologyConfig::default()).load(&records());
    assert!(matches!(result, Err(LoadError::StoreUnavailable(_))));
    assert!(target.counts().is_err());
}

#[test]
fn test_closed_document_store() {
    let mut target = DocumentTarget::new();
    target.store_mut().close();
    let result = PhasedLoader::new(&mut target, TopologyConfig::default()).load(&records());
    assert!(matches!(result, Err(LoadError::StoreUnavailable(_))));
}
