//! Phased loader
//!
//! One run clears the target, then:
//! 1. entity pass: lines, stations, campuses (and, where the store models
//!    them, get-or-create programs), registering each natural key;
//! 2. relationship pass: line stop sequences, campus proximities and
//!    campus programs, resolved through the natural-key resolver;
//! 3. topology pass: derived adjacency and interchange relations.
//!
//! Per-record errors are kept in the [`LoadReport`] and the run continues.
//! An unavailable store ends the run.

use super::report::{LoadFailure, LoadReport, Phase, RelationKind, Subject};
use super::target::TargetStore;
use crate::dataset::{Program, RecordSet};
use crate::error::{LoadError, LoadResult, StoreResult};
use crate::resolver::{EntityKind, KeyResolver, NaturalKey};
use crate::topology::{derive_adjacency, derive_interchanges, TopologyConfig};
use crate::verify::{ExpectedCounts, IntegrityReporter, VerificationResult};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Store ids of the records that survived the entity pass, by record index
struct Loaded<Id> {
    lines: Vec<Option<Id>>,
    campuses: Vec<Option<Id>>,
    offers: Vec<Offer<Id>>,
}

/// Campus -> program relation deferred to the relationship pass
struct Offer<Id> {
    key: String,
    campus: Id,
    program: Id,
}

/// Record a per-record error in the report, pass fatal ones up
fn settle<V>(
    report: &mut LoadReport,
    phase: Phase,
    subject: impl Into<Subject>,
    key: &str,
    result: LoadResult<V>,
) -> LoadResult<Option<V>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fatal() => {
            error!("[{}] {} pass aborted at {}: {}", report.store, phase, key, err);
            Err(err)
        }
        Err(err) => {
            let failure = LoadFailure::new(phase, subject, key, &err);
            warn!("[{}] {}", report.store, failure);
            report.fail(failure);
            Ok(None)
        }
    }
}

/// Loads a [`RecordSet`] into one target store
pub struct PhasedLoader<'a, T: TargetStore> {
    target: &'a mut T,
    topology: TopologyConfig,
}

impl<'a, T: TargetStore> PhasedLoader<'a, T> {
    pub fn new(target: &'a mut T, topology: TopologyConfig) -> Self {
        PhasedLoader { target, topology }
    }

    /// Drop previously loaded data, then load `records`
    ///
    /// Returns `Err` only for fatal conditions (the store became
    /// unavailable, or clearing/indexing failed); record-level failures are
    /// in the returned report.
    pub fn load(&mut self, records: &RecordSet) -> LoadResult<LoadReport> {
        let caps = self.target.capabilities();
        let mut report = LoadReport::new(self.target.name());

        info!("[{}] Clearing previously loaded data", report.store);
        self.target.clear()?;

        let mut resolver = KeyResolver::new();
        let loaded = self.entity_pass(records, &mut resolver, &mut report)?;
        info!(
            "[{}] Entity pass done: {} lines, {} stations, {} campuses, {} programs",
            report.store,
            report.inserted(EntityKind::Line),
            report.inserted(EntityKind::Station),
            report.inserted(EntityKind::Campus),
            report.inserted(EntityKind::Program)
        );

        self.relationship_pass(records, &resolver, &loaded, &mut report)?;
        info!(
            "[{}] Relationship pass done: {} stops, {} proximities, {} offers",
            report.store,
            report.relationships(RelationKind::LineStops),
            report.relationships(RelationKind::Proximities),
            report.relationships(RelationKind::Offers)
        );

        if caps.derived_topology {
            self.topology_pass(records, &resolver, &loaded, &mut report)?;
            info!(
                "[{}] Topology pass done: {} adjacencies, {} interchanges",
                report.store,
                report.relationships(RelationKind::Adjacencies),
                report.relationships(RelationKind::Interchanges)
            );
        }

        self.target.create_indexes()?;

        if report.is_clean() {
            info!("[{}] Load complete", report.store);
        } else {
            warn!("[{}] Load complete with {} failure(s)", report.store, report.failures.len());
        }
        Ok(report)
    }

    fn insert_entity<F>(
        &mut self,
        resolver: &mut KeyResolver<T::Id>,
        key: NaturalKey,
        insert: F,
    ) -> LoadResult<T::Id>
    where
        F: FnOnce(&mut T) -> StoreResult<T::Id>,
    {
        resolver.ensure_vacant(&key)?;
        let id = insert(&mut *self.target)?;
        debug!("Inserted {} {} as {:?}", key.kind(), key, id);
        resolver.register(key, id)?;
        Ok(id)
    }

    /// Get-or-create a program, registering it on first sight
    fn merge_program(
        &mut self,
        resolver: &mut KeyResolver<T::Id>,
        key: &NaturalKey,
        program: &Program,
    ) -> LoadResult<(T::Id, bool)> {
        let (id, created) = self.target.get_or_create_program(program)?;
        match resolver.get(key) {
            None => resolver.register(key.clone(), id)?,
            Some(known) if known == id => {}
            Some(_) => return Err(LoadError::DuplicateKey {
                kind: EntityKind::Program,
                key: key.to_string(),
            }),
        }
        Ok((id, created))
    }

    fn entity_pass(
        &mut self,
        records: &RecordSet,
        resolver: &mut KeyResolver<T::Id>,
        report: &mut LoadReport,
    ) -> LoadResult<Loaded<T::Id>> {
        let program_entities = self.target.capabilities().program_entities;
        let mut loaded = Loaded {
            lines: Vec::with_capacity(records.lines.len()),
            campuses: Vec::with_capacity(records.campuses.len()),
            offers: Vec::new(),
        };

        for line in &records.lines {
            let key = NaturalKey::Line(line.number);
            let label = key.to_string();
            let result = self.insert_entity(resolver, key, |t| t.insert_line(line));
            let id = settle(report, Phase::Entity, EntityKind::Line, &label, result)?;
            if id.is_some() {
                report.count_entity(EntityKind::Line, 1);
            }
            loaded.lines.push(id);
        }

        for station in &records.stations {
            let key = NaturalKey::station(&station.slug);
            let result = self.insert_entity(resolver, key, |t| t.insert_station(station));
            if settle(report, Phase::Entity, EntityKind::Station, &station.slug, result)?.is_some() {
                report.count_entity(EntityKind::Station, 1);
            }
        }

        let mut offered = HashSet::new();
        for campus in &records.campuses {
            let key = NaturalKey::campus(&campus.name);
            let result = self.insert_entity(resolver, key, |t| t.insert_campus(campus));
            let id = settle(report, Phase::Entity, EntityKind::Campus, &campus.name, result)?;
            loaded.campuses.push(id);
            let Some(campus_id) = id else {
                continue;
            };
            report.count_entity(EntityKind::Campus, 1);

            if !program_entities {
                report.count_entity(EntityKind::Program, campus.programs.len());
                continue;
            }

            for program in &campus.programs {
                let key = NaturalKey::program(&program.name, program.program_type);
                let label = key.to_string();
                let result = self.merge_program(resolver, &key, program);
                let Some((program_id, created)) = settle(report, Phase::Entity, EntityKind::Program, &label, result)?
                else {
                    continue;
                };
                if created {
                    report.count_entity(EntityKind::Program, 1);
                }
                if offered.insert((campus_id, program_id)) {
                    loaded.offers.push(Offer {
                        key: format!("{} -> {}", campus.name, label),
                        campus: campus_id,
                        program: program_id,
                    });
                }
            }
        }

        Ok(loaded)
    }

    fn relationship_pass(
        &mut self,
        records: &RecordSet,
        resolver: &KeyResolver<T::Id>,
        loaded: &Loaded<T::Id>,
        report: &mut LoadReport,
    ) -> LoadResult<()> {
        for (line, id) in records.lines.iter().zip(&loaded.lines) {
            let Some(line_id) = *id else {
                continue;
            };

            // All or nothing: a partial stop sequence would misstate positions
            let mut stops = Vec::with_capacity(line.stations.len());
            let mut complete = true;
            for slug in &line.stations {
                let result = resolver.resolve(&NaturalKey::station(slug));
                let key = format!("line {} -> {}", line.number, slug);
                match settle(report, Phase::Relationship, RelationKind::LineStops, &key, result)? {
                    Some(station_id) => stops.push(station_id),
                    None => complete = false,
                }
            }
            if !complete {
                warn!("[{}] Line {} left without stop sequence", report.store, line.number);
                continue;
            }

            let result = self.target.attach_stops(line_id, &stops).map_err(LoadError::from);
            let key = format!("line {}", line.number);
            if settle(report, Phase::Relationship, RelationKind::LineStops, &key, result)?.is_some() {
                report.count_relation(RelationKind::LineStops, stops.len());
            }
        }

        for (campus, id) in records.campuses.iter().zip(&loaded.campuses) {
            let Some(campus_id) = *id else {
                continue;
            };
            for proximity in &campus.nearby_stations {
                let key = format!("{} -> {}", campus.name, proximity.station);
                let result = resolver
                    .resolve(&NaturalKey::station(&proximity.station))
                    .and_then(|station_id| {
                        self.target
                            .attach_proximity(campus_id, station_id, proximity)
                            .map_err(LoadError::from)
                    });
                if settle(report, Phase::Relationship, RelationKind::Proximities, &key, result)?.is_some() {
                    report.count_relation(RelationKind::Proximities, 1);
                }
            }
        }

        for offer in &loaded.offers {
            let result = self
                .target
                .attach_program(offer.campus, offer.program)
                .map_err(LoadError::from);
            if settle(report, Phase::Relationship, RelationKind::Offers, &offer.key, result)?.is_some() {
                report.count_relation(RelationKind::Offers, 1);
            }
        }

        Ok(())
    }

    fn topology_pass(
        &mut self,
        records: &RecordSet,
        resolver: &KeyResolver<T::Id>,
        loaded: &Loaded<T::Id>,
        report: &mut LoadReport,
    ) -> LoadResult<()> {
        let lines = records
            .lines
            .iter()
            .zip(&loaded.lines)
            .filter(|(_, id)| id.is_some())
            .map(|(line, _)| line);

        for line in lines {
            for adjacency in derive_adjacency(line, &self.topology) {
                let key = format!("line {}: {} -> {}", adjacency.line, adjacency.from, adjacency.to);
                let result = resolve_pair(resolver, &adjacency.from, &adjacency.to).and_then(|(from, to)| {
                    self.target
                        .attach_adjacency(from, to, &adjacency)
                        .map_err(LoadError::from)
                });
                if settle(report, Phase::Topology, RelationKind::Adjacencies, &key, result)?.is_some() {
                    report.count_relation(RelationKind::Adjacencies, 1);
                }
            }
        }

        for interchange in derive_interchanges(&records.stations, &records.colocated, &self.topology) {
            let key = format!("{} -> {}", interchange.from, interchange.to);
            let result = resolve_pair(resolver, &interchange.from, &interchange.to).and_then(|(from, to)| {
                self.target
                    .attach_interchange(from, to, &interchange)
                    .map_err(LoadError::from)
            });
            if settle(report, Phase::Topology, RelationKind::Interchanges, &key, result)?.is_some() {
                report.count_relation(RelationKind::Interchanges, 1);
            }
        }

        Ok(())
    }
}

fn resolve_pair<Id>(resolver: &KeyResolver<Id>, from: &str, to: &str) -> LoadResult<(Id, Id)>
where
    Id: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    Ok((
        resolver.resolve(&NaturalKey::station(from))?,
        resolver.resolve(&NaturalKey::station(to))?,
    ))
}

/// Report of one store's load together with its read-back verification
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoadOutcome {
    pub report: LoadReport,
    pub verification: Option<VerificationResult>,
}

impl LoadOutcome {
    /// No record failed and every verified count matched
    pub fn is_success(&self) -> bool {
        self.report.is_clean()
            && self
                .verification
                .as_ref()
                .map_or(true, VerificationResult::is_consistent)
    }
}

/// Load `records` into `target`, then optionally verify the counts
pub fn load_and_verify<T: TargetStore>(
    target: &mut T,
    records: &RecordSet,
    topology: &TopologyConfig,
    verify: bool,
) -> LoadResult<LoadOutcome> {
    let report = PhasedLoader::new(target, *topology).load(records)?;
    let verification = if verify {
        let expected = ExpectedCounts::from_records(records, target.capabilities(), topology);
        Some(IntegrityReporter::new(expected).verify(target)?)
    } else {
        None
    };
    Ok(LoadOutcome { report, verification })
}
