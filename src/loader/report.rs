//! Load report

use crate::error::LoadError;
use crate::resolver::EntityKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Relation types attached by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RelationKind {
    LineStops,
    Proximities,
    Offers,
    Adjacencies,
    Interchanges,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::LineStops => "LineStops",
            RelationKind::Proximities => "Proximities",
            RelationKind::Offers => "Offers",
            RelationKind::Adjacencies => "Adjacencies",
            RelationKind::Interchanges => "Interchanges",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Entity,
    Relationship,
    Topology,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Entity => "entity",
            Phase::Relationship => "relationship",
            Phase::Topology => "topology",
        })
    }
}

/// What a failure was about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Subject {
    Entity(EntityKind),
    Relation(RelationKind),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Entity(kind) => kind.fmt(f),
            Subject::Relation(kind) => kind.fmt(f),
        }
    }
}

impl From<EntityKind> for Subject {
    fn from(kind: EntityKind) -> Self {
        Subject::Entity(kind)
    }
}

impl From<RelationKind> for Subject {
    fn from(kind: RelationKind) -> Self {
        Subject::Relation(kind)
    }
}

/// One record or relation the loader had to skip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub phase: Phase,
    pub subject: Subject,
    /// Natural key of the failing record, e.g. a campus name
    pub key: String,
    /// `DuplicateKey`, `UnresolvedReference`, `Store`, ...
    pub error: &'static str,
    pub reason: String,
}

impl LoadFailure {
    pub fn new(phase: Phase, subject: impl Into<Subject>, key: impl Into<String>, err: &LoadError) -> Self {
        LoadFailure {
            phase,
            subject: subject.into(),
            key: key.into(),
            error: err.kind_name(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} pass] {} {}: {}", self.phase, self.subject, self.key, self.reason)
    }
}

/// Outcome of one load run against one store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub store: String,
    pub inserted: BTreeMap<EntityKind, usize>,
    pub relationships: BTreeMap<RelationKind, usize>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn new(store: impl Into<String>) -> Self {
        LoadReport {
            store: store.into(),
            ..Default::default()
        }
    }

    pub(crate) fn count_entity(&mut self, kind: EntityKind, n: usize) {
        *self.inserted.entry(kind).or_default() += n;
    }

    pub(crate) fn count_relation(&mut self, kind: RelationKind, n: usize) {
        *self.relationships.entry(kind).or_default() += n;
    }

    pub(crate) fn fail(&mut self, failure: LoadFailure) {
        self.failures.push(failure);
    }

    pub fn inserted(&self, kind: EntityKind) -> usize {
        self.inserted.get(&kind).copied().unwrap_or(0)
    }

    pub fn relationships(&self, kind: RelationKind) -> usize {
        self.relationships.get(&kind).copied().unwrap_or(0)
    }

    /// No record or relation failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failure count per entity or relation type
    pub fn failure_counts(&self) -> BTreeMap<Subject, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.subject).or_default() += 1;
        }
        counts
    }

    pub fn failures_in(&self, phase: Phase) -> impl Iterator<Item = &LoadFailure> {
        self.failures.iter().filter(move |f| f.phase == phase)
    }
}
