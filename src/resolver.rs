//! Natural-key resolver
//!
//! Maps each record's natural key (line number, station slug, campus name,
//! program name and type) to the identifier the target store assigned it.
//! One resolver lives for one load run and is dropped with it.

use crate::dataset::ProgramType;
use crate::error::{LoadError, LoadResult};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;

/// Entity types of the data model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityKind {
    Line,
    Station,
    Campus,
    Program,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Line,
        EntityKind::Station,
        EntityKind::Campus,
        EntityKind::Program,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Line => "Line",
            EntityKind::Station => "Station",
            EntityKind::Campus => "Campus",
            EntityKind::Program => "Program",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally meaningful identifier of a source record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NaturalKey {
    Line(u32),
    Station(String),
    Campus(String),
    Program { name: String, kind: ProgramType },
}

impl NaturalKey {
    pub fn station(slug: impl Into<String>) -> Self {
        NaturalKey::Station(slug.into())
    }

    pub fn campus(name: impl Into<String>) -> Self {
        NaturalKey::Campus(name.into())
    }

    pub fn program(name: impl Into<String>, kind: ProgramType) -> Self {
        NaturalKey::Program {
            name: name.into(),
            kind,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            NaturalKey::Line(_) => EntityKind::Line,
            NaturalKey::Station(_) => EntityKind::Station,
            NaturalKey::Campus(_) => EntityKind::Campus,
            NaturalKey::Program { .. } => EntityKind::Program,
        }
    }

    fn duplicate(&self) -> LoadError {
        LoadError::DuplicateKey {
            kind: self.kind(),
            key: self.to_string(),
        }
    }

    fn unresolved(&self) -> LoadError {
        LoadError::UnresolvedReference {
            kind: self.kind(),
            key: self.to_string(),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaturalKey::Line(number) => write!(f, "{}", number),
            NaturalKey::Station(slug) => f.write_str(slug),
            NaturalKey::Campus(name) => f.write_str(name),
            NaturalKey::Program { name, kind } => write!(f, "{} ({})", name, kind),
        }
    }
}

/// Natural key -> store identifier, per entity type
#[derive(Debug)]
pub struct KeyResolver<Id> {
    entries: HashMap<EntityKind, HashMap<NaturalKey, Id>>,
}

impl<Id: Copy + Eq + Hash + Debug> KeyResolver<Id> {
    pub fn new() -> Self {
        KeyResolver {
            entries: HashMap::new(),
        }
    }

    /// Record the identifier assigned to `key`
    ///
    /// Fails with `DuplicateKey` if the key is already registered.
    pub fn register(&mut self, key: NaturalKey, id: Id) -> LoadResult<()> {
        let table = self.entries.entry(key.kind()).or_default();
        if table.contains_key(&key) {
            return Err(key.duplicate());
        }
        table.insert(key, id);
        Ok(())
    }

    /// Fail with `DuplicateKey` if `key` is already registered
    ///
    /// Checked before inserting so a duplicate record never reaches the store.
    pub fn ensure_vacant(&self, key: &NaturalKey) -> LoadResult<()> {
        if self.is_registered(key) {
            Err(key.duplicate())
        } else {
            Ok(())
        }
    }

    /// Identifier for `key`, or `UnresolvedReference`
    pub fn resolve(&self, key: &NaturalKey) -> LoadResult<Id> {
        self.get(key).ok_or_else(|| key.unresolved())
    }

    pub fn get(&self, key: &NaturalKey) -> Option<Id> {
        self.entries.get(&key.kind()).and_then(|t| t.get(key)).copied()
    }

    pub fn is_registered(&self, key: &NaturalKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of keys registered for one entity type
    pub fn len(&self, kind: EntityKind) -> usize {
        self.entries.get(&kind).map(HashMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(HashMap::is_empty)
    }
}

impl<Id: Copy + Eq + Hash + Debug> Default for KeyResolver<Id> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut resolver = KeyResolver::new();
        resolver.register(NaturalKey::Line(1), 10u64).unwrap();
        resolver.register(NaturalKey::station("sol"), 11).unwrap();

        assert_eq!(resolver.resolve(&NaturalKey::Line(1)).unwrap(), 10);
        assert_eq!(resolver.resolve(&NaturalKey::station("sol")).unwrap(), 11);
        assert_eq!(resolver.len(EntityKind::Station), 1);
    }

    #[test]
    fn test_duplicate_key() {
        let mut resolver = KeyResolver::new();
        resolver.register(NaturalKey::station("sol"), 1u64).unwrap();

        let err = resolver.register(NaturalKey::station("sol"), 2).unwrap_err();
        assert!(matches!(
            err,
            LoadError::DuplicateKey { kind: EntityKind::Station, ref key } if key == "sol"
        ));
        assert!(resolver.ensure_vacant(&NaturalKey::station("sol")).is_err());
        assert_eq!(resolver.resolve(&NaturalKey::station("sol")).unwrap(), 1);
    }

    #[test]
    fn test_unresolved_reference() {
        let resolver: KeyResolver<u64> = KeyResolver::new();
        let err = resolver.resolve(&NaturalKey::station("atlantis")).unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedReference { kind: EntityKind::Station, .. }));
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_keys_are_scoped_by_type() {
        let mut resolver = KeyResolver::new();
        resolver.register(NaturalKey::station("moncloa"), 1u64).unwrap();
        resolver.register(NaturalKey::campus("moncloa"), 2).unwrap();
        resolver
            .register(NaturalKey::program("Grado en Derecho", ProgramType::Undergraduate), 3)
            .unwrap();
        resolver
            .register(NaturalKey::program("Grado en Derecho", ProgramType::Graduate), 4)
            .unwrap();
        assert_eq!(resolver.len(EntityKind::Program), 2);
    }
}
