//! In-memory document store implementation
//!
//! Collections hold JSON object documents keyed by a store-assigned
//! [`DocumentId`]. Secondary field indices may be declared per collection,
//! optionally enforcing uniqueness.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// A stored document: a JSON object
pub type Document = Map<String, Value>;

/// Field under which every stored document carries its own id
pub const ID_FIELD: &str = "_id";

/// Opaque store-assigned document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl DocumentId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// JSON representation used when a document references another one
    pub fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }

    pub fn from_value(value: &Value) -> Option<DocumentId> {
        value
            .as_str()
            .and_then(|s| u64::from_str_radix(s, 16).ok())
            .map(DocumentId)
    }

    /// Id carried by a stored document
    pub fn of(doc: &Document) -> Option<DocumentId> {
        doc.get(ID_FIELD).and_then(DocumentId::from_value)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Document store errors
#[derive(Error, Debug, PartialEq)]
pub enum DocumentError {
    #[error("Document store is closed")]
    Closed,

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Document {id} not found in collection {collection}")]
    DocumentNotFound { collection: String, id: DocumentId },

    #[error("Duplicate key in {collection}.{field}: {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    #[error("Documents must be JSON objects, got {0}")]
    NotAnObject(&'static str),

    #[error("Field {0} is not an array")]
    FieldNotArray(String),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// A single patch applied by [`DocumentStore::update_by_id`]
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Replace (or add) a top-level field
    Set(String, Value),
    /// Append to a top-level array field, creating it if absent
    Push(String, Value),
    /// Remove a top-level field
    Unset(String),
    /// Insert into a top-level array at an index, clamped to its length
    InsertAt(String, usize, Value),
    /// Remove every element of a top-level array that matches the value
    ///
    /// An object value matches elements holding all of its fields.
    Pull(String, Value),
}

fn pull_matches(element: &Value, pattern: &Value) -> bool {
    match (element, pattern) {
        (Value::Object(fields), Value::Object(wanted)) => {
            wanted.iter().all(|(k, v)| fields.get(k) == Some(v))
        }
        _ => element == pattern,
    }
}

/// Values reachable from `doc` along a dotted path
///
/// Arrays met along the way (and at the end) are flattened, so
/// `nearby_stations.station_id` yields every element's `station_id`.
pub fn lookup_path<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut parts = path.split('.');
    let Some(first) = parts.next() else {
        return Vec::new();
    };
    let mut current: Vec<&Value> = doc.get(first).into_iter().collect();
    for part in parts {
        current = current
            .into_iter()
            .flat_map(|value| match value {
                Value::Array(items) => items.iter().filter_map(|item| item.get(part)).collect::<Vec<_>>(),
                other => other.get(part).into_iter().collect(),
            })
            .collect();
    }
    current
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Default)]
struct FieldIndex {
    unique: bool,
    /// Canonical JSON text of the value -> documents holding it
    entries: BTreeMap<String, BTreeSet<DocumentId>>,
}

impl FieldIndex {
    fn keys(doc: &Document, field: &str) -> BTreeSet<String> {
        lookup_path(doc, field).into_iter().map(Value::to_string).collect()
    }

    fn insert(&mut self, doc: &Document, field: &str, id: DocumentId) {
        for key in Self::keys(doc, field) {
            self.entries.entry(key).or_default().insert(id);
        }
    }

    fn remove(&mut self, doc: &Document, field: &str, id: DocumentId) {
        for key in Self::keys(doc, field) {
            if let Some(ids) = self.entries.get_mut(&key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.entries.remove(&key);
                }
            }
        }
    }

    /// First key of `doc` already held by another document
    fn conflict(&self, doc: &Document, field: &str, id: DocumentId) -> Option<String> {
        Self::keys(doc, field).into_iter().find(|key| {
            self.entries
                .get(key)
                .map(|ids| ids.iter().any(|other| *other != id))
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Default)]
struct Collection {
    documents: IndexMap<DocumentId, Document>,
    indices: HashMap<String, FieldIndex>,
}

impl Collection {
    fn check_unique(&self, name: &str, doc: &Document, id: DocumentId) -> DocumentResult<()> {
        for (field, index) in &self.indices {
            if !index.unique {
                continue;
            }
            if let Some(value) = index.conflict(doc, field, id) {
                return Err(DocumentError::DuplicateKey {
                    collection: name.to_string(),
                    field: field.clone(),
                    value,
                });
            }
        }
        Ok(())
    }

    fn index(&mut self, doc: &Document, id: DocumentId) {
        for (field, index) in self.indices.iter_mut() {
            index.insert(doc, field, id);
        }
    }

    fn unindex(&mut self, doc: &Document, id: DocumentId) {
        for (field, index) in self.indices.iter_mut() {
            index.remove(doc, field, id);
        }
    }
}

/// In-memory document store
///
/// Ids come from one store-wide counter that is never rewound, so a
/// dropped and reloaded collection gets fresh ids.
#[derive(Debug)]
pub struct DocumentStore {
    collections: IndexMap<String, Collection>,
    next_id: u64,
    open: bool,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            collections: IndexMap::new(),
            next_id: 1,
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Close the store; every later operation fails with [`DocumentError::Closed`]
    pub fn close(&mut self) {
        self.open = false;
    }

    fn ensure_open(&self) -> DocumentResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DocumentError::Closed)
        }
    }

    fn collection(&self, name: &str) -> DocumentResult<&Collection> {
        self.ensure_open()?;
        self.collections
            .get(name)
            .ok_or_else(|| DocumentError::CollectionNotFound(name.to_string()))
    }

    /// Insert one document, creating the collection on first use
    pub fn insert_one(&mut self, collection: &str, document: Value) -> DocumentResult<DocumentId> {
        self.ensure_open()?;
        let mut doc = match document {
            Value::Object(map) => map,
            other => return Err(DocumentError::NotAnObject(type_name(&other))),
        };

        let id = DocumentId(self.next_id);
        doc.insert(ID_FIELD.to_string(), id.to_value());

        let coll = self.collections.entry(collection.to_string()).or_default();
        coll.check_unique(collection, &doc, id)?;
        coll.index(&doc, id);
        coll.documents.insert(id, doc);
        self.next_id += 1;

        debug!("Inserted document {} into {}", id, collection);
        Ok(id)
    }

    /// Insert several documents in order, stopping at the first failure
    pub fn insert_many(&mut self, collection: &str, documents: Vec<Value>) -> DocumentResult<Vec<DocumentId>> {
        documents
            .into_iter()
            .map(|doc| self.insert_one(collection, doc))
            .collect()
    }

    /// Fetch a document by id
    pub fn get(&self, collection: &str, id: DocumentId) -> DocumentResult<Option<&Document>> {
        Ok(self.collection(collection)?.documents.get(&id))
    }

    /// Apply patches to one document; all or nothing
    pub fn update_by_id(&mut self, collection: &str, id: DocumentId, ops: &[UpdateOp]) -> DocumentResult<()> {
        self.ensure_open()?;
        let coll = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| DocumentError::CollectionNotFound(collection.to_string()))?;
        let current = coll
            .documents
            .get(&id)
            .ok_or_else(|| DocumentError::DocumentNotFound {
                collection: collection.to_string(),
                id,
            })?;

        let mut updated = current.clone();
        for op in ops {
            match op {
                UpdateOp::Set(field, value) => {
                    updated.insert(field.clone(), value.clone());
                }
                UpdateOp::Push(field, value) => {
                    match updated.entry(field.clone()).or_insert_with(|| Value::Array(Vec::new())) {
                        Value::Array(items) => items.push(value.clone()),
                        _ => return Err(DocumentError::FieldNotArray(field.clone())),
                    }
                }
                UpdateOp::Unset(field) => {
                    updated.remove(field);
                }
                UpdateOp::InsertAt(field, index, value) => {
                    match updated.entry(field.clone()).or_insert_with(|| Value::Array(Vec::new())) {
                        Value::Array(items) => items.insert((*index).min(items.len()), value.clone()),
                        _ => return Err(DocumentError::FieldNotArray(field.clone())),
                    }
                }
                UpdateOp::Pull(field, pattern) => match updated.get_mut(field) {
                    Some(Value::Array(items)) => items.retain(|item| !pull_matches(item, pattern)),
                    Some(_) => return Err(DocumentError::FieldNotArray(field.clone())),
                    None => {}
                },
            }
        }
        updated.insert(ID_FIELD.to_string(), id.to_value());

        coll.check_unique(collection, &updated, id)?;
        let previous = current.clone();
        coll.unindex(&previous, id);
        coll.index(&updated, id);
        coll.documents.insert(id, updated);
        Ok(())
    }

    /// Remove one document and its index entries, returning it
    pub fn delete_one(&mut self, collection: &str, id: DocumentId) -> DocumentResult<Document> {
        self.ensure_open()?;
        let coll = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| DocumentError::CollectionNotFound(collection.to_string()))?;
        let doc = coll
            .documents
            .shift_remove(&id)
            .ok_or_else(|| DocumentError::DocumentNotFound {
                collection: collection.to_string(),
                id,
            })?;
        coll.unindex(&doc, id);

        debug!("Deleted document {} from {}", id, collection);
        Ok(doc)
    }

    /// All documents matching `predicate`, in insertion order
    ///
    /// A missing collection reads as empty.
    pub fn find<F>(&self, collection: &str, predicate: F) -> DocumentResult<Vec<&Document>>
    where
        F: Fn(&Document) -> bool,
    {
        self.ensure_open()?;
        Ok(self
            .collections
            .get(collection)
            .map(|coll| coll.documents.values().filter(|doc| predicate(doc)).collect())
            .unwrap_or_default())
    }

    /// Documents whose value at `field` (dotted path) equals `value`
    pub fn find_by_field(&self, collection: &str, field: &str, value: &Value) -> DocumentResult<Vec<&Document>> {
        self.ensure_open()?;
        let Some(coll) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        if let Some(index) = coll.indices.get(field) {
            let ids = index.entries.get(&value.to_string()).cloned().unwrap_or_default();
            let mut docs: Vec<(usize, &Document)> = ids
                .iter()
                .filter_map(|id| coll.documents.get_full(id).map(|(pos, _, doc)| (pos, doc)))
                .collect();
            docs.sort_by_key(|(pos, _)| *pos);
            return Ok(docs.into_iter().map(|(_, doc)| doc).collect());
        }

        Ok(coll
            .documents
            .values()
            .filter(|doc| lookup_path(doc, field).contains(&value))
            .collect())
    }

    /// Number of documents in a collection (0 if absent)
    pub fn count(&self, collection: &str) -> DocumentResult<usize> {
        self.ensure_open()?;
        Ok(self.collections.get(collection).map(|c| c.documents.len()).unwrap_or(0))
    }

    /// Drop a collection with its indices; returns whether it existed
    pub fn drop_collection(&mut self, collection: &str) -> DocumentResult<bool> {
        self.ensure_open()?;
        Ok(self.collections.shift_remove(collection).is_some())
    }

    /// Declare a field index, backfilling existing documents
    pub fn create_index(&mut self, collection: &str, field: &str, unique: bool) -> DocumentResult<()> {
        self.ensure_open()?;
        let coll = self.collections.entry(collection.to_string()).or_default();

        let mut index = FieldIndex {
            unique,
            entries: BTreeMap::new(),
        };
        for (id, doc) in &coll.documents {
            if unique {
                if let Some(value) = index.conflict(doc, field, *id) {
                    return Err(DocumentError::DuplicateKey {
                        collection: collection.to_string(),
                        field: field.to_string(),
                        value,
                    });
                }
            }
            index.insert(doc, field, *id);
        }
        coll.indices.insert(field.to_string(), index);
        Ok(())
    }

    /// Indexed fields of a collection, sorted
    pub fn index_fields(&self, collection: &str) -> DocumentResult<Vec<String>> {
        let mut fields: Vec<String> = self.collection(collection)?.indices.keys().cloned().collect();
        fields.sort();
        Ok(fields)
    }

    /// Collection names in creation order
    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
