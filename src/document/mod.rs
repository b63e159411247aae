//! Document store
//!
//! Named collections of JSON documents with store-assigned ids, used as the
//! document-oriented load target.

pub mod store;

pub use store::{
    lookup_path, Document, DocumentError, DocumentId, DocumentResult, DocumentStore, UpdateOp, ID_FIELD,
};
