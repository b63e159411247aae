//! Crate-wide error types
//!
//! [`StoreError`] covers target-store operations; [`LoadError`] covers a
//! load run, from reading the dataset through verification.

use crate::document::DocumentError;
use crate::graph::GraphError;
use crate::resolver::EntityKind;
use crate::verify::CountCheck;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a target store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Operation not supported by this store: {0}")]
    Unsupported(&'static str),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the store itself is gone, as opposed to one operation failing
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_)
                | StoreError::Graph(GraphError::Closed)
                | StoreError::Document(DocumentError::Closed)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised during a load run
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Duplicate {kind} key: {key}")]
    DuplicateKey { kind: EntityKind, key: String },

    #[error("Unresolved {kind} reference: {key}")]
    UnresolvedReference { kind: EntityKind, key: String },

    #[error("Target store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Verification failed: {} count(s) disagree", mismatches.len())]
    VerificationMismatch { mismatches: Vec<CountCheck> },

    #[error("Invalid dataset: {0}")]
    Dataset(String),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for LoadError {
    fn from(err: StoreError) -> Self {
        if err.is_unavailable() {
            LoadError::StoreUnavailable(err.to_string())
        } else {
            LoadError::Store(err)
        }
    }
}

impl LoadError {
    /// Stable short name of the error kind, used in reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            LoadError::DuplicateKey { .. } => "DuplicateKey",
            LoadError::UnresolvedReference { .. } => "UnresolvedReference",
            LoadError::StoreUnavailable(_) => "StoreUnavailable",
            LoadError::Store(_) => "Store",
            LoadError::VerificationMismatch { .. } => "VerificationMismatch",
            LoadError::Dataset(_) => "Dataset",
            LoadError::Io { .. } => "Io",
            LoadError::Json { .. } => "Json",
            LoadError::Config(_) => "Config",
        }
    }

    /// Errors that end the whole run rather than one record
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoadError::StoreUnavailable(_))
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
