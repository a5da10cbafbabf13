//! Persistence collaborators
//!
//! The registry never touches storage directly; it talks to a
//! [`DefinitionStore`] holding JSON documents keyed by (kind, name key). The
//! store's own uniqueness constraint is the final arbiter for concurrent
//! creates and must surface as [`StoreError::DuplicateKey`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::{MemoryNamespaces, MemoryStore};

use serde_json::Value;
use thiserror::Error;

use crate::definition::DefinitionKind;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate key: {key}")]
    DuplicateKey { key: String },

    #[error("no document with key: {key}")]
    NotFound { key: String },

    #[error("{0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Unavailable(format!("malformed document: {}", err))
    }
}

/// A stored document family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    Definition(DefinitionKind),
    Submission,
}

impl DocumentKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            DocumentKind::Definition(kind) => kind.dir_name(),
            DocumentKind::Submission => "submissions",
        }
    }
}

impl From<DefinitionKind> for DocumentKind {
    fn from(kind: DefinitionKind) -> Self {
        DocumentKind::Definition(kind)
    }
}

/// Document storage consumed by the registry
pub trait DefinitionStore {
    fn find_by_key(&self, kind: DocumentKind, key: &str) -> StoreResult<Option<Value>>;

    /// All documents of a kind, ordered by key
    fn find_all(&self, kind: DocumentKind) -> StoreResult<Vec<Value>>;

    /// Insert a new document; an existing key is a `DuplicateKey`
    fn insert(&self, kind: DocumentKind, key: &str, doc: Value) -> StoreResult<()>;

    /// Replace the document at `key`, moving it to `new_key` when they differ.
    /// Moving onto an existing key is a `DuplicateKey`.
    fn update_by_key(&self, kind: DocumentKind, key: &str, new_key: &str, doc: Value) -> StoreResult<()>;

    /// Remove a document; `false` when nothing was stored under `key`
    fn delete_by_key(&self, kind: DocumentKind, key: &str) -> StoreResult<bool>;
}

#[derive(Error, Debug)]
pub enum NamespaceError {
    #[error("namespace already exists: {0}")]
    AlreadyExists(String),

    #[error("namespace provisioning failed: {0}")]
    Failed(String),
}

/// Creates the physical namespace backing a collection
pub trait NamespaceProvisioner {
    fn create_namespace(&self, name: &str) -> Result<(), NamespaceError>;
}
