use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::{DefinitionStore, DocumentKind, NamespaceError, NamespaceProvisioner, StoreError, StoreResult};

type Documents = HashMap<DocumentKind, BTreeMap<String, Value>>;

/// In-memory document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Documents>> {
        self.documents
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl DefinitionStore for MemoryStore {
    fn find_by_key(&self, kind: DocumentKind, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.lock()?.get(&kind).and_then(|docs| docs.get(key)).cloned())
    }

    fn find_all(&self, kind: DocumentKind) -> StoreResult<Vec<Value>> {
        Ok(self
            .lock()?
            .get(&kind)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn insert(&self, kind: DocumentKind, key: &str, doc: Value) -> StoreResult<()> {
        let mut documents = self.lock()?;
        let docs = documents.entry(kind).or_default();
        if docs.contains_key(key) {
            return Err(StoreError::DuplicateKey { key: key.to_string() });
        }
        docs.insert(key.to_string(), doc);
        Ok(())
    }

    fn update_by_key(&self, kind: DocumentKind, key: &str, new_key: &str, doc: Value) -> StoreResult<()> {
        let mut documents = self.lock()?;
        let docs = documents.entry(kind).or_default();
        if !docs.contains_key(key) {
            return Err(StoreError::NotFound { key: key.to_string() });
        }
        if key != new_key {
            if docs.contains_key(new_key) {
                return Err(StoreError::DuplicateKey {
                    key: new_key.to_string(),
                });
            }
            docs.remove(key);
        }
        docs.insert(new_key.to_string(), doc);
        Ok(())
    }

    fn delete_by_key(&self, kind: DocumentKind, key: &str) -> StoreResult<bool> {
        Ok(self
            .lock()?
            .get_mut(&kind)
            .map(|docs| docs.remove(key).is_some())
            .unwrap_or(false))
    }
}

/// In-memory namespace registry paired with [`MemoryStore`]
#[derive(Debug, Default)]
pub struct MemoryNamespaces {
    names: Mutex<BTreeSet<String>>,
}

impl MemoryNamespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.lock().map(|names| names.contains(name)).unwrap_or(false)
    }
}

impl NamespaceProvisioner for MemoryNamespaces {
    fn create_namespace(&self, name: &str) -> Result<(), NamespaceError> {
        let mut names = self
            .names
            .lock()
            .map_err(|_| NamespaceError::Failed("namespace lock poisoned".to_string()))?;
        if !names.insert(name.to_string()) {
            return Err(NamespaceError::AlreadyExists(name.to_string()));
        }
        Ok(())
    }
}
