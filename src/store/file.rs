//! File-backed store
//!
//! ```text
//! <root>/
//! ├── custom-fields/
//! │   └── <sha256(key)>.json     {"key": "...", "document": {...}}
//! ├── layouts/
//! ├── templates/
//! ├── forms/
//! ├── collections/
//! ├── submissions/
//! └── namespaces/
//!     └── <collection name>/
//! ```
//!
//! Keys are hashed into file names so any name is storable. New documents are
//! created with create-new semantics, which makes the filesystem the final
//! uniqueness arbiter when two writers race on the same key.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use ulid::Ulid;
use walkdir::WalkDir;

use super::{DefinitionStore, DocumentKind, NamespaceError, NamespaceProvisioner, StoreError, StoreResult};
use crate::checksum::Checksum;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    document: Value,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: DocumentKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    fn document_path(&self, kind: DocumentKind, key: &str) -> PathBuf {
        self.kind_dir(kind)
            .join(format!("{}.json", Checksum::from_str(key)))
    }

    fn read_envelope(path: &Path) -> StoreResult<Option<Envelope>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a path that must not exist yet
    fn create_new(path: &Path, envelope: &Envelope) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(envelope)?;
        Self::create_with(path, &envelope.key, |file| file.write_all(content.as_bytes()))
    }

    /// Create `path` exclusively and fill it with `write`. A failed write removes
    /// the file again so the key stays free.
    fn create_with<F>(path: &Path, key: &str, write: F) -> StoreResult<()>
    where
        F: FnOnce(&mut File) -> std::io::Result<()>,
    {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::DuplicateKey { key: key.to_string() })
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = write(&mut file).and_then(|_| file.sync_all()) {
            drop(file);
            if let Err(cleanup) = fs::remove_file(path) {
                warn!(?path, %cleanup, "could not remove partially written document");
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Write to a temp file then rename over `path`
    fn replace(path: &Path, envelope: &Envelope) -> StoreResult<()> {
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::Unavailable(format!("no parent directory for {:?}", path)))?;
        let content = serde_json::to_string_pretty(envelope)?;
        let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
        let written = fs::write(&tmp, content).and_then(|_| fs::rename(&tmp, path));
        if let Err(e) = written {
            if tmp.exists() {
                if let Err(cleanup) = fs::remove_file(&tmp) {
                    warn!(path = ?tmp, %cleanup, "could not remove temp document");
                }
            }
            return Err(e.into());
        }
        Ok(())
    }
}

impl DefinitionStore for FileStore {
    fn find_by_key(&self, kind: DocumentKind, key: &str) -> StoreResult<Option<Value>> {
        let path = self.document_path(kind, key);
        debug!(?path, key, "reading document");
        Ok(Self::read_envelope(&path)?.map(|e| e.document))
    }

    fn find_all(&self, kind: DocumentKind) -> StoreResult<Vec<Value>> {
        let dir = self.kind_dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut envelopes = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_envelope(path) {
                Ok(Some(envelope)) => envelopes.push(envelope),
                Ok(None) => {}
                Err(e) => warn!(?path, %e, "skipping unreadable document"),
            }
        }

        envelopes.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(envelopes.into_iter().map(|e| e.document).collect())
    }

    fn insert(&self, kind: DocumentKind, key: &str, doc: Value) -> StoreResult<()> {
        fs::create_dir_all(self.kind_dir(kind))?;
        let envelope = Envelope {
            key: key.to_string(),
            document: doc,
        };
        Self::create_new(&self.document_path(kind, key), &envelope)
    }

    fn update_by_key(&self, kind: DocumentKind, key: &str, new_key: &str, doc: Value) -> StoreResult<()> {
        let old_path = self.document_path(kind, key);
        if !old_path.exists() {
            return Err(StoreError::NotFound { key: key.to_string() });
        }
        let envelope = Envelope {
            key: new_key.to_string(),
            document: doc,
        };
        if key == new_key {
            return Self::replace(&old_path, &envelope);
        }
        Self::create_new(&self.document_path(kind, new_key), &envelope)?;
        fs::remove_file(&old_path)?;
        Ok(())
    }

    fn delete_by_key(&self, kind: DocumentKind, key: &str) -> StoreResult<bool> {
        match fs::remove_file(self.document_path(kind, key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl NamespaceProvisioner for FileStore {
    fn create_namespace(&self, name: &str) -> Result<(), NamespaceError> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(NamespaceError::Failed(format!("invalid namespace name '{}'", name)));
        }
        let parent = self.root.join("namespaces");
        fs::create_dir_all(&parent).map_err(|e| NamespaceError::Failed(e.to_string()))?;
        match fs::create_dir(parent.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(NamespaceError::AlreadyExists(name.to_string())),
            Err(e) => Err(NamespaceError::Failed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DefinitionKind;
    use serde_json::json;
    use tempfile::tempdir;

    const FIELDS: DocumentKind = DocumentKind::Definition(DefinitionKind::CustomField);

    #[test]
    fn test_insert_and_find() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.insert(FIELDS, "status", json!({"fieldName": "status"})).unwrap();

        assert_eq!(
            store.find_by_key(FIELDS, "status").unwrap(),
            Some(json!({"fieldName": "status"}))
        );
        assert_eq!(store.find_by_key(FIELDS, "Status").unwrap(), None);
        assert!(dir.path().join("custom-fields").is_dir());
    }

    #[test]
    fn test_duplicate_insert_rejected_by_filesystem() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.insert(FIELDS, "status", json!(1)).unwrap();

        // A second handle on the same root sees the same constraint
        let other = FileStore::open(dir.path()).unwrap();
        let err = other.insert(FIELDS, "status", json!(2)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(store.find_by_key(FIELDS, "status").unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_find_all_sorted_by_key() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        for key in ["zeta", "alpha", "mid"] {
            store.insert(FIELDS, key, json!({ "k": key })).unwrap();
        }
        let keys: Vec<_> = store
            .find_all(FIELDS)
            .unwrap()
            .into_iter()
            .map(|d| d["k"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_update_in_place_and_rename() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.insert(FIELDS, "a", json!(1)).unwrap();
        store.insert(FIELDS, "b", json!(2)).unwrap();

        store.update_by_key(FIELDS, "a", "a", json!(10)).unwrap();
        assert_eq!(store.find_by_key(FIELDS, "a").unwrap(), Some(json!(10)));

        let err = store.update_by_key(FIELDS, "a", "b", json!(11)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));

        store.update_by_key(FIELDS, "a", "c", json!(12)).unwrap();
        assert_eq!(store.find_by_key(FIELDS, "a").unwrap(), None);
        assert_eq!(store.find_by_key(FIELDS, "c").unwrap(), Some(json!(12)));

        let err = store.update_by_key(FIELDS, "missing", "missing", json!(0)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.insert(FIELDS, "a", json!(1)).unwrap();
        assert!(store.delete_by_key(FIELDS, "a").unwrap());
        assert!(!store.delete_by_key(FIELDS, "a").unwrap());
    }

    #[test]
    fn test_failed_write_frees_key() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::create_dir_all(store.kind_dir(FIELDS)).unwrap();
        let path = store.document_path(FIELDS, "status");

        let err = FileStore::create_with(&path, "status", |file| {
            file.write_all(b"{\"key\": \"sta")?;
            Err(std::io::Error::new(ErrorKind::Other, "disk full"))
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!path.exists());

        assert_eq!(store.find_by_key(FIELDS, "status").unwrap(), None);
        store.insert(FIELDS, "status", json!(1)).unwrap();
        assert_eq!(store.find_by_key(FIELDS, "status").unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("occupied");
        fs::create_dir_all(target.join("inner")).unwrap();
        let envelope = Envelope {
            key: "a".into(),
            document: json!(1),
        };

        assert!(FileStore::replace(&target, &envelope).is_err());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_namespaces() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.create_namespace("crm").unwrap();
        assert!(dir.path().join("namespaces/crm").is_dir());
        assert!(matches!(store.create_namespace("crm"), Err(NamespaceError::AlreadyExists(_))));
        assert!(matches!(store.create_namespace("../x"), Err(NamespaceError::Failed(_))));
    }
}
