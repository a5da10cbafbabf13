//! Definition Registry
//!
//! Enforces identity and categorization rules for the five definition kinds on
//! top of any [`DefinitionStore`]. Nothing is cached between calls: every write
//! re-checks uniqueness against the store, and a duplicate-key rejection from
//! the store is reported exactly like the registry's own pre-check.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::definition::{Collection, CustomField, Definition, DefinitionKind, Form, FormLayout, Submission, Template};
use crate::error::{DefinitionError, Result};
use crate::lov::CustomFieldLookup;
use crate::query::{category_enumeration, filter_definitions, suggest_names, DefinitionFilter};
use crate::store::{DefinitionStore, DocumentKind, NamespaceError, NamespaceProvisioner, StoreError};
use crate::update::apply_update;

/// Run `$body` with `$d` bound to the definition type for `$kind`
macro_rules! with_kind {
    ($kind:expr, $d:ident => $body:expr) => {
        match $kind {
            DefinitionKind::Collection => {
                type $d = Collection;
                $body
            }
            DefinitionKind::CustomField => {
                type $d = CustomField;
                $body
            }
            DefinitionKind::FormLayout => {
                type $d = FormLayout;
                $body
            }
            DefinitionKind::Template => {
                type $d = Template;
                $body
            }
            DefinitionKind::Form => {
                type $d = Form;
                $body
            }
        }
    };
}

pub type SharedProvisioner = Arc<dyn NamespaceProvisioner + Send + Sync>;

/// The definition registry
pub struct DefinitionRegistry<S> {
    store: S,
    /// Called when a collection is created; `None` skips provisioning
    provisioner: Option<SharedProvisioner>,
}

impl<S: DefinitionStore> DefinitionRegistry<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            provisioner: None,
        }
    }

    pub fn with_provisioner(mut self, provisioner: SharedProvisioner) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fail with `DuplicateName` if `name` (after normalization) is taken
    pub fn check_unique_name(&self, kind: DefinitionKind, name: &str) -> Result<()> {
        let key = kind.normalize_key(name);
        let existing = self
            .store
            .find_by_key(kind.into(), &key)
            .map_err(|e| DefinitionError::from_store(e, kind, &key))?;
        match existing {
            Some(_) => Err(DefinitionError::DuplicateName { kind, name: key }),
            None => Ok(()),
        }
    }

    /// Validate and store a new definition
    pub fn create<D: Definition>(&self, mut def: D) -> Result<D> {
        def.normalize();
        def.validate()?;
        def.validate_new()?;
        self.check_unique_name(D::KIND, def.key())?;

        def.stamp_created(Utc::now());
        let key = def.key().to_string();
        let doc = serde_json::to_value(&def)?;
        self.store
            .insert(D::KIND.into(), &key, doc)
            .map_err(|e| DefinitionError::from_store(e, D::KIND, &key))?;
        info!(kind = %D::KIND, key = key.as_str(), id = %def.id(), "created definition");

        if D::KIND == DefinitionKind::Collection {
            self.provision_namespace(&key);
        }
        Ok(def)
    }

    /// Decode a raw payload and create it
    pub fn create_raw<D: Definition>(&self, raw: &Value) -> Result<D> {
        self.create(D::decode(raw)?)
    }

    /// Best effort: the collection record stands whatever happens here
    fn provision_namespace(&self, name: &str) {
        let Some(provisioner) = &self.provisioner else {
            return;
        };
        match provisioner.create_namespace(name) {
            Ok(()) => debug!(namespace = name, "provisioned namespace"),
            Err(NamespaceError::AlreadyExists(_)) => debug!(namespace = name, "namespace already exists"),
            Err(e) => warn!(namespace = name, error = %e, "namespace provisioning failed"),
        }
    }

    pub fn find<D: Definition>(&self, name: &str) -> Result<Option<D>> {
        let key = D::KIND.normalize_key(name);
        debug!(kind = %D::KIND, key = key.as_str(), "looking up definition");
        let doc = self
            .store
            .find_by_key(D::KIND.into(), &key)
            .map_err(|e| DefinitionError::from_store(e, D::KIND, &key))?;
        doc.map(|doc| D::decode(&doc)).transpose()
    }

    pub fn get<D: Definition>(&self, name: &str) -> Result<D> {
        self.find(name)?.ok_or_else(|| DefinitionError::NotFound {
            kind: D::KIND,
            name: D::KIND.normalize_key(name),
        })
    }

    /// All stored definitions of a kind, ordered by name key.
    ///
    /// Documents that no longer decode are skipped with a warning.
    pub fn list<D: Definition>(&self) -> Result<Vec<D>> {
        let docs = self.store.find_all(D::KIND.into())?;
        Ok(docs
            .iter()
            .filter_map(|doc| match D::decode(doc) {
                Ok(def) => Some(def),
                Err(e) => {
                    warn!(kind = %D::KIND, error = %e, "skipping undecodable definition");
                    None
                }
            })
            .collect())
    }

    pub fn filter<D: Definition>(&self, filter: &DefinitionFilter) -> Result<Vec<D>> {
        filter_definitions(self.list::<D>()?, filter)
    }

    pub fn categories<D: Definition>(&self) -> Result<Vec<String>> {
        Ok(category_enumeration(&self.list::<D>()?))
    }

    /// Apply a partial update under the kind's update policy.
    ///
    /// A changed name key is normalized and re-checked for uniqueness.
    pub fn update<D: Definition>(&self, name: &str, patch: &Value) -> Result<D> {
        let existing: D = self.get(name)?;
        let mut updated = apply_update(&existing, patch)?;

        let old_key = existing.key();
        let new_key = updated.key().to_string();
        if new_key != old_key {
            self.check_unique_name(D::KIND, &new_key)?;
        }

        updated.stamp_updated(Utc::now());
        let doc = serde_json::to_value(&updated)?;
        self.store
            .update_by_key(D::KIND.into(), old_key, &new_key, doc)
            .map_err(|e| match e {
                StoreError::DuplicateKey { .. } => DefinitionError::from_store(e, D::KIND, &new_key),
                other => DefinitionError::from_store(other, D::KIND, old_key),
            })?;
        info!(kind = %D::KIND, key = new_key.as_str(), "updated definition");
        Ok(updated)
    }

    /// Remove a definition. References to it elsewhere are left as they are.
    pub fn delete(&self, kind: DefinitionKind, name: &str) -> Result<()> {
        let key = kind.normalize_key(name);
        let removed = self
            .store
            .delete_by_key(kind.into(), &key)
            .map_err(|e| DefinitionError::from_store(e, kind, &key))?;
        if !removed {
            return Err(DefinitionError::NotFound { kind, name: key });
        }
        info!(%kind, key = key.as_str(), "deleted definition");
        Ok(())
    }

    /// Stored name keys of a kind
    pub fn names(&self, kind: DefinitionKind) -> Result<Vec<String>> {
        Ok(self
            .store
            .find_all(kind.into())?
            .iter()
            .filter_map(|doc| doc.get(kind.key_attr()).and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    /// Existing names closest to `query`
    pub fn suggest_names(&self, kind: DefinitionKind, query: &str, limit: usize) -> Result<Vec<String>> {
        let names = self.names(kind)?;
        Ok(suggest_names(names.iter().map(String::as_str), query, limit))
    }

    pub fn create_json(&self, kind: DefinitionKind, raw: &Value) -> Result<Value> {
        with_kind!(kind, D => Ok(serde_json::to_value(self.create_raw::<D>(raw)?)?))
    }

    pub fn get_json(&self, kind: DefinitionKind, name: &str) -> Result<Value> {
        with_kind!(kind, D => Ok(serde_json::to_value(self.get::<D>(name)?)?))
    }

    pub fn list_json(&self, kind: DefinitionKind, filter: &DefinitionFilter) -> Result<Vec<Value>> {
        with_kind!(kind, D => self
            .filter::<D>(filter)?
            .iter()
            .map(|def| serde_json::to_value(def).map_err(DefinitionError::from))
            .collect())
    }

    pub fn update_json(&self, kind: DefinitionKind, name: &str, patch: &Value) -> Result<Value> {
        with_kind!(kind, D => Ok(serde_json::to_value(self.update::<D>(name, patch)?)?))
    }

    pub fn categories_of(&self, kind: DefinitionKind) -> Result<Vec<String>> {
        with_kind!(kind, D => self.categories::<D>())
    }

    /// Record answers against the form currently named `form_name`
    pub fn submit(&self, form_name: &str, data: Map<String, Value>) -> Result<Submission> {
        let form: Form = self.get(form_name)?;
        let submission = Submission::for_form(&form, data);
        let key = submission.id.to_string();
        self.store
            .insert(DocumentKind::Submission, &key, serde_json::to_value(&submission)?)?;
        info!(form = form.form_name.as_str(), id = key.as_str(), "recorded submission");
        Ok(submission)
    }

    /// Submissions recorded against the form currently named `form_name`
    pub fn list_submissions(&self, form_name: &str) -> Result<Vec<Submission>> {
        let form: Form = self.get(form_name)?;
        let docs = self.store.find_all(DocumentKind::Submission)?;
        let mut submissions = Vec::new();
        for doc in docs {
            match serde_json::from_value::<Submission>(doc) {
                Ok(s) if s.form_id == form.id => submissions.push(s),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping undecodable submission"),
            }
        }
        submissions.sort_by_key(|s| s.submitted_at);
        Ok(submissions)
    }
}

impl<S: DefinitionStore> CustomFieldLookup for DefinitionRegistry<S> {
    fn find_custom_field(&self, field_name: &str) -> Result<Option<CustomField>> {
        self.find(field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{ChoiceAttrs, FieldDefinition, FieldKind, FieldSpec};
    use crate::lov::{resolve_options, LovItem, LovType};
    use crate::store::{MemoryNamespaces, MemoryStore, StoreResult};
    use serde_json::json;

    fn registry() -> DefinitionRegistry<MemoryStore> {
        DefinitionRegistry::new(MemoryStore::new())
    }

    #[test]
    fn test_duplicate_custom_field() {
        let reg = registry();
        let first = reg
            .create(CustomField::new("status", "Status", FieldKind::Text))
            .unwrap();
        let err = reg
            .create(CustomField::new("status", "Other", FieldKind::Number))
            .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateName { kind: DefinitionKind::CustomField, .. }));

        let stored: CustomField = reg.get("status").unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.field_label, "Status");
    }

    #[test]
    fn test_names_are_trimmed_not_folded() {
        let reg = registry();
        reg.create(Template::new("  Intake ", "HR", Vec::new())).unwrap();
        assert!(reg.find::<Template>("Intake").unwrap().is_some());
        reg.create(Template::new("intake", "HR", Vec::new())).unwrap();
        assert_eq!(reg.list::<Template>().unwrap().len(), 2);
    }

    #[test]
    fn test_form_names_upper_cased() {
        let reg = registry();
        let form = reg.create(Form::new("crm", "contact us", Vec::new())).unwrap();
        assert_eq!(form.form_name, "CONTACT US");
        let err = reg.create(Form::new("crm", "Contact Us", Vec::new())).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateName { ref name, .. } if name == "CONTACT US"));
        assert!(reg.find::<Form>("contact us").unwrap().is_some());
    }

    #[test]
    fn test_grid_layout_not_creatable() {
        let err = registry()
            .create_json(
                DefinitionKind::FormLayout,
                &json!({"layoutName": "Old", "layoutType": "grid-layout"}),
            )
            .unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidEnum { ref field, .. } if field == "layoutType"));
    }

    #[test]
    fn test_validation_before_write() {
        let reg = registry();
        let err = reg
            .create_json(
                DefinitionKind::CustomField,
                &json!({"fieldName": "x", "fieldLabel": "X", "dataType": "slider"}),
            )
            .unwrap_err();
        assert!(err.is_validation());
        assert!(reg.list::<CustomField>().unwrap().is_empty());
    }

    #[test]
    fn test_update_rename_collision() {
        let reg = registry();
        reg.create(CustomField::new("a", "A", FieldKind::Text)).unwrap();
        reg.create(CustomField::new("b", "B", FieldKind::Text)).unwrap();
        let err = reg.update::<CustomField>("a", &json!({"fieldName": "b"})).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateName { ref name, .. } if name == "b"));

        let renamed = reg.update::<CustomField>("a", &json!({"fieldName": " c "})).unwrap();
        assert_eq!(renamed.field_name, "c");
        assert!(reg.find::<CustomField>("a").unwrap().is_none());
        assert!(renamed.updated_at >= renamed.created_at);
    }

    #[test]
    fn test_update_missing() {
        let err = registry().update::<Template>("nope", &json!({"category": "x"})).unwrap_err();
        assert!(matches!(err, DefinitionError::NotFound { .. }));
    }

    #[test]
    fn test_delete_does_not_cascade() {
        let reg = registry();
        reg.create(
            CustomField::new("status", "Status", FieldKind::Dropdown)
                .with_lov(LovType::UserDefined, vec![LovItem::new("A", "Alpha")]),
        )
        .unwrap();
        let field = FieldDefinition::new("s", "Status", FieldSpec::Dropdown(ChoiceAttrs::referenced("status")));
        reg.create(Form::new("crm", "f", vec![field.clone()])).unwrap();

        assert_eq!(resolve_options(&field, &reg).unwrap().values(), vec!["A"]);
        reg.delete(DefinitionKind::CustomField, "status").unwrap();

        let form: Form = reg.get("F").unwrap();
        assert_eq!(form.form_json.fields[0].custom_field_id(), Some("status"));
        let options = resolve_options(&field, &reg).unwrap();
        assert!(options.is_dangling());
        assert!(options.is_empty());

        let err = reg.delete(DefinitionKind::CustomField, "status").unwrap_err();
        assert!(matches!(err, DefinitionError::NotFound { .. }));
    }

    #[test]
    fn test_collection_provisioning() {
        let namespaces = Arc::new(MemoryNamespaces::new());
        namespaces.create_namespace("existing").unwrap();
        let reg = registry().with_provisioner(namespaces.clone());

        reg.create(Collection::new("crm", "Customer data")).unwrap();
        assert!(namespaces.contains("crm"));

        // An existing namespace does not block the record
        reg.create(Collection::new("existing", "")).unwrap();
        assert!(reg.find::<Collection>("existing").unwrap().is_some());
    }

    struct FailingNamespaces;

    impl NamespaceProvisioner for FailingNamespaces {
        fn create_namespace(&self, _name: &str) -> std::result::Result<(), NamespaceError> {
            Err(NamespaceError::Failed("engine offline".into()))
        }
    }

    #[test]
    fn test_provisioning_failure_is_not_fatal() {
        let reg = registry().with_provisioner(Arc::new(FailingNamespaces));
        reg.create(Collection::new("crm", "")).unwrap();
        assert!(reg.find::<Collection>("crm").unwrap().is_some());
    }

    /// Passes the pre-check but loses the race at insert time
    struct RacingStore(MemoryStore);

    impl DefinitionStore for RacingStore {
        fn find_by_key(&self, _kind: DocumentKind, _key: &str) -> StoreResult<Option<Value>> {
            Ok(None)
        }
        fn find_all(&self, kind: DocumentKind) -> StoreResult<Vec<Value>> {
            self.0.find_all(kind)
        }
        fn insert(&self, kind: DocumentKind, key: &str, doc: Value) -> StoreResult<()> {
            self.0.insert(kind, key, doc)
        }
        fn update_by_key(&self, kind: DocumentKind, key: &str, new_key: &str, doc: Value) -> StoreResult<()> {
            self.0.update_by_key(kind, key, new_key, doc)
        }
        fn delete_by_key(&self, kind: DocumentKind, key: &str) -> StoreResult<bool> {
            self.0.delete_by_key(kind, key)
        }
    }

    #[test]
    fn test_store_duplicate_key_is_duplicate_name() {
        let reg = DefinitionRegistry::new(RacingStore(MemoryStore::new()));
        reg.create(Template::new("Intake", "HR", Vec::new())).unwrap();
        let err = reg.create(Template::new("Intake", "HR", Vec::new())).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateName { .. }));
    }

    /// Delegates reads to `inner` unless `reads_fail`; every write fails
    struct FailingStore {
        inner: MemoryStore,
        reads_fail: bool,
    }

    impl FailingStore {
        fn offline<T>() -> StoreResult<T> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn read<T>(&self, read: impl FnOnce(&MemoryStore) -> StoreResult<T>) -> StoreResult<T> {
            if self.reads_fail {
                return Self::offline();
            }
            read(&self.inner)
        }
    }

    impl DefinitionStore for FailingStore {
        fn find_by_key(&self, kind: DocumentKind, key: &str) -> StoreResult<Option<Value>> {
            self.read(|s| s.find_by_key(kind, key))
        }
        fn find_all(&self, kind: DocumentKind) -> StoreResult<Vec<Value>> {
            self.read(|s| s.find_all(kind))
        }
        fn insert(&self, _kind: DocumentKind, _key: &str, _doc: Value) -> StoreResult<()> {
            Self::offline()
        }
        fn update_by_key(&self, _kind: DocumentKind, _key: &str, _new_key: &str, _doc: Value) -> StoreResult<()> {
            Self::offline()
        }
        fn delete_by_key(&self, _kind: DocumentKind, _key: &str) -> StoreResult<bool> {
            Self::offline()
        }
    }

    fn is_unavailable<T: std::fmt::Debug>(result: Result<T>) -> bool {
        matches!(result, Err(DefinitionError::StorageUnavailable(_)))
    }

    #[test]
    fn test_unreachable_store_is_storage_unavailable() {
        let reg = DefinitionRegistry::new(FailingStore {
            inner: MemoryStore::new(),
            reads_fail: true,
        });

        assert!(is_unavailable(reg.create(Template::new("Intake", "HR", Vec::new()))));
        assert!(is_unavailable(reg.get::<Template>("Intake")));
        assert!(is_unavailable(reg.list::<Template>()));
        assert!(is_unavailable(reg.update::<Template>("Intake", &json!({"category": "Ops"}))));
        assert!(is_unavailable(reg.delete(DefinitionKind::Template, "Intake")));
        assert!(is_unavailable(reg.check_unique_name(DefinitionKind::Template, "Intake")));
    }

    #[test]
    fn test_rejected_write_is_storage_unavailable() {
        let seeded = registry();
        seeded.create(Template::new("Intake", "HR", Vec::new())).unwrap();
        let reg = DefinitionRegistry::new(FailingStore {
            inner: seeded.store,
            reads_fail: false,
        });

        assert!(is_unavailable(reg.create(Template::new("Exit", "HR", Vec::new()))));
        assert!(is_unavailable(reg.update::<Template>("Intake", &json!({"category": "Ops"}))));
        assert!(is_unavailable(reg.update::<Template>("Intake", &json!({"name": "Renamed"}))));
        assert_eq!(reg.get::<Template>("Intake").unwrap().category, "HR");
    }

    #[test]
    fn test_submissions_follow_form_identity() {
        let reg = registry();
        reg.create(Form::new("crm", "contact", Vec::new())).unwrap();
        let mut data = Map::new();
        data.insert("email".into(), json!("a@example.com"));
        let submission = reg.submit("contact", data).unwrap();
        assert_eq!(submission.form_name, "CONTACT");

        reg.update::<Form>("CONTACT", &json!({"formName": "reach us"})).unwrap();
        let submissions = reg.list_submissions("reach us").unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].form_name, "CONTACT");

        assert!(matches!(
            reg.submit("contact", Map::new()).unwrap_err(),
            DefinitionError::NotFound { .. }
        ));
    }

    #[test]
    fn test_suggest_names() {
        let reg = registry();
        reg.create(CustomField::new("status", "Status", FieldKind::Text)).unwrap();
        reg.create(CustomField::new("department", "Dept", FieldKind::Text)).unwrap();
        assert_eq!(reg.suggest_names(DefinitionKind::CustomField, "stat", 3).unwrap(), vec!["status"]);
    }
}
