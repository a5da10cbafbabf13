//! Partial updates
//!
//! Each definition kind carries its own update contract:
//!
//! | Kind         | Merge                                                        |
//! |--------------|--------------------------------------------------------------|
//! | Custom Field | every key in the patch                                       |
//! | Form Layout  | `layoutName`, `category`, `fields`, `layoutConfig`           |
//! | Template     | `name`, `category`, `fields`, `layoutConfig`                 |
//! | Form         | `collectionName`, `formName`, `formJson`, `fields`, `styles`, `surveyJson` |
//! | Collection   | `description`                                                |
//!
//! Keys outside a kind's allowlist are dropped without error. Identity and
//! timestamp keys are never taken from a patch.

use serde_json::{Map, Value};
use tracing::debug;

use crate::definition::{expect_object, Collection, CustomField, Definition, DefinitionKind, Form, FormLayout, Template};
use crate::error::{DefinitionError, Result};

/// Keys owned by the registry
pub const SYSTEM_KEYS: &[&str] = &["id", "createdAt", "updatedAt"];

/// How a patch is merged into a stored definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Any key present in the patch replaces the stored key
    MergeAll,
    /// Only the listed keys are merged
    Allowlist(&'static [&'static str]),
}

impl UpdatePolicy {
    pub fn allows(&self, key: &str) -> bool {
        if SYSTEM_KEYS.contains(&key) {
            return false;
        }
        match self {
            UpdatePolicy::MergeAll => true,
            UpdatePolicy::Allowlist(keys) => keys.contains(&key),
        }
    }
}

pub fn update_policy(kind: DefinitionKind) -> UpdatePolicy {
    match kind {
        DefinitionKind::CustomField => UpdatePolicy::MergeAll,
        DefinitionKind::FormLayout => UpdatePolicy::Allowlist(&["layoutName", "category", "fields", "layoutConfig"]),
        DefinitionKind::Template => UpdatePolicy::Allowlist(&["name", "category", "fields", "layoutConfig"]),
        DefinitionKind::Form => UpdatePolicy::Allowlist(&[
            "collectionName",
            "formName",
            "formJson",
            "fields",
            "styles",
            "surveyJson",
        ]),
        DefinitionKind::Collection => UpdatePolicy::Allowlist(&["description"]),
    }
}

/// Merge `patch` into `existing` under the kind's policy, without validating
pub fn merge_patch(kind: DefinitionKind, existing: &Value, patch: &Value) -> Result<Value> {
    let mut merged: Map<String, Value> = expect_object(existing, kind.as_str())?.clone();
    let patch = patch
        .as_object()
        .ok_or_else(|| DefinitionError::validation("patch", "payload must be a JSON object"))?;

    let policy = update_policy(kind);
    for (key, value) in patch {
        if policy.allows(key) {
            merged.insert(key.clone(), value.clone());
        } else {
            debug!(%kind, key = key.as_str(), "ignoring key outside update set");
        }
    }
    Ok(Value::Object(merged))
}

/// Apply a patch to a typed definition and re-validate the result
pub fn apply_update<D: Definition>(existing: &D, patch: &Value) -> Result<D> {
    let current = serde_json::to_value(existing)?;
    let merged = merge_patch(D::KIND, &current, patch)?;
    let mut updated = D::decode(&merged)?;
    updated.normalize();
    updated.validate()?;
    Ok(updated)
}

/// Apply a patch to a stored document of any kind.
///
/// Enumerated attributes in the merged result are re-checked, so a patch
/// setting a Custom Field's `dataType` to an unknown kind fails with
/// `InvalidEnum` and nothing is written.
pub fn apply_partial_update(kind: DefinitionKind, existing: &Value, patch: &Value) -> Result<Value> {
    match kind {
        DefinitionKind::Collection => reapply::<Collection>(existing, patch),
        DefinitionKind::CustomField => reapply::<CustomField>(existing, patch),
        DefinitionKind::FormLayout => reapply::<FormLayout>(existing, patch),
        DefinitionKind::Template => reapply::<Template>(existing, patch),
        DefinitionKind::Form => reapply::<Form>(existing, patch),
    }
}

fn reapply<D: Definition>(existing: &Value, patch: &Value) -> Result<Value> {
    let current = D::decode(existing)?;
    let updated = apply_update(&current, patch)?;
    Ok(serde_json::to_value(updated)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::LayoutType;
    use crate::field::{FieldDefinition, FieldKind, FieldSpec};
    use crate::lov::{LovItem, LovType};
    use serde_json::json;

    fn status_field() -> CustomField {
        CustomField::new("status", "Status", FieldKind::Dropdown)
            .with_category("General")
            .with_lov(LovType::UserDefined, vec![LovItem::new("A", "Alpha")])
    }

    fn layout() -> FormLayout {
        FormLayout::new("Address Block", LayoutType::FormGroup).with_category("Contact").with_fields(vec![FieldDefinition::new(
            "street",
            "Street",
            FieldSpec::Text,
        )])
    }

    #[test]
    fn test_custom_field_merges_every_key() {
        let updated = apply_update(&status_field(), &json!({"category": "HR"})).unwrap();
        assert_eq!(updated.category, "HR");
        assert_eq!(updated.field_label, "Status");
        assert_eq!(updated.lov_items.len(), 1);

        let updated = apply_update(&status_field(), &json!({"fieldLabel": "State", "dataType": "radio"})).unwrap();
        assert_eq!(updated.field_label, "State");
        assert_eq!(updated.data_type, FieldKind::Radio);
    }

    #[test]
    fn test_custom_field_bad_data_type() {
        let err = apply_update(&status_field(), &json!({"dataType": "slider"})).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidEnum { ref field, .. } if field == "dataType"));
    }

    #[test]
    fn test_layout_allowlist() {
        let original = layout();
        let updated = apply_update(
            &original,
            &json!({"category": "HR", "layoutType": "box-layout", "surprise": true}),
        )
        .unwrap();
        assert_eq!(updated.category.as_deref(), Some("HR"));
        assert_eq!(updated.layout_type, original.layout_type);
        assert_eq!(updated.fields, original.fields);
        assert!(serde_json::to_value(&updated).unwrap().get("surprise").is_none());
    }

    #[test]
    fn test_template_allowlist() {
        let mut original = Template::new("Onboarding", "HR", Vec::new());
        original.description = Some("Starter pack".into());
        let updated = apply_update(
            &original,
            &json!({"category": "People", "description": "Replaced", "layoutConfig": {"columns": 2}}),
        )
        .unwrap();
        assert_eq!(updated.category, "People");
        assert_eq!(updated.layout_config, Some(json!({"columns": 2})));
        assert_eq!(updated.description.as_deref(), Some("Starter pack"));
    }

    #[test]
    fn test_form_allowlist() {
        let original = Form::new("crm", "CONTACT", Vec::new());
        let existing = serde_json::to_value(&original).unwrap();
        let updated = apply_partial_update(
            DefinitionKind::Form,
            &existing,
            &json!({
                "collectionName": "sales",
                "styles": {"theme": "dark"},
                "category": "Leads",
                "surveyVersion": 3,
                "id": "01ARZ3NDEKTSV4RRFFQ69G5FAV"
            }),
        )
        .unwrap();
        assert_eq!(updated["collectionName"], json!("sales"));
        assert_eq!(updated["styles"], json!({"theme": "dark"}));
        assert!(updated.get("category").is_none());
        assert!(updated.get("surveyVersion").is_none());
        assert_eq!(updated["id"], existing["id"]);
        assert_eq!(updated["formName"], json!("CONTACT"));
    }

    #[test]
    fn test_system_keys_are_kept() {
        let original = status_field();
        let updated = apply_update(
            &original,
            &json!({"id": "01ARZ3NDEKTSV4RRFFQ69G5FAV", "createdAt": "2001-01-01T00:00:00Z"}),
        )
        .unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
    }

    #[test]
    fn test_form_rename_is_normalized() {
        let form = Form::new("crm", "CONTACT US", Vec::new());
        let updated = apply_update(&form, &json!({"formName": " feedback "})).unwrap();
        assert_eq!(updated.form_name, "FEEDBACK");
    }

    #[test]
    fn test_collection_only_description() {
        let existing = serde_json::to_value(Collection::new("crm", "")).unwrap();
        let updated = apply_partial_update(
            DefinitionKind::Collection,
            &existing,
            &json!({"name": "other", "description": "Customer data"}),
        )
        .unwrap();
        assert_eq!(updated["name"], json!("crm"));
        assert_eq!(updated["description"], json!("Customer data"));
    }

    #[test]
    fn test_invalid_merged_fields_rejected() {
        let err = apply_update(&layout(), &json!({"fields": [{"id": "x", "label": "X", "type": "slider"}]})).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_patch_must_be_object() {
        let err = merge_patch(DefinitionKind::Template, &json!({}), &json!([1])).unwrap_err();
        assert_eq!(err.field(), Some("patch"));
    }
}
