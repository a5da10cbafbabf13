//! Stored definitions
//!
//! Five independently stored kinds share one identity model: each has a name
//! key unique within its kind, a ULID, and creation/update timestamps.
//!
//! | Kind         | Name key     | Category           |
//! |--------------|--------------|--------------------|
//! | Collection   | `name`       | -                  |
//! | Custom Field | `fieldName`  | `category`         |
//! | Form Layout  | `layoutName` | `category` (opt.)  |
//! | Template     | `name`       | `category`         |
//! | Form         | `formName`   | - (`collectionName` groups) |

pub mod collection;
pub mod custom_field;
pub mod form;
pub mod layout;
pub mod submission;
pub mod template;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

use crate::error::{DefinitionError, Result};
use crate::field::{check_kind_tags, FieldDefinition};

pub use collection::Collection;
pub use custom_field::CustomField;
pub use form::{Form, FormJson};
pub use layout::{FormLayout, LayoutType};
pub use submission::Submission;
pub use template::Template;

/// The five definition kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefinitionKind {
    Collection,
    CustomField,
    FormLayout,
    Template,
    Form,
}

impl DefinitionKind {
    pub const ALL: [DefinitionKind; 5] = [
        DefinitionKind::Collection,
        DefinitionKind::CustomField,
        DefinitionKind::FormLayout,
        DefinitionKind::Template,
        DefinitionKind::Form,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Collection => "collection",
            DefinitionKind::CustomField => "custom-field",
            DefinitionKind::FormLayout => "form-layout",
            DefinitionKind::Template => "template",
            DefinitionKind::Form => "form",
        }
    }

    /// Human-readable name used in messages
    pub fn label(&self) -> &'static str {
        match self {
            DefinitionKind::Collection => "collection",
            DefinitionKind::CustomField => "custom field",
            DefinitionKind::FormLayout => "form layout",
            DefinitionKind::Template => "template",
            DefinitionKind::Form => "form",
        }
    }

    /// Directory name used by file-backed storage
    pub fn dir_name(&self) -> &'static str {
        match self {
            DefinitionKind::Collection => "collections",
            DefinitionKind::CustomField => "custom-fields",
            DefinitionKind::FormLayout => "layouts",
            DefinitionKind::Template => "templates",
            DefinitionKind::Form => "forms",
        }
    }

    /// JSON attribute holding the name key
    pub fn key_attr(&self) -> &'static str {
        match self {
            DefinitionKind::Collection | DefinitionKind::Template => "name",
            DefinitionKind::CustomField => "fieldName",
            DefinitionKind::FormLayout => "layoutName",
            DefinitionKind::Form => "formName",
        }
    }

    /// Normalize a name key the way it is written.
    ///
    /// Every key is trimmed; form names are additionally upper-cased.
    pub fn normalize_key(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self {
            DefinitionKind::Form => trimmed.to_uppercase(),
            DefinitionKind::Collection
            | DefinitionKind::CustomField
            | DefinitionKind::FormLayout
            | DefinitionKind::Template => trimmed.to_string(),
        }
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DefinitionKind {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "collection" | "collections" => Ok(DefinitionKind::Collection),
            "custom-field" | "custom-fields" | "field" => Ok(DefinitionKind::CustomField),
            "form-layout" | "layouts" | "layout" => Ok(DefinitionKind::FormLayout),
            "template" | "templates" => Ok(DefinitionKind::Template),
            "form" | "forms" => Ok(DefinitionKind::Form),
            other => Err(DefinitionError::invalid_enum(
                "kind",
                other,
                &DefinitionKind::ALL.map(|k| k.as_str()),
            )),
        }
    }
}

/// Behaviour shared by every stored definition kind
pub trait Definition: Serialize + DeserializeOwned + Clone {
    const KIND: DefinitionKind;

    fn id(&self) -> Ulid;

    /// The name key, unique within the kind
    fn key(&self) -> &str;

    /// Decode a raw payload, checking enumerated attributes first so a bad
    /// value surfaces as `InvalidEnum` naming the attribute.
    fn decode(raw: &Value) -> Result<Self>;

    /// Trim (and for forms, upper-case) the name key
    fn normalize(&mut self);

    /// Structural validation shared by create and update
    fn validate(&self) -> Result<()>;

    /// Extra rules that only apply when a definition is first created
    fn validate_new(&self) -> Result<()> {
        Ok(())
    }

    /// Assign a fresh identity and creation time
    fn stamp_created(&mut self, now: DateTime<Utc>);

    fn stamp_updated(&mut self, now: DateTime<Utc>);

    fn category(&self) -> Option<&str> {
        None
    }

    /// Attribute matched by the exact `type` filter
    fn type_tag(&self) -> Option<&str> {
        None
    }

    fn collection_name(&self) -> Option<&str> {
        None
    }

    /// Attributes matched by substring search
    fn search_text(&self) -> Vec<&str>;

    fn fields(&self) -> &[FieldDefinition] {
        &[]
    }

    /// Distinct categories over a listing, in this kind's own way
    fn categories(_defs: &[Self]) -> Vec<String> {
        Vec::new()
    }
}

/// Best attribute name to report for a serde decode failure
pub(crate) fn serde_error_field(err: &serde_json::Error, fallback: &str) -> String {
    let msg = err.to_string();
    msg.split_once("missing field `")
        .and_then(|(_, rest)| rest.split_once('`'))
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

pub(crate) fn decode_payload<T: DeserializeOwned>(raw: &Value, what: &str) -> Result<T> {
    serde_json::from_value(raw.clone())
        .map_err(|e| DefinitionError::validation(serde_error_field(&e, what), e.to_string()))
}

pub(crate) fn expect_object<'a>(raw: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    raw.as_object()
        .ok_or_else(|| DefinitionError::validation(what, "payload must be a JSON object"))
}

/// Check an optional string attribute against a closed set
pub(crate) fn check_enum_attr(obj: &Map<String, Value>, attr: &str, allowed: &[&str]) -> Result<()> {
    match obj.get(attr) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(s)) if allowed.contains(&s.as_str()) => Ok(()),
        Some(Value::String(s)) => Err(DefinitionError::invalid_enum(attr, s.as_str(), allowed)),
        Some(other) => Err(DefinitionError::invalid_enum(attr, other.to_string(), allowed)),
    }
}

/// Check the kind tags of a raw field list before decoding
pub(crate) fn check_field_list_tags(value: Option<&Value>, attr: &str) -> Result<()> {
    match value {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                check_kind_tags(item, &format!("{}[{}].", attr, i))?;
            }
            Ok(())
        }
        Some(_) => Err(DefinitionError::validation(attr, "must be an array")),
    }
}

pub(crate) fn require_text(value: &str, attr: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DefinitionError::validation(attr, "must not be empty"));
    }
    Ok(())
}

pub(crate) fn new_id() -> Ulid {
    Ulid::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_keys_are_upper_cased() {
        assert_eq!(DefinitionKind::Form.normalize_key("  contact us "), "CONTACT US");
        assert_eq!(DefinitionKind::Template.normalize_key("  Intake "), "Intake");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("layout".parse::<DefinitionKind>().unwrap(), DefinitionKind::FormLayout);
        assert_eq!("custom-field".parse::<DefinitionKind>().unwrap(), DefinitionKind::CustomField);
        let err = "widget".parse::<DefinitionKind>().unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidEnum { .. }));
    }

    #[test]
    fn test_missing_field_is_named() {
        let err = serde_json::from_value::<CustomField>(serde_json::json!({"fieldName": "x"})).unwrap_err();
        assert_eq!(serde_error_field(&err, "customField"), "fieldLabel");
    }
}
