//! Forms: the only directly renderable and submittable definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

use super::{check_field_list_tags, decode_payload, expect_object, new_id, require_text, Definition, DefinitionKind};
use crate::error::Result;
use crate::field::{validate_field_list, FieldDefinition};

/// Form body; keys other than `fields` are passed through untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormJson {
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(default = "new_id")]
    pub id: Ulid,
    /// Grouping key; not unique
    pub collection_name: String,
    /// Unique, stored upper-cased
    pub form_name: String,
    #[serde(default)]
    pub form_json: FormJson,
    /// Theme object interpreted by the renderer
    #[serde(default)]
    pub styles: Map<String, Value>,
    /// Raw survey-tool definition, passed through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_json: Option<Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Form {
    pub fn new(collection_name: impl Into<String>, form_name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            collection_name: collection_name.into(),
            form_name: form_name.into(),
            form_json: FormJson {
                fields,
                extra: Map::new(),
            },
            styles: Map::new(),
            survey_json: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Definition for Form {
    const KIND: DefinitionKind = DefinitionKind::Form;

    fn id(&self) -> Ulid {
        self.id
    }

    fn key(&self) -> &str {
        &self.form_name
    }

    /// Accepts the field list either as `formJson.fields` or as a top-level
    /// `fields`; the top-level list wins when both are present.
    fn decode(raw: &Value) -> Result<Self> {
        let obj = expect_object(raw, "form")?;
        let mut obj = obj.clone();
        if let Some(fields) = obj.remove("fields") {
            check_field_list_tags(Some(&fields), "fields")?;
            match obj.get_mut("formJson") {
                Some(Value::Object(body)) => {
                    body.insert("fields".to_string(), fields);
                }
                _ => {
                    let mut body = Map::new();
                    body.insert("fields".to_string(), fields);
                    obj.insert("formJson".to_string(), Value::Object(body));
                }
            }
        }
        check_field_list_tags(obj.get("formJson").and_then(|b| b.get("fields")), "formJson.fields")?;
        decode_payload(&Value::Object(obj), "form")
    }

    fn normalize(&mut self) {
        self.form_name = Self::KIND.normalize_key(&self.form_name);
        self.collection_name = self.collection_name.trim().to_string();
    }

    fn validate(&self) -> Result<()> {
        require_text(&self.collection_name, "collectionName")?;
        require_text(&self.form_name, "formName")?;
        validate_field_list(&self.form_json.fields, "formJson.fields")
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.id = new_id();
        self.created_at = now;
        self.updated_at = now;
    }

    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn collection_name(&self) -> Option<&str> {
        Some(self.collection_name.as_str())
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.form_name.as_str()]
    }

    fn fields(&self) -> &[FieldDefinition] {
        &self.form_json.fields
    }
}
