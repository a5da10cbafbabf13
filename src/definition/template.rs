//! Templates: reusable starting points for new forms

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

use super::{check_field_list_tags, decode_payload, expect_object, new_id, require_text, Definition, DefinitionKind};
use crate::error::Result;
use crate::field::{validate_field_list, FieldDefinition};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default = "new_id")]
    pub id: Ulid,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_config: Option<Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn new(name: impl Into<String>, category: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            category: category.into(),
            description: None,
            fields,
            layout_config: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Definition for Template {
    const KIND: DefinitionKind = DefinitionKind::Template;

    fn id(&self) -> Ulid {
        self.id
    }

    fn key(&self) -> &str {
        &self.name
    }

    fn decode(raw: &Value) -> Result<Self> {
        let obj = expect_object(raw, "template")?;
        check_field_list_tags(obj.get("fields"), "fields")?;
        decode_payload(raw, "template")
    }

    fn normalize(&mut self) {
        self.name = Self::KIND.normalize_key(&self.name);
    }

    fn validate(&self) -> Result<()> {
        require_text(&self.name, "name")?;
        require_text(&self.category, "category")?;
        validate_field_list(&self.fields, "fields")
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.id = new_id();
        self.created_at = now;
        self.updated_at = now;
    }

    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn category(&self) -> Option<&str> {
        Some(self.category.as_str())
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    fn categories(defs: &[Self]) -> Vec<String> {
        defs.iter()
            .map(|d| d.category.as_str())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
