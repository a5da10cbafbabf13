//! Custom fields: reusable, uniquely named atomic fields, optionally LOV-backed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

use super::{check_enum_attr, decode_payload, expect_object, new_id, require_text, Definition, DefinitionKind};
use crate::error::{DefinitionError, Result};
use crate::field::FieldKind;
use crate::lov::{LovItem, LovStatus, LovType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    #[serde(default = "new_id")]
    pub id: Ulid,
    /// Globally unique; the key `customFieldId` references resolve against
    pub field_name: String,
    pub field_label: String,
    pub data_type: FieldKind,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lov_type: Option<LovType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lov_items: Vec<LovItem>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl CustomField {
    pub fn new(field_name: impl Into<String>, field_label: impl Into<String>, data_type: FieldKind) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            field_name: field_name.into(),
            field_label: field_label.into(),
            data_type,
            category: String::new(),
            lov_type: None,
            lov_items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Attach a managed value list
    pub fn with_lov(mut self, lov_type: LovType, items: Vec<LovItem>) -> Self {
        self.lov_type = Some(lov_type);
        self.lov_items = items;
        self
    }

    /// Whether items are populated by an external source at render time
    pub fn is_api_lov(&self) -> bool {
        self.lov_type == Some(LovType::Api)
    }

    pub fn active_items(&self) -> impl Iterator<Item = &LovItem> {
        self.lov_items.iter().filter(|item| item.is_active())
    }
}

impl Definition for CustomField {
    const KIND: DefinitionKind = DefinitionKind::CustomField;

    fn id(&self) -> Ulid {
        self.id
    }

    fn key(&self) -> &str {
        &self.field_name
    }

    fn decode(raw: &Value) -> Result<Self> {
        let obj = expect_object(raw, "customField")?;
        match obj.get("dataType") {
            Some(Value::String(s)) => {
                FieldKind::parse_attr(s, "dataType")?;
            }
            Some(other) => {
                return Err(DefinitionError::invalid_enum("dataType", other.to_string(), &FieldKind::names()))
            }
            None => return Err(DefinitionError::validation("dataType", "is required")),
        }
        check_enum_attr(obj, "lovType", LovType::NAMES)?;
        if let Some(Value::Array(items)) = obj.get("lovItems") {
            for (i, item) in items.iter().enumerate() {
                if let Some(item) = item.as_object() {
                    check_enum_attr(item, "status", LovStatus::NAMES).map_err(|e| match e {
                        DefinitionError::InvalidEnum { value, allowed, .. } => DefinitionError::InvalidEnum {
                            field: format!("lovItems[{}].status", i),
                            value,
                            allowed,
                        },
                        other => other,
                    })?;
                }
            }
        }
        decode_payload(raw, "customField")
    }

    fn normalize(&mut self) {
        self.field_name = Self::KIND.normalize_key(&self.field_name);
    }

    fn validate(&self) -> Result<()> {
        require_text(&self.field_name, "fieldName")?;
        require_text(&self.field_label, "fieldLabel")?;
        for (i, item) in self.lov_items.iter().enumerate() {
            require_text(&item.code, &format!("lovItems[{}].code", i))?;
        }
        Ok(())
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

    fn type_tag(&self) -> Option<&str> {
        Some(self.data_type.as_str())
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.field_name.as_str(), self.field_label.as_str()]
    }

    fn categories(defs: &[Self]) -> Vec<String> {
        // Distinct in first-seen order, then sorted for the caller
        let mut categories: Vec<String> = Vec::new();
        for def in defs {
            if !def.category.is_empty() && !categories.contains(&def.category) {
                categories.push(def.category.clone());
            }
        }
        categories.sort();
        categories
    }
}
